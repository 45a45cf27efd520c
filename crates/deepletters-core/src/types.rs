use std::fmt;

pub const CONTENT_KEY_LEN: usize = 32;
pub const GCM_NONCE_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;
/// Bytes added to a plaintext by `cipher::encrypt`.
pub const ENVELOPE_OVERHEAD: usize = GCM_NONCE_LEN + GCM_TAG_LEN;
pub const FILE_LEN_PREFIX: usize = 4;
pub const DPL_EXTENSION: &str = "dpl";

/// Message shown to a recipient whenever a letter cannot be opened.
pub const OPEN_FAILURE_MESSAGE: &str =
    "could not open this letter \u{2014} the file or key may be invalid";

/// Source of randomness for keys and nonces.
pub type RandBytes<'a> = &'a dyn Fn(&mut [u8]) -> Result<(), LetterError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LetterError {
    KeyImport(String),
    MalformedEnvelope,
    DecryptionFailed,
    PayloadFormat(String),
    MalformedFile(String),
    UnwrapFailed,
    InvalidShareLink(String),
    EncryptionFailed,
    RngError(String),
    /// The remote key service could not be reached or answered unexpectedly.
    Remote(String),
}

impl LetterError {
    /// True for failures a recipient can cause with a bad file, link or key.
    pub fn is_content_failure(&self) -> bool {
        !matches!(
            self,
            LetterError::EncryptionFailed | LetterError::RngError(_) | LetterError::Remote(_)
        )
    }

    /// The text shown to an end user. Content failures all share one message
    /// so a wrong key cannot be told apart from a corrupted file.
    pub fn user_message(&self) -> String {
        if self.is_content_failure() {
            OPEN_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for LetterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetterError::KeyImport(msg) => write!(f, "invalid key: {}", msg),
            LetterError::MalformedEnvelope => write!(
                f,
                "malformed envelope: shorter than {} byte nonce",
                GCM_NONCE_LEN
            ),
            LetterError::DecryptionFailed => write!(f, "decryption failed"),
            LetterError::PayloadFormat(msg) => write!(f, "invalid letter payload: {}", msg),
            LetterError::MalformedFile(msg) => write!(f, "malformed letter file: {}", msg),
            LetterError::UnwrapFailed => write!(f, "failed to unwrap key"),
            LetterError::InvalidShareLink(msg) => write!(f, "invalid share link: {}", msg),
            LetterError::EncryptionFailed => write!(f, "encryption failed"),
            LetterError::RngError(msg) => write!(f, "read random bytes: {}", msg),
            LetterError::Remote(msg) => write!(f, "key service: {}", msg),
        }
    }
}

impl std::error::Error for LetterError {}

/// Fill `buf` from the operating system CSPRNG.
pub fn system_rand(buf: &mut [u8]) -> Result<(), LetterError> {
    use ring::rand::{SecureRandom, SystemRandom};
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| LetterError::RngError("SystemRandom failed".into()))
}
