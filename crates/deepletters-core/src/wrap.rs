//! Server-side key wrapping.
//!
//! A letter downloaded as a `.dpl` file carries its content key encrypted
//! under the service master key, so the raw key never leaves the browser in
//! a URL. The wrapped value is the envelope of the key's *text* form, which
//! means unwrap hands back exactly the string the client sent.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::cipher::{decrypt, encrypt_with};
use crate::key::{decode_b64_any, import_key, ContentKey};
use crate::types::{system_rand, LetterError, RandBytes};

/// Anything able to wrap and unwrap content-key strings: the in-process
/// service or a remote client of the `/wrap` and `/unwrap` endpoints.
pub trait KeyWrapper {
    fn wrap(&self, content_key: &str) -> Result<String, LetterError>;
    fn unwrap(&self, wrapped_key: &str) -> Result<String, LetterError>;
}

pub struct KeyWrapService {
    master: ContentKey,
}

impl KeyWrapService {
    pub fn new(master: ContentKey) -> Self {
        Self { master }
    }

    /// Build from the operator secret, itself an exported content key.
    pub fn from_secret(secret: &str) -> Result<Self, LetterError> {
        import_key(secret).map(Self::new)
    }

    pub fn wrap_with(
        &self,
        content_key: &str,
        rand_bytes: RandBytes<'_>,
    ) -> Result<String, LetterError> {
        // Validates shape only; the string itself is what gets wrapped.
        import_key(content_key)?;
        let sealed = encrypt_with(&self.master, content_key.as_bytes(), rand_bytes)?;
        Ok(STANDARD.encode(sealed))
    }
}

impl KeyWrapper for KeyWrapService {
    fn wrap(&self, content_key: &str) -> Result<String, LetterError> {
        self.wrap_with(content_key, &system_rand)
    }

    fn unwrap(&self, wrapped_key: &str) -> Result<String, LetterError> {
        let sealed = decode_b64_any(wrapped_key.trim()).map_err(|_| LetterError::UnwrapFailed)?;
        let plain = decrypt(&self.master, &sealed).map_err(|_| LetterError::UnwrapFailed)?;
        String::from_utf8(plain).map_err(|_| LetterError::UnwrapFailed)
    }
}

impl std::fmt::Debug for KeyWrapService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyWrapService(..)")
    }
}
