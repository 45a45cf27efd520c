//! Content key generation and its text encodings.
//!
//! A content key is 32 raw bytes. It is exported either as padded standard
//! base64 (44 chars) or as URL-safe base64 without padding (43 chars) so it
//! can sit in a URL fragment without percent-encoding. Import accepts both.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use zeroize::Zeroize;

use crate::types::{system_rand, LetterError, RandBytes, CONTENT_KEY_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEncoding {
    Standard,
    #[default]
    UrlSafe,
}

/// A 256-bit AES-GCM key. Zeroed on drop.
#[derive(Clone)]
pub struct ContentKey {
    bytes: [u8; CONTENT_KEY_LEN],
}

impl ContentKey {
    pub fn from_bytes(raw: &[u8]) -> Result<Self, LetterError> {
        if raw.len() != CONTENT_KEY_LEN {
            return Err(LetterError::KeyImport(format!(
                "key must be {} bytes, got {}",
                CONTENT_KEY_LEN,
                raw.len()
            )));
        }
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        bytes.copy_from_slice(raw);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

pub fn generate_key() -> Result<ContentKey, LetterError> {
    generate_key_with(&system_rand)
}

pub fn generate_key_with(rand_bytes: RandBytes<'_>) -> Result<ContentKey, LetterError> {
    let mut bytes = [0u8; CONTENT_KEY_LEN];
    rand_bytes(&mut bytes)?;
    Ok(ContentKey { bytes })
}

pub fn export_key(key: &ContentKey, encoding: KeyEncoding) -> String {
    match encoding {
        KeyEncoding::Standard => STANDARD.encode(key.bytes),
        KeyEncoding::UrlSafe => URL_SAFE_NO_PAD.encode(key.bytes),
    }
}

pub fn import_key(text: &str) -> Result<ContentKey, LetterError> {
    let raw = decode_b64_any(text.trim())
        .map_err(|e| LetterError::KeyImport(format!("base64 decode: {}", e)))?;
    let key = ContentKey::from_bytes(&raw);
    let mut raw = raw;
    raw.zeroize();
    key
}

/// Decode base64 written in either alphabet, padded or not.
pub fn decode_b64_any(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut normalized: String = text
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    STANDARD.decode(normalized)
}
