//! Seal and open flows for both key placements.
//!
//! A share-link letter is a bare envelope whose key travels in the link
//! fragment. A download letter is a `.dpl` container whose key is wrapped
//! by the server; the raw key never appears in it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::cipher::{decrypt, encrypt_with};
use crate::file::{assemble, parse};
use crate::key::{
    decode_b64_any, export_key, generate_key_with, import_key, ContentKey, KeyEncoding,
};
use crate::payload::{deserialize, serialize, LetterPlaintext};
use crate::types::{system_rand, LetterError, RandBytes};
use crate::wrap::KeyWrapper;

#[derive(Debug)]
pub struct SealedLetter {
    pub envelope: Vec<u8>,
    pub key: ContentKey,
}

impl SealedLetter {
    /// The key as it appears in a share link fragment.
    pub fn fragment_key(&self) -> String {
        export_key(&self.key, KeyEncoding::UrlSafe)
    }
}

/// Encrypt a letter under a fresh content key.
pub fn seal_letter(letter: &LetterPlaintext) -> Result<SealedLetter, LetterError> {
    seal_letter_with(letter, &system_rand)
}

pub fn seal_letter_with(
    letter: &LetterPlaintext,
    rand_bytes: RandBytes<'_>,
) -> Result<SealedLetter, LetterError> {
    let plaintext = serialize(letter)?;
    let key = generate_key_with(rand_bytes)?;
    let envelope = encrypt_with(&key, &plaintext, rand_bytes)?;
    Ok(SealedLetter { envelope, key })
}

pub fn open_letter(envelope: &[u8], key_text: &str) -> Result<LetterPlaintext, LetterError> {
    let key = import_key(key_text)?;
    open_with_key(envelope, &key)
}

pub fn open_with_key(envelope: &[u8], key: &ContentKey) -> Result<LetterPlaintext, LetterError> {
    let plaintext = decrypt(key, envelope)?;
    deserialize(&plaintext)
}

/// Seal a letter and package it as `.dpl` bytes with its key wrapped.
pub fn seal_for_download(
    letter: &LetterPlaintext,
    wrapper: &dyn KeyWrapper,
) -> Result<Vec<u8>, LetterError> {
    let sealed = seal_letter(letter)?;
    package_download(&sealed, wrapper)
}

/// Package an already sealed letter as `.dpl` bytes.
pub fn package_download(
    sealed: &SealedLetter,
    wrapper: &dyn KeyWrapper,
) -> Result<Vec<u8>, LetterError> {
    let wrapped_b64 = wrapper.wrap(&export_key(&sealed.key, KeyEncoding::Standard))?;
    let wrapped = decode_b64_any(&wrapped_b64).map_err(|_| {
        LetterError::Remote("key service returned a wrapped key that is not base64".into())
    })?;
    assemble(&wrapped, &sealed.envelope)
}

pub fn open_download(
    file: &[u8],
    wrapper: &dyn KeyWrapper,
) -> Result<LetterPlaintext, LetterError> {
    let parsed = parse(file)?;
    let key_text = wrapper.unwrap(&STANDARD.encode(&parsed.wrapped_key))?;
    open_letter(&parsed.envelope, &key_text)
}
