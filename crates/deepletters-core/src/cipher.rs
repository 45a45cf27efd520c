//! AES-256-GCM envelopes: `nonce (12) || ciphertext || tag (16)`.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};

use crate::key::ContentKey;
use crate::types::{system_rand, LetterError, RandBytes, ENVELOPE_OVERHEAD, GCM_NONCE_LEN};

fn aead_key(key: &ContentKey) -> Result<LessSafeKey, LetterError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| LetterError::KeyImport("AES key creation failed".into()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under a fresh random nonce.
pub fn encrypt(key: &ContentKey, plaintext: &[u8]) -> Result<Vec<u8>, LetterError> {
    encrypt_with(key, plaintext, &system_rand)
}

pub fn encrypt_with(
    key: &ContentKey,
    plaintext: &[u8],
    rand_bytes: RandBytes<'_>,
) -> Result<Vec<u8>, LetterError> {
    let mut nonce_bytes = [0u8; GCM_NONCE_LEN];
    rand_bytes(&mut nonce_bytes)?;

    let sealing = aead_key(key)?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    sealing
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| LetterError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(plaintext.len() + ENVELOPE_OVERHEAD);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&in_out);
    Ok(out)
}

/// Decrypt an envelope produced by [`encrypt`].
pub fn decrypt(key: &ContentKey, envelope: &[u8]) -> Result<Vec<u8>, LetterError> {
    if envelope.len() < GCM_NONCE_LEN {
        return Err(LetterError::MalformedEnvelope);
    }
    let (nonce_bytes, ciphertext) = envelope.split_at(GCM_NONCE_LEN);

    let opening = aead_key(key)?;
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| LetterError::MalformedEnvelope)?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| LetterError::DecryptionFailed)?;
    Ok(plaintext.to_vec())
}
