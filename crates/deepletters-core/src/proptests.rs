//! Property-based tests for the envelope, wrapping and file layers.

use proptest::prelude::*;

use crate::cipher::{decrypt, encrypt};
use crate::file::{assemble, parse};
use crate::key::{export_key, import_key, ContentKey, KeyEncoding};
use crate::types::{LetterError, ENVELOPE_OVERHEAD};
use crate::wrap::{KeyWrapService, KeyWrapper};

fn content_key() -> impl Strategy<Value = ContentKey> {
    any::<[u8; 32]>().prop_map(|raw| ContentKey::from_bytes(&raw).unwrap())
}

fn encoding() -> impl Strategy<Value = KeyEncoding> {
    prop_oneof![Just(KeyEncoding::Standard), Just(KeyEncoding::UrlSafe)]
}

// ==================== Envelope Property Tests ====================

proptest! {
    #[test]
    fn decrypt_inverts_encrypt(
        key in content_key(),
        plaintext in prop::collection::vec(any::<u8>(), 0..2048)
    ) {
        let envelope = encrypt(&key, &plaintext).unwrap();
        prop_assert_eq!(envelope.len(), plaintext.len() + ENVELOPE_OVERHEAD);
        prop_assert_eq!(decrypt(&key, &envelope).unwrap(), plaintext);
    }

    /// An imported key text behaves exactly like the key it came from.
    #[test]
    fn exported_key_text_decrypts(
        key in content_key(),
        enc in encoding(),
        plaintext in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        let envelope = encrypt(&key, &plaintext).unwrap();
        let imported = import_key(&export_key(&key, enc)).unwrap();
        prop_assert_eq!(decrypt(&imported, &envelope).unwrap(), plaintext);
    }

    #[test]
    fn other_key_is_rejected(
        k1 in content_key(),
        k2 in content_key(),
        plaintext in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        prop_assume!(k1.as_bytes() != k2.as_bytes());
        let envelope = encrypt(&k1, &plaintext).unwrap();
        prop_assert_eq!(decrypt(&k2, &envelope), Err(LetterError::DecryptionFailed));
    }
}

// ==================== Wrapping Property Tests ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn unwrap_inverts_wrap(
        master in content_key(),
        key in content_key(),
        enc in encoding()
    ) {
        let service = KeyWrapService::new(master);
        let text = export_key(&key, enc);
        let wrapped = service.wrap(&text).unwrap();
        prop_assert_ne!(&wrapped, &text);
        prop_assert_eq!(service.unwrap(&wrapped).unwrap(), text);
    }
}

// ==================== File Format Property Tests ====================

proptest! {
    #[test]
    fn parse_inverts_assemble(
        wrapped_key in prop::collection::vec(any::<u8>(), 1..512),
        envelope in prop::collection::vec(any::<u8>(), 1..2048)
    ) {
        let file = assemble(&wrapped_key, &envelope).unwrap();
        let parsed = parse(&file).unwrap();
        prop_assert_eq!(parsed.wrapped_key, wrapped_key);
        prop_assert_eq!(parsed.envelope, envelope);
    }

    /// Truncating inside the wrapped key section is always detected.
    #[test]
    fn truncated_wrapped_key_is_rejected(
        wrapped_key in prop::collection::vec(any::<u8>(), 1..512),
        cut in any::<prop::sample::Index>()
    ) {
        let file = assemble(&wrapped_key, b"").unwrap();
        let keep = 4 + cut.index(wrapped_key.len());
        prop_assert!(matches!(
            parse(&file[..keep]),
            Err(LetterError::MalformedFile(_))
        ));
    }
}
