//! The `.dpl` download container.
//!
//! ```text
//! offset 0   : u32 LE  L
//! offset 4   : L bytes wrapped key (nonce || ct+tag of the key string)
//! offset 4+L : rest    letter envelope
//! ```

use std::path::Path;

use crate::types::{LetterError, DPL_EXTENSION, FILE_LEN_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKeyFile {
    pub wrapped_key: Vec<u8>,
    pub envelope: Vec<u8>,
}

pub fn assemble(wrapped_key: &[u8], envelope: &[u8]) -> Result<Vec<u8>, LetterError> {
    let len = u32::try_from(wrapped_key.len()).map_err(|_| {
        LetterError::MalformedFile(format!(
            "wrapped key of {} bytes does not fit a u32 length prefix",
            wrapped_key.len()
        ))
    })?;
    let mut out = Vec::with_capacity(FILE_LEN_PREFIX + wrapped_key.len() + envelope.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(wrapped_key);
    out.extend_from_slice(envelope);
    Ok(out)
}

pub fn parse(file: &[u8]) -> Result<WrappedKeyFile, LetterError> {
    let Some((prefix, rest)) = file.split_first_chunk::<FILE_LEN_PREFIX>() else {
        return Err(LetterError::MalformedFile(format!(
            "file is {} bytes, shorter than the {} byte length prefix",
            file.len(),
            FILE_LEN_PREFIX
        )));
    };
    let len = u32::from_le_bytes(*prefix) as usize;
    if rest.len() < len {
        return Err(LetterError::MalformedFile(format!(
            "declared wrapped key length {} exceeds remaining {} bytes",
            len,
            rest.len()
        )));
    }
    let (wrapped_key, envelope) = rest.split_at(len);
    Ok(WrappedKeyFile {
        wrapped_key: wrapped_key.to_vec(),
        envelope: envelope.to_vec(),
    })
}

/// Case-insensitive check for the `.dpl` extension.
pub fn has_dpl_extension(name: impl AsRef<Path>) -> bool {
    name.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DPL_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_writes_little_endian_prefix() {
        let file = assemble(&[0xAA; 300], b"env").unwrap();
        assert_eq!(&file[..4], &[0x2C, 0x01, 0x00, 0x00]);
        assert_eq!(file.len(), 4 + 300 + 3);
        assert_eq!(&file[304..], b"env");
    }

    #[test]
    fn parse_inverts_assemble() {
        let wk = vec![1, 2, 3, 4, 5];
        let env = vec![9; 40];
        let parsed = parse(&assemble(&wk, &env).unwrap()).unwrap();
        assert_eq!(parsed.wrapped_key, wk);
        assert_eq!(parsed.envelope, env);
    }

    #[test]
    fn parse_allows_empty_sections() {
        let parsed = parse(&[0, 0, 0, 0]).unwrap();
        assert!(parsed.wrapped_key.is_empty());
        assert!(parsed.envelope.is_empty());
    }

    #[test]
    fn parse_rejects_short_prefix() {
        for len in 0..4 {
            assert!(matches!(
                parse(&vec![0u8; len]),
                Err(LetterError::MalformedFile(_))
            ));
        }
    }

    #[test]
    fn parse_rejects_overlong_declared_length() {
        let mut file = assemble(&[7u8; 10], b"").unwrap();
        file.truncate(4 + 9);
        assert!(matches!(parse(&file), Err(LetterError::MalformedFile(_))));

        let huge = [0xFF, 0xFF, 0xFF, 0xFF, 1, 2, 3];
        assert!(matches!(parse(&huge), Err(LetterError::MalformedFile(_))));
    }

    #[test]
    fn dpl_extension_check() {
        assert!(has_dpl_extension("20250101_A_Letter_from_Ann.dpl"));
        assert!(has_dpl_extension("LETTER.DPL"));
        assert!(!has_dpl_extension("letter.json"));
        assert!(!has_dpl_extension("dpl"));
    }
}
