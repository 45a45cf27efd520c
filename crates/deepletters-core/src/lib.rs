pub mod cipher;
pub mod file;
pub mod key;
pub mod letter;
pub mod payload;
pub mod share;
pub mod types;
pub mod wrap;

#[cfg(test)]
mod proptests;

pub use cipher::{decrypt, encrypt, encrypt_with};
pub use file::{assemble, has_dpl_extension, parse, WrappedKeyFile};
pub use key::{
    decode_b64_any, export_key, generate_key, generate_key_with, import_key, ContentKey,
    KeyEncoding,
};
pub use letter::{
    open_download, open_letter, open_with_key, package_download, seal_for_download, seal_letter,
    seal_letter_with, SealedLetter,
};
pub use payload::{LetterPlaintext, Theme, ANONYMOUS_SENDER, DEFAULT_MUSIC_VOLUME};
pub use share::{
    download_filename, expires_at, format_share_link, generate_share_code_with, parse_share_link,
    time_left, TimeLeft, RETENTION_SECONDS,
};
pub use types::*;
pub use wrap::{KeyWrapService, KeyWrapper};
