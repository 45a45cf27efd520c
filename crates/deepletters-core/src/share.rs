use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};

use crate::key::{export_key, import_key, ContentKey, KeyEncoding};
use crate::types::{LetterError, RandBytes, DPL_EXTENSION};

/// Shared letters are kept for one week (in seconds).
pub const RETENTION_SECONDS: i64 = 7 * 86_400;

const LETTER_PATH: &str = "/letter/";
const SHARE_CODE_BYTES: usize = 16;

/// A fresh 22-character URL-safe share code.
pub fn generate_share_code_with(rand_bytes: RandBytes<'_>) -> Result<String, LetterError> {
    let mut raw = [0u8; SHARE_CODE_BYTES];
    rand_bytes(&mut raw)?;
    Ok(URL_SAFE_NO_PAD.encode(raw))
}

/// Build a share link carrying the URL-safe key in its fragment.
pub fn format_share_link(base_url: &str, share_code: &str, key: &ContentKey) -> String {
    format!(
        "{}{}{}#{}",
        base_url.trim_end_matches('/'),
        LETTER_PATH,
        share_code,
        export_key(key, KeyEncoding::UrlSafe)
    )
}

/// Parse a share link into its code and content key.
/// Accepts formats:
///   - https://host/letter/<code>#<key>
///   - https://host/letter/<code>?<query>#<key>
///   - <code>#<key> (bare code with fragment)
pub fn parse_share_link(raw: &str) -> Result<(String, ContentKey), LetterError> {
    let raw = raw.trim();
    let Some((base, fragment)) = raw.split_once('#') else {
        return Err(LetterError::InvalidShareLink("missing fragment".into()));
    };
    let base = base.split_once('?').map_or(base, |(path, _)| path);

    let code = if let Some(scheme_end) = base.find("://") {
        let after_scheme = &base[scheme_end + 3..];
        let path = after_scheme
            .find('/')
            .map(|idx| &after_scheme[idx..])
            .unwrap_or("");
        path.strip_prefix(LETTER_PATH)
            .map(|c| c.trim_end_matches('/'))
            .ok_or_else(|| LetterError::InvalidShareLink("expected /letter/<code> path".into()))?
    } else {
        base
    };

    if code.is_empty() || code.contains('/') {
        return Err(LetterError::InvalidShareLink(
            "expected a single share code".into(),
        ));
    }
    if fragment.is_empty() {
        return Err(LetterError::InvalidShareLink("empty fragment".into()));
    }

    let key = import_key(fragment)?;
    Ok((code.to_string(), key))
}

pub fn expires_at(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::seconds(RETENTION_SECONDS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub expired: bool,
}

/// Whole days, hours and minutes until a shared letter expires.
pub fn time_left(created_at: DateTime<Utc>, now: DateTime<Utc>) -> TimeLeft {
    let remaining = expires_at(created_at) - now;
    if remaining <= Duration::zero() {
        return TimeLeft {
            days: 0,
            hours: 0,
            minutes: 0,
            expired: true,
        };
    }
    let minutes_total = remaining.num_minutes();
    TimeLeft {
        days: minutes_total / (24 * 60),
        hours: (minutes_total / 60) % 24,
        minutes: minutes_total % 60,
        expired: false,
    }
}

/// `{YYYYMMDDHHMMSS}_A_Letter_from_{sender}.dpl`
pub fn download_filename(created_at: DateTime<Utc>, sender: &str) -> String {
    let sender = sender.trim();
    let sender = if sender.is_empty() {
        crate::payload::ANONYMOUS_SENDER
    } else {
        sender
    };
    let safe: String = sender
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!(
        "{}_A_Letter_from_{}.{}",
        created_at.format("%Y%m%d%H%M%S"),
        safe,
        DPL_EXTENSION
    )
}
