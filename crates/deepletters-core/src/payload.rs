use serde::{Deserialize, Serialize};

use crate::types::LetterError;

pub const DEFAULT_MUSIC_VOLUME: f64 = 0.5;
pub const ANONYMOUS_SENDER: &str = "Anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// The plaintext letter as it exists before encryption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterPlaintext {
    pub content: String,
    pub sender_name: String,
    #[serde(default)]
    pub audio_data_url: Option<String>,
    #[serde(default)]
    pub music_url: Option<String>,
    pub music_volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl LetterPlaintext {
    pub fn text(content: impl Into<String>, sender_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender_name: sender_name.into(),
            audio_data_url: None,
            music_url: None,
            music_volume: DEFAULT_MUSIC_VOLUME,
            theme: None,
        }
    }

    /// Sender name for display and file naming.
    pub fn display_sender(&self) -> &str {
        let trimmed = self.sender_name.trim();
        if trimmed.is_empty() {
            ANONYMOUS_SENDER
        } else {
            trimmed
        }
    }
}

pub fn serialize(letter: &LetterPlaintext) -> Result<Vec<u8>, LetterError> {
    validate(letter)?;
    serde_json::to_vec(letter).map_err(|e| LetterError::PayloadFormat(e.to_string()))
}

pub fn deserialize(bytes: &[u8]) -> Result<LetterPlaintext, LetterError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| LetterError::PayloadFormat("payload is not valid UTF-8".into()))?;
    let letter: LetterPlaintext =
        serde_json::from_str(text).map_err(|e| LetterError::PayloadFormat(e.to_string()))?;
    validate(&letter)?;
    Ok(letter)
}

fn validate(letter: &LetterPlaintext) -> Result<(), LetterError> {
    if !(0.0..=1.0).contains(&letter.music_volume) {
        return Err(LetterError::PayloadFormat(format!(
            "musicVolume must be within 0..=1, got {}",
            letter.music_volume
        )));
    }
    Ok(())
}
