//! JSON shapes exchanged with the dictionary backend.
//!
//! The backend stores a word's meaning as one free-form `translation` string
//! with inline markers. Conversions in this module split it into structured
//! fields on the way in and join it back on the way out, so nothing above the
//! wire layer parses marker text.

use serde::{Deserialize, Serialize};

use crate::{
    domain::{Word, WordId, WordPatch},
    error::{ApiException, ErrorCode},
};

pub const TRANSLATION_MARKER: &str = "Translation:";
pub const NOTES_MARKER: &str = "Additional meanings/notes:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for WordId {
    fn from(value: WireId) -> Self {
        match value {
            WireId::Text(text) => WordId(text),
            WireId::Number(number) => WordId(number.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireWord {
    pub id: WireId,
    #[serde(default)]
    pub japanese: String,
    #[serde(default)]
    pub reading: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub mnemonic: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub jlpt: Option<String>,
}

impl From<WireWord> for Word {
    fn from(value: WireWord) -> Self {
        let (primary_meaning, additional_notes) =
            split_translation(value.translation.as_deref(), value.meaning.as_deref());
        Self {
            id: value.id.into(),
            japanese: value.japanese,
            reading: non_blank(value.reading),
            primary_meaning,
            additional_notes,
            mnemonic: non_blank(value.mnemonic),
            image_url: non_blank(value.image_url),
            image_prompt: non_blank(value.image_prompt),
            category: value.category,
            jlpt: non_blank(value.jlpt),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireWordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub japanese: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jlpt: Option<String>,
}

impl TryFrom<&WordPatch> for WireWordPatch {
    type Error = ApiException;

    fn try_from(patch: &WordPatch) -> Result<Self, Self::Error> {
        let translation = match (&patch.primary_meaning, &patch.additional_notes) {
            (Some(primary), notes) => Some(join_translation(primary, notes.as_deref())),
            (None, Some(_)) => {
                return Err(ApiException::new(
                    ErrorCode::Validation,
                    "additional notes can only be updated together with the primary meaning",
                ))
            }
            (None, None) => None,
        };

        Ok(Self {
            japanese: patch.japanese.clone(),
            reading: patch.reading.clone(),
            translation,
            mnemonic: patch.mnemonic.clone(),
            image_url: patch.image_url.clone(),
            image_prompt: patch.image_prompt.clone(),
            category: patch.category.clone(),
            jlpt: patch.jlpt.clone(),
        })
    }
}

/// `GET /get_words` returns both collections at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordsResponse {
    #[serde(default)]
    pub words: Vec<WireWord>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddWordsResponse {
    #[serde(default)]
    pub results: Vec<WireWord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCategoryRequest {
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddWordsRequest {
    /// Free-form text; the backend owns the splitting policy.
    pub words: String,
    pub category: String,
}

/// Splits the backend's combined translation into `(primary, notes)`.
///
/// Falls back to `meaning`, then to the whole translation, when no
/// translation marker is present.
pub fn split_translation(
    translation: Option<&str>,
    meaning: Option<&str>,
) -> (String, Option<String>) {
    let translation = translation.unwrap_or_default();

    let (head, notes) = match translation.find(NOTES_MARKER) {
        Some(idx) => {
            let notes = translation[idx + NOTES_MARKER.len()..].trim();
            (
                &translation[..idx],
                (!notes.is_empty()).then(|| notes.to_string()),
            )
        }
        None => (translation, None),
    };

    if let Some(idx) = head.find(TRANSLATION_MARKER) {
        let primary = head[idx + TRANSLATION_MARKER.len()..].trim();
        return (primary.to_string(), notes);
    }

    let fallback = meaning
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| head.trim());
    (fallback.to_string(), notes)
}

pub fn join_translation(primary: &str, notes: Option<&str>) -> String {
    match notes.map(str::trim).filter(|value| !value.is_empty()) {
        Some(notes) => format!("{TRANSLATION_MARKER} {}\n{NOTES_MARKER} {notes}", primary.trim()),
        None => format!("{TRANSLATION_MARKER} {}", primary.trim()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
