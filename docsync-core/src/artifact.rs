//! Typed documentation artifacts and the parser that turns model output into them.
//!
//! The model is told to answer with bare JSON, but it does not always comply: it
//! may wrap the object in a Markdown code fence. [`parse`] strips that wrapper,
//! decodes the mode's schema with serde, and rejects anything missing a required
//! field or carrying an empty title.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::units::UnitMode;

/// One documented failure mode of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub error_message: String,
    pub explanation: String,
}

/// Schema for per-file units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileArtifact {
    pub title: String,
    pub description: String,
    pub mechanism: String,
    pub technical_notes: String,
    pub error_catalog: Vec<ErrorEntry>,
    pub diagram: String,
}

/// Schema for feature units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureArtifact {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_summary: Option<String>,
    pub description: String,
    pub mechanism: String,
    pub technical_notes: String,
    /// Free-form bullet text.
    pub error_catalog: String,
    pub diagram: String,
}

/// Parsed model output, tagged by the mode of the unit it was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentationArtifact {
    File(FileArtifact),
    Feature(FeatureArtifact),
}

/// Borrowed view of the error catalog, whichever shape it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCatalog<'a> {
    Entries(&'a [ErrorEntry]),
    Text(&'a str),
}

impl DocumentationArtifact {
    pub fn title(&self) -> &str {
        match self {
            Self::File(a) => &a.title,
            Self::Feature(a) => &a.title,
        }
    }

    pub fn plain_summary(&self) -> Option<&str> {
        match self {
            Self::File(_) => None,
            Self::Feature(a) => a.plain_summary.as_deref(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::File(a) => &a.description,
            Self::Feature(a) => &a.description,
        }
    }

    pub fn mechanism(&self) -> &str {
        match self {
            Self::File(a) => &a.mechanism,
            Self::Feature(a) => &a.mechanism,
        }
    }

    pub fn technical_notes(&self) -> &str {
        match self {
            Self::File(a) => &a.technical_notes,
            Self::Feature(a) => &a.technical_notes,
        }
    }

    pub fn error_catalog(&self) -> ErrorCatalog<'_> {
        match self {
            Self::File(a) => ErrorCatalog::Entries(&a.error_catalog),
            Self::Feature(a) => ErrorCatalog::Text(&a.error_catalog),
        }
    }

    pub fn diagram(&self) -> &str {
        match self {
            Self::File(a) => &a.diagram,
            Self::Feature(a) => &a.diagram,
        }
    }

    /// Clean JSON in the shape the model is asked for; `parse` accepts it unchanged.
    pub fn to_json(&self) -> String {
        let encoded = match self {
            Self::File(a) => serde_json::to_string_pretty(a),
            Self::Feature(a) => serde_json::to_string_pretty(a),
        };
        // Plain structs of strings cannot fail to serialise.
        encoded.unwrap_or_default()
    }
}

#[derive(Debug, Error)]
#[error("model response is not a valid documentation artifact: {reason}")]
pub struct ArtifactParseError {
    pub reason: String,
    /// The response exactly as received, for diagnosis.
    pub raw_payload: String,
}

fn opening_fence() -> &'static Regex {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    // Opening fence with an optional info string.
    OPEN.get_or_init(|| {
        Regex::new(r"\A\s*```[\w-]*[ \t]*\r?\n?").expect("opening fence pattern is valid")
    })
}

fn closing_fence() -> &'static Regex {
    static CLOSE: OnceLock<Regex> = OnceLock::new();
    CLOSE.get_or_init(|| Regex::new(r"\r?\n?[ \t]*```\s*\z").expect("closing fence pattern is valid"))
}

/// Remove a leading and a trailing Markdown code fence line, each only if present,
/// and outer whitespace.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(m) = opening_fence().find(body) {
        body = &body[m.end()..];
    }
    if let Some(m) = closing_fence().find(body) {
        body = &body[..m.start()];
    }
    body.trim()
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str, raw: &str) -> Result<T, ArtifactParseError> {
    serde_json::from_str(body).map_err(|e| ArtifactParseError {
        reason: e.to_string(),
        raw_payload: raw.to_string(),
    })
}

/// Decode a raw model response into the artifact schema selected by `mode`.
pub fn parse(raw: &str, mode: &UnitMode) -> Result<DocumentationArtifact, ArtifactParseError> {
    let body = strip_code_fence(raw);
    debug!(bytes = body.len(), "Parsing model response");
    let artifact = match mode {
        UnitMode::PerFile => DocumentationArtifact::File(decode(body, raw)?),
        UnitMode::Feature { .. } => DocumentationArtifact::Feature(decode(body, raw)?),
    };
    if artifact.title().trim().is_empty() {
        return Err(ArtifactParseError {
            reason: "field `title` must not be empty".to_string(),
            raw_payload: raw.to_string(),
        });
    }
    Ok(artifact)
}
