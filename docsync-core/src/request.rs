//! Prompt construction and the single model round trip per unit.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::contract::{BoxError, GenerationRequest, Generator};
use crate::units::{AnalysisUnit, UnitMode};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Model parameters used for every request in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSettings {
    pub model: String,
    pub max_tokens: u32,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Error)]
#[error("model request failed for unit `{unit_key}`: {source}")]
pub struct UpstreamError {
    pub unit_key: String,
    #[source]
    pub source: BoxError,
}

const FILE_SCHEMA: &str = r#"{
  "title": "string, a short human-readable name for what this file does (non-empty, stable)",
  "description": "string, what the file is for; separate paragraphs with a blank line",
  "mechanism": "string, how it works step by step; separate paragraphs with a blank line",
  "technical_notes": "string, one bullet per line, each line starting with \"• \"",
  "error_catalog": [
    { "error_message": "string, the exact message or condition", "explanation": "string, what causes it and how to fix it" }
  ],
  "diagram": "string, a Mermaid flowchart (e.g. starting with \"flowchart TD\") of the main flow"
}"#;

const FEATURE_SCHEMA: &str = r#"{
  "title": "string, the feature's name as a product person would say it (non-empty, stable)",
  "plain_summary": "string, two or three sentences for a non-technical reader",
  "description": "string, what the feature does; separate paragraphs with a blank line",
  "mechanism": "string, how the files cooperate; separate paragraphs with a blank line",
  "technical_notes": "string, one bullet per line, each line starting with \"• \"",
  "error_catalog": "string, one bullet per line describing each user-visible error and its cause",
  "diagram": "string, a Mermaid flowchart (e.g. starting with \"flowchart TD\") of the feature's flow"
}"#;

/// Build the prompt for one unit. Pure: the same unit and mode always give the same text.
pub fn build_prompt(unit: &AnalysisUnit, mode: &UnitMode) -> String {
    let (subject, schema) = match mode {
        UnitMode::PerFile => (format!("the source file `{}`", unit.unit_key), FILE_SCHEMA),
        UnitMode::Feature { name } => (
            format!("the feature `{}`, made up of the files listed below", name),
            FEATURE_SCHEMA,
        ),
    };
    let members = unit
        .members
        .iter()
        .map(|m| format!("- {}", m.relative_name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are writing internal documentation for {subject}.\n\
         \n\
         Unit: {key}\n\
         Files:\n\
         {members}\n\
         \n\
         Source (each file starts with a `===== FILE: <name> =====` header line):\n\
         {source}\n\
         \n\
         Respond with ONLY a JSON object, no prose and no Markdown code fences, matching exactly this schema:\n\
         {schema}\n\
         \n\
         Every key is required. Use an empty string (or an empty array) when a section has nothing to say.",
        subject = subject,
        key = unit.unit_key,
        members = members,
        source = unit.concatenated_source,
        schema = schema,
    )
}

/// Sends one prompt per unit to the model.
pub struct DocumentationRequester<'g, G: Generator> {
    generator: &'g G,
    settings: RequestSettings,
}

impl<'g, G: Generator> DocumentationRequester<'g, G> {
    pub fn new(generator: &'g G, settings: RequestSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// One blocking round trip; failures are returned as-is, never retried.
    pub async fn request(
        &self,
        unit: &AnalysisUnit,
        mode: &UnitMode,
    ) -> Result<String, UpstreamError> {
        let prompt = build_prompt(unit, mode);
        info!(
            unit_key = %unit.unit_key,
            prompt_bytes = prompt.len(),
            model = %self.settings.model,
            "Requesting documentation from model"
        );
        let req = GenerationRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            prompt: &prompt,
        };
        match self.generator.generate(req).await {
            Ok(text) => {
                info!(unit_key = %unit.unit_key, response_bytes = text.len(), "Model responded");
                Ok(text)
            }
            Err(source) => {
                error!(unit_key = %unit.unit_key, error = ?source, "Model request failed");
                Err(UpstreamError {
                    unit_key: unit.unit_key.clone(),
                    source,
                })
            }
        }
    }
}
