#![doc = "Generator integration: the Anthropic Messages API behind the core `Generator` trait."]
//
//! # Model client
//!
//! [`ModelClient`] sends one prompt as a single user message and returns the first
//! text segment of the reply. No streaming, no retries: a failed call is returned
//! to the pipeline, which decides what to do with the unit.
//!
//! - Construct with [`ModelClient::new_from_env`] (`ANTHROPIC_API_KEY`, optional
//!   `ANTHROPIC_BASE_URL`) or [`ModelClient::new`].
//! - A missing key is not rejected here; the service answers 401 on first use.

use async_trait::async_trait;
use docsync_core::contract::{BoxError, GenerationRequest, Generator};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct ContentSegment {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentSegment>,
}

pub struct ModelClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ModelClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, BoxError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn new_from_env() -> Result<Self, BoxError> {
        let api_key = env::var("ANTHROPIC_API_KEY").unwrap_or_else(|_| {
            tracing::warn!("ANTHROPIC_API_KEY is not set; model requests will be rejected");
            String::new()
        });
        let base_url = env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_ANTHROPIC_BASE_URL.to_string());
        tracing::info!(
            api_key_set = !api_key.is_empty(),
            base_url = %base_url,
            "Initialized ModelClient from environment"
        );
        Self::new(api_key, base_url)
    }
}

#[async_trait]
impl Generator for ModelClient {
    async fn generate<'a>(&self, req: GenerationRequest<'a>) -> Result<String, BoxError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: req.model,
            max_tokens: req.max_tokens,
            messages: vec![Message {
                role: "user",
                content: req.prompt,
            }],
        };
        tracing::debug!(url = %url, model = req.model, "Sending messages request");

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %text, "Model API returned error");
            return Err(format!("model API error {status}: {text}").into());
        }

        let parsed: MessagesResponse = resp.json().await?;
        parsed
            .content
            .into_iter()
            .find(|segment| segment.kind == "text")
            .and_then(|segment| segment.text)
            .ok_or_else(|| "model reply contained no text segment".into())
    }
}
