//! # contract: service interfaces consumed by the sync pipeline
//!
//! This module defines the two traits the core pipeline talks to, and the plain
//! data types that cross them:
//!
//! - [`Generator`]: a generative text model. One prompt in, one block of text out.
//! - [`DocumentStore`]: a titled-record store with ordered child blocks (a Notion
//!   database, or an in-memory fake in tests).
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so consumers can generate deterministic
//!   mocks for unit/integration tests (`MockGenerator`, `MockDocumentStore`).
//!
//! ## Error Handling
//! - Implementors convert all transport/API errors into a boxed [`BoxError`].
//!   The core wraps these into its own typed errors with the stage that failed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

/// Boxed error returned by service implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single request to the generative model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest<'a> {
    /// Model identifier, passed through verbatim.
    pub model: &'a str,
    /// Upper bound on output tokens.
    pub max_tokens: u32,
    /// The whole prompt, sent as a single user message.
    pub prompt: &'a str,
}

/// Trait for the generative text service.
///
/// The call is a single blocking round trip from the pipeline's point of view:
/// no streaming, no retries.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Send the prompt and return the first text segment of the reply.
    async fn generate<'a>(&self, req: GenerationRequest<'a>) -> Result<String, BoxError>;
}

/// Properties written on every destination record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordProperties {
    /// Unique record title; the artifact title.
    pub title: String,
    pub last_updated: DateTime<Utc>,
    /// Comma-joined relative names of the unit's member files.
    pub source_label: String,
}

/// Handle to an existing destination record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    pub id: String,
}

/// Handle to an existing child block of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    pub id: String,
}

/// Inline style for a run of text inside a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    /// Bold inline code, used to set error messages apart from their explanation.
    Code,
}

/// A run of text with a single style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub style: SpanStyle,
}

impl TextSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SpanStyle::Plain,
        }
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SpanStyle::Code,
        }
    }
}

/// Store-agnostic content block appended under a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
    BulletedItem(Vec<TextSpan>),
    /// Externally hosted image.
    Image { url: String },
    /// Collapsible block holding nested children.
    Toggle { title: String, children: Vec<Block> },
    Code { language: String, text: String },
}

/// Trait for the destination document store.
///
/// All operations are scoped to one fixed container (e.g. a Notion database)
/// chosen when the implementor is constructed.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Records whose title equals `title` exactly.
    async fn find_by_title(&self, title: &str) -> Result<Vec<RecordRef>, BoxError>;

    /// Create a new record with the given properties and no content.
    async fn create_record(&self, props: &RecordProperties) -> Result<RecordRef, BoxError>;

    /// Overwrite the properties of an existing record.
    async fn update_properties(
        &self,
        record_id: &str,
        props: &RecordProperties,
    ) -> Result<(), BoxError>;

    /// All direct child blocks of a record, in order.
    async fn list_child_blocks(&self, record_id: &str) -> Result<Vec<BlockRef>, BoxError>;

    async fn delete_block(&self, block_id: &str) -> Result<(), BoxError>;

    /// Append blocks after the record's existing children, preserving order.
    async fn append_child_blocks(
        &self,
        record_id: &str,
        blocks: Vec<Block>,
    ) -> Result<(), BoxError>;
}
