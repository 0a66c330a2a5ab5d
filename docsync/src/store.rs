#![doc = "DocumentStore integration: a Notion database behind the core `DocumentStore` trait."]
//
//! # Notion store
//!
//! [`NotionStore`] maps the store contract onto the Notion REST API. Every record
//! is a page in one database; the page title is the record title.
//!
//! Properties written:
//! - `Name` (title)
//! - `Last Updated` (date, RFC 3339)
//! - `File Path` (rich text, comma-joined member files)
//!
//! Limits handled here rather than in the core: at most 100 children per append
//! call, and at most 2000 characters per rich text segment.

use async_trait::async_trait;
use docsync_core::contract::{
    Block, BlockRef, BoxError, DocumentStore, RecordProperties, RecordRef, SpanStyle, TextSpan,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_CHILDREN_PER_APPEND: usize = 100;
pub const MAX_RICH_TEXT_CHARS: usize = 2000;

pub const TITLE_PROPERTY: &str = "Name";
pub const LAST_UPDATED_PROPERTY: &str = "Last Updated";
pub const FILE_PATH_PROPERTY: &str = "File Path";

#[derive(Deserialize)]
struct ObjectRef {
    id: String,
}

#[derive(Deserialize)]
struct ListResponse {
    results: Vec<ObjectRef>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

pub struct NotionStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
    database_id: String,
}

impl NotionStore {
    pub fn new(
        token: impl Into<String>,
        database_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, BoxError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            database_id: database_id.into(),
        })
    }

    pub fn new_from_env() -> Result<Self, BoxError> {
        let token = env::var("NOTION_API_KEY").unwrap_or_else(|_| {
            tracing::warn!("NOTION_API_KEY is not set; store requests will be rejected");
            String::new()
        });
        let database_id = env::var("NOTION_DATABASE_ID").unwrap_or_else(|_| {
            tracing::warn!("NOTION_DATABASE_ID is not set; store requests will fail");
            String::new()
        });
        let base_url =
            env::var("NOTION_BASE_URL").unwrap_or_else(|_| DEFAULT_NOTION_BASE_URL.to_string());
        tracing::info!(
            token_set = !token.is_empty(),
            database_id = %database_id,
            base_url = %base_url,
            "Initialized NotionStore from environment"
        );
        Self::new(token, database_id, base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<Value, BoxError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %text, operation = what, "Notion API returned error");
            return Err(format!("Notion API error during {what} ({status}): {text}").into());
        }
        Ok(resp.json().await?)
    }
}

/// Split text into Notion rich text objects of at most [`MAX_RICH_TEXT_CHARS`] characters.
pub fn rich_text(text: &str) -> Vec<Value> {
    styled_rich_text(&TextSpan::plain(text))
}

fn styled_rich_text(span: &TextSpan) -> Vec<Value> {
    let chars: Vec<char> = span.text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    chars
        .chunks(MAX_RICH_TEXT_CHARS)
        .map(|chunk| {
            let content: String = chunk.iter().collect();
            match span.style {
                SpanStyle::Plain => json!({"type": "text", "text": {"content": content}}),
                SpanStyle::Code => json!({
                    "type": "text",
                    "text": {"content": content},
                    "annotations": {"bold": true, "code": true}
                }),
            }
        })
        .collect()
}

fn typed_block(kind: &str, body: Value) -> Value {
    json!({"object": "block", "type": kind, kind: body})
}

/// Notion JSON for one block.
pub fn block_to_json(block: &Block) -> Value {
    match block {
        Block::Heading(text) => typed_block("heading_2", json!({"rich_text": rich_text(text)})),
        Block::Paragraph(text) => typed_block("paragraph", json!({"rich_text": rich_text(text)})),
        Block::BulletedItem(spans) => {
            let rich: Vec<Value> = spans.iter().flat_map(styled_rich_text).collect();
            typed_block("bulleted_list_item", json!({"rich_text": rich}))
        }
        Block::Image { url } => typed_block(
            "image",
            json!({"type": "external", "external": {"url": url}}),
        ),
        Block::Toggle { title, children } => typed_block(
            "toggle",
            json!({
                "rich_text": rich_text(title),
                "children": children.iter().map(block_to_json).collect::<Vec<_>>()
            }),
        ),
        Block::Code { language, text } => typed_block(
            "code",
            json!({"rich_text": rich_text(text), "language": language}),
        ),
    }
}

/// Notion page properties for a record.
pub fn properties_json(props: &RecordProperties) -> Value {
    json!({
        TITLE_PROPERTY: {"title": rich_text(&props.title)},
        LAST_UPDATED_PROPERTY: {"date": {"start": props.last_updated.to_rfc3339()}},
        FILE_PATH_PROPERTY: {"rich_text": rich_text(&props.source_label)},
    })
}

#[async_trait]
impl DocumentStore for NotionStore {
    async fn find_by_title(&self, title: &str) -> Result<Vec<RecordRef>, BoxError> {
        tracing::info!(title, "Querying database for record");
        let body = json!({
            "filter": {"property": TITLE_PROPERTY, "title": {"equals": title}}
        });
        let value = self
            .send(
                self.request(
                    reqwest::Method::POST,
                    &format!("/v1/databases/{}/query", self.database_id),
                )
                .json(&body),
                "query",
            )
            .await?;
        let list: ListResponse = serde_json::from_value(value)?;
        tracing::info!(title, matches = list.results.len(), "Queried database");
        Ok(list
            .results
            .into_iter()
            .map(|r| RecordRef { id: r.id })
            .collect())
    }

    async fn create_record(&self, props: &RecordProperties) -> Result<RecordRef, BoxError> {
        tracing::info!(title = %props.title, "Creating page");
        let body = json!({
            "parent": {"database_id": self.database_id},
            "properties": properties_json(props),
        });
        let value = self
            .send(
                self.request(reqwest::Method::POST, "/v1/pages").json(&body),
                "create page",
            )
            .await?;
        let page: ObjectRef = serde_json::from_value(value)?;
        tracing::info!(page_id = %page.id, "Successfully created page");
        Ok(RecordRef { id: page.id })
    }

    async fn update_properties(
        &self,
        record_id: &str,
        props: &RecordProperties,
    ) -> Result<(), BoxError> {
        tracing::info!(page_id = record_id, "Updating page properties");
        let body = json!({"properties": properties_json(props)});
        self.send(
            self.request(reqwest::Method::PATCH, &format!("/v1/pages/{record_id}"))
                .json(&body),
            "update page",
        )
        .await?;
        Ok(())
    }

    async fn list_child_blocks(&self, record_id: &str) -> Result<Vec<BlockRef>, BoxError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut builder = self
                .request(
                    reqwest::Method::GET,
                    &format!("/v1/blocks/{record_id}/children"),
                )
                .query(&[("page_size", "100")]);
            if let Some(c) = &cursor {
                builder = builder.query(&[("start_cursor", c.as_str())]);
            }
            let value = self.send(builder, "list children").await?;
            let page: ListResponse = serde_json::from_value(value)?;
            blocks.extend(page.results.into_iter().map(|r| BlockRef { id: r.id }));
            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }
        tracing::info!(page_id = record_id, count = blocks.len(), "Listed child blocks");
        Ok(blocks)
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), BoxError> {
        tracing::debug!(block_id, "Deleting block");
        self.send(
            self.request(reqwest::Method::DELETE, &format!("/v1/blocks/{block_id}")),
            "delete block",
        )
        .await?;
        Ok(())
    }

    async fn append_child_blocks(
        &self,
        record_id: &str,
        blocks: Vec<Block>,
    ) -> Result<(), BoxError> {
        let children: Vec<Value> = blocks.iter().map(block_to_json).collect();
        for chunk in children.chunks(MAX_CHILDREN_PER_APPEND) {
            self.send(
                self.request(
                    reqwest::Method::PATCH,
                    &format!("/v1/blocks/{record_id}/children"),
                )
                .json(&json!({"children": chunk})),
                "append children",
            )
            .await?;
        }
        tracing::info!(page_id = record_id, count = children.len(), "Appended child blocks");
        Ok(())
    }
}
