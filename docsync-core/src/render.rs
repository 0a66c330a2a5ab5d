//! Rendering an artifact into destination content blocks.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;

use crate::artifact::{DocumentationArtifact, ErrorCatalog};
use crate::contract::{Block, TextSpan};

pub const DEFAULT_DIAGRAM_BASE_URL: &str = "https://mermaid.ink/img/";

pub const SUMMARY_HEADING: &str = "Summary";
pub const DESCRIPTION_HEADING: &str = "Description";
pub const MECHANISM_HEADING: &str = "How It Works";
pub const TECHNICAL_HEADING: &str = "Technical Details";
pub const ERRORS_HEADING: &str = "Error Messages";
pub const DIAGRAM_HEADING: &str = "Flow Diagram";
pub const DIAGRAM_TOGGLE_TITLE: &str = "Diagram source";

/// Turns diagram source into a URL an external service renders as an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramRenderer {
    base_url: String,
}

impl DiagramRenderer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn image_url(&self, diagram: &str) -> String {
        format!("{}{}", self.base_url, URL_SAFE_NO_PAD.encode(diagram.as_bytes()))
    }
}

impl Default for DiagramRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGRAM_BASE_URL)
    }
}

fn blank_line() -> &'static Regex {
    static BLANK: OnceLock<Regex> = OnceLock::new();
    BLANK.get_or_init(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("blank line pattern is valid"))
}

fn bullet_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    // ASCII markers need trailing whitespace so `-1` and `**bold**` survive.
    MARKER.get_or_init(|| Regex::new(r"^(?:[•·]\s*|[-*+]\s+)").expect("bullet pattern is valid"))
}

/// Split on blank lines; trimmed, empty pieces dropped.
pub fn paragraphs(text: &str) -> Vec<String> {
    blank_line()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// One item per non-blank line, leading bullet marker removed.
pub fn bullets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| bullet_marker().replace(l, "").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

fn heading(blocks: &mut Vec<Block>, title: &str) {
    blocks.push(Block::Heading(title.to_string()));
}

fn paragraph_section(blocks: &mut Vec<Block>, title: &str, text: &str) {
    heading(blocks, title);
    blocks.extend(paragraphs(text).into_iter().map(Block::Paragraph));
}

fn bullet_section(blocks: &mut Vec<Block>, title: &str, text: &str) {
    heading(blocks, title);
    blocks.extend(
        bullets(text)
            .into_iter()
            .map(|b| Block::BulletedItem(vec![TextSpan::plain(b)])),
    );
}

/// Blocks for the record body, in display order.
pub fn render_blocks(artifact: &DocumentationArtifact, diagrams: &DiagramRenderer) -> Vec<Block> {
    let mut blocks = Vec::new();

    if let Some(summary) = artifact.plain_summary().filter(|s| !s.trim().is_empty()) {
        paragraph_section(&mut blocks, SUMMARY_HEADING, summary);
    }
    paragraph_section(&mut blocks, DESCRIPTION_HEADING, artifact.description());
    paragraph_section(&mut blocks, MECHANISM_HEADING, artifact.mechanism());
    bullet_section(&mut blocks, TECHNICAL_HEADING, artifact.technical_notes());

    match artifact.error_catalog() {
        ErrorCatalog::Entries(entries) => {
            heading(&mut blocks, ERRORS_HEADING);
            blocks.extend(entries.iter().map(|entry| {
                Block::BulletedItem(vec![
                    TextSpan::code(entry.error_message.trim()),
                    TextSpan::plain(format!(": {}", entry.explanation.trim())),
                ])
            }));
        }
        ErrorCatalog::Text(text) => bullet_section(&mut blocks, ERRORS_HEADING, text),
    }

    let diagram = artifact.diagram().trim();
    if !diagram.is_empty() {
        heading(&mut blocks, DIAGRAM_HEADING);
        blocks.push(Block::Image {
            url: diagrams.image_url(diagram),
        });
        blocks.push(Block::Toggle {
            title: DIAGRAM_TOGGLE_TITLE.to_string(),
            children: vec![Block::Code {
                language: "mermaid".to_string(),
                text: diagram.to_string(),
            }],
        });
    }

    blocks
}
