use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use docsync_core::artifact::{DocumentationArtifact, ErrorEntry, FeatureArtifact, FileArtifact};
use docsync_core::contract::{Block, SpanStyle, TextSpan};
use docsync_core::render::{bullets, paragraphs, render_blocks, DiagramRenderer};

fn file_artifact(diagram: &str) -> DocumentationArtifact {
    DocumentationArtifact::File(FileArtifact {
        title: "Parser".to_string(),
        description: "First.\n\nSecond.\n   \nThird.".to_string(),
        mechanism: "Only one.".to_string(),
        technical_notes: "• one\n\n- two\n* three\nfour".to_string(),
        error_catalog: vec![ErrorEntry {
            error_message: "unexpected token".to_string(),
            explanation: "The input had a stray comma.".to_string(),
        }],
        diagram: diagram.to_string(),
    })
}

#[test]
fn test_paragraphs_split_on_blank_lines() {
    assert_eq!(
        paragraphs("A line\ncontinued.\n\n\nB.\n \t\nC."),
        vec!["A line\ncontinued.", "B.", "C."]
    );
    assert!(paragraphs("").is_empty());
    assert!(paragraphs("\n\n  \n").is_empty());
}

#[test]
fn test_bullets_strip_markers_and_blank_lines() {
    assert_eq!(
        bullets("• uses a single integer field\n• bounded at 255\n\n  - dash\n+ plus\nplain"),
        vec![
            "uses a single integer field",
            "bounded at 255",
            "dash",
            "plus",
            "plain"
        ]
    );
    assert!(bullets("•\n  \n").is_empty());
}

#[test]
fn test_bullets_keep_leading_signs_and_emphasis() {
    assert_eq!(
        bullets("**Thread safety**: guarded by a mutex\n-1 means unbounded\n- real bullet\n*ptr is never null\n* starred"),
        vec![
            "**Thread safety**: guarded by a mutex",
            "-1 means unbounded",
            "real bullet",
            "*ptr is never null",
            "starred"
        ]
    );
    assert_eq!(bullets("•no space\n·middot"), vec!["no space", "middot"]);
}

#[test]
fn test_render_file_artifact_layout() {
    let renderer = DiagramRenderer::new("https://render.test/img/");
    let blocks = render_blocks(&file_artifact("flowchart TD\nA-->B"), &renderer);

    let expected_url = format!(
        "https://render.test/img/{}",
        URL_SAFE_NO_PAD.encode("flowchart TD\nA-->B")
    );
    let expected = vec![
        Block::Heading("Description".to_string()),
        Block::Paragraph("First.".to_string()),
        Block::Paragraph("Second.".to_string()),
        Block::Paragraph("Third.".to_string()),
        Block::Heading("How It Works".to_string()),
        Block::Paragraph("Only one.".to_string()),
        Block::Heading("Technical Details".to_string()),
        Block::BulletedItem(vec![TextSpan::plain("one")]),
        Block::BulletedItem(vec![TextSpan::plain("two")]),
        Block::BulletedItem(vec![TextSpan::plain("three")]),
        Block::BulletedItem(vec![TextSpan::plain("four")]),
        Block::Heading("Error Messages".to_string()),
        Block::BulletedItem(vec![
            TextSpan::code("unexpected token"),
            TextSpan::plain(": The input had a stray comma."),
        ]),
        Block::Heading("Flow Diagram".to_string()),
        Block::Image { url: expected_url },
        Block::Toggle {
            title: "Diagram source".to_string(),
            children: vec![Block::Code {
                language: "mermaid".to_string(),
                text: "flowchart TD\nA-->B".to_string(),
            }],
        },
    ];
    assert_eq!(blocks, expected);
}

#[test]
fn test_blank_diagram_omits_diagram_section() {
    let blocks = render_blocks(&file_artifact("  \n"), &DiagramRenderer::default());
    assert!(!blocks
        .iter()
        .any(|b| matches!(b, Block::Image { .. } | Block::Toggle { .. })));
    assert!(!blocks.contains(&Block::Heading("Flow Diagram".to_string())));
}

#[test]
fn test_error_message_is_set_apart_from_explanation() {
    let blocks = render_blocks(&file_artifact(""), &DiagramRenderer::default());
    let item = blocks
        .iter()
        .find_map(|b| match b {
            Block::BulletedItem(spans) if spans.len() == 2 => Some(spans),
            _ => None,
        })
        .expect("structured error entry");
    assert_eq!(item[0].style, SpanStyle::Code);
    assert_eq!(item[1].style, SpanStyle::Plain);
}

#[test]
fn test_render_feature_artifact_includes_summary_and_free_form_errors() {
    let artifact = DocumentationArtifact::Feature(FeatureArtifact {
        title: "Checkout".to_string(),
        plain_summary: Some("Lets shoppers pay.".to_string()),
        description: "Handles carts.".to_string(),
        mechanism: String::new(),
        technical_notes: String::new(),
        error_catalog: "• Card declined\n• Cart empty".to_string(),
        diagram: String::new(),
    });

    let blocks = render_blocks(&artifact, &DiagramRenderer::default());

    assert_eq!(
        blocks,
        vec![
            Block::Heading("Summary".to_string()),
            Block::Paragraph("Lets shoppers pay.".to_string()),
            Block::Heading("Description".to_string()),
            Block::Paragraph("Handles carts.".to_string()),
            Block::Heading("How It Works".to_string()),
            Block::Heading("Technical Details".to_string()),
            Block::Heading("Error Messages".to_string()),
            Block::BulletedItem(vec![TextSpan::plain("Card declined")]),
            Block::BulletedItem(vec![TextSpan::plain("Cart empty")]),
        ]
    );
}

#[test]
fn test_default_diagram_renderer_uses_mermaid_ink() {
    let url = DiagramRenderer::default().image_url("graph TD; A-->B");
    assert!(url.starts_with("https://mermaid.ink/img/"));
    assert!(!url.contains('='));
}
