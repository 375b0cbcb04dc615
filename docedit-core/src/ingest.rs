//! Markdown-subset ingestion
//!
//! Turns a small markdown dialect into the blocks that seed a new document:
//! `#`, `##` and `###` headings, plus paragraphs with `**bold**` and
//! `*italic*` runs. Anything else is kept as plain text. Ingestion never fails.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Block, DocumentModel, ModelError, Span};
use crate::outline::HeadingLevel;

/// Content shown when no document is supplied and the config does not opt out
pub const WELCOME_DOCUMENT: &str = concat!(
    "# Document Title\n",
    "\n",
    "## Introduction\n",
    "\n",
    "Welcome to this comprehensive document editor. It provides collaboration features including suggestions, comments, and approval workflows.\n",
    "\n",
    "## Key Features\n",
    "\n",
    "### Rich Text Editing\n",
    "- **Bold text** and *italic text*\n",
    "- Multiple heading levels\n",
    "- Bullet points and numbered lists\n",
    "- Professional formatting options\n",
    "\n",
    "### Collaboration Tools\n",
    "- Real-time suggestions and change tracking\n",
    "- Commenting system for feedback\n",
    "- Approval workflows for document review\n",
    "\n",
    "## Getting Started\n",
    "\n",
    "Start typing to see the document outline populate. Use the outline to jump between sections.\n",
    "\n",
    "### Sample Heading\n",
    "This is where you can add more content. The navigation will automatically update as you add headings.",
);

/// Heading markers, longest first so `### ` never reads as `# `
const HEADING_MARKERS: [(&str, HeadingLevel); 3] = [
    ("### ", HeadingLevel::H3),
    ("## ", HeadingLevel::H2),
    ("# ", HeadingLevel::H1),
];

static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*.*?\*\*|\*.*?\*").expect("emphasis pattern is valid"));

/// Ingest `source` into [`Block`]s, one per line
pub fn ingest(source: &str) -> Vec<Block> {
    ingest_with(source, |level, text| Block::heading(level, text), Block::paragraph)
}

/// Ingest `source`, building nodes with the supplied constructors.
///
/// Lines are split on `\n`; a trailing `\r` is dropped so CRLF input reads
/// the same as LF input. An empty source yields a single empty paragraph.
pub fn ingest_with<N>(
    source: &str,
    mut heading: impl FnMut(HeadingLevel, &str) -> N,
    mut paragraph: impl FnMut(Vec<Span>) -> N,
) -> Vec<N> {
    let nodes: Vec<N> = source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .map(|line| match classify(line) {
            Line::Heading(level, text) => heading(level, text),
            Line::Text(text) => paragraph(tokenize_inline(text)),
            Line::Blank => paragraph(Vec::new()),
        })
        .collect();

    debug!("ingested {} blocks from {} bytes", nodes.len(), source.len());
    nodes
}

enum Line<'a> {
    Heading(HeadingLevel, &'a str),
    Text(&'a str),
    Blank,
}

fn classify(line: &str) -> Line<'_> {
    for (marker, level) in HEADING_MARKERS {
        if let Some(rest) = line.strip_prefix(marker) {
            return Line::Heading(level, rest);
        }
    }

    if line.trim().is_empty() {
        Line::Blank
    } else {
        Line::Text(line)
    }
}

/// Split a paragraph line into plain, bold and italic spans.
///
/// Unmatched markers stay in the plain text. Whitespace-only runs between
/// emphasis are dropped.
pub fn tokenize_inline(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for found in EMPHASIS.find_iter(line) {
        push_fragment(&mut spans, &line[last..found.start()]);
        push_fragment(&mut spans, found.as_str());
        last = found.end();
    }
    push_fragment(&mut spans, &line[last..]);

    spans
}

fn push_fragment(spans: &mut Vec<Span>, fragment: &str) {
    if fragment.len() >= 4 && fragment.starts_with("**") && fragment.ends_with("**") {
        spans.push(Span::bold(&fragment[2..fragment.len() - 2]));
    } else if fragment.len() >= 2 && fragment.starts_with('*') && fragment.ends_with('*') {
        spans.push(Span::italic(&fragment[1..fragment.len() - 1]));
    } else if !fragment.trim().is_empty() {
        spans.push(Span::plain(fragment));
    }
}

/// Replace the model's content with the ingested `source`.
///
/// Clears the root and appends the new blocks inside a single update, so
/// subscribers see exactly one change. Returns `Ok(false)` without touching
/// the model when there is no source.
pub fn seed<M: DocumentModel>(model: &mut M, source: Option<&str>) -> Result<bool, ModelError> {
    let Some(source) = source else {
        return Ok(false);
    };

    let nodes = ingest_with(
        source,
        |level, text| model.create_heading(level, text),
        |spans| model.create_paragraph(spans),
    );

    model.update(|root| {
        root.clear();
        for node in nodes {
            root.append(node);
        }
    })?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockView, EditorDocument};

    #[test]
    fn test_headings() {
        let blocks = ingest("# Title\n## Sub");
        assert_eq!(
            blocks,
            vec![
                Block::heading(HeadingLevel::H1, "Title"),
                Block::heading(HeadingLevel::H2, "Sub"),
            ]
        );
    }

    #[test]
    fn test_longest_marker_wins() {
        assert_eq!(ingest("### Deep"), vec![Block::heading(HeadingLevel::H3, "Deep")]);
    }

    #[test]
    fn test_heading_text_is_verbatim() {
        assert_eq!(
            ingest("##  Spaced  "),
            vec![Block::heading(HeadingLevel::H2, " Spaced  ")]
        );
    }

    #[test]
    fn test_marker_without_space_is_text() {
        assert_eq!(ingest("#tag"), vec![Block::paragraph(vec![Span::plain("#tag")])]);
        assert_eq!(
            ingest("#### Four"),
            vec![Block::paragraph(vec![Span::plain("#### Four")])]
        );
    }

    #[test]
    fn test_inline_spans() {
        let blocks = ingest("**bold** and *italic* text");
        assert_eq!(
            blocks,
            vec![Block::paragraph(vec![
                Span::bold("bold"),
                Span::plain(" and "),
                Span::italic("italic"),
                Span::plain(" text"),
            ])]
        );
    }

    #[test]
    fn test_blank_lines_become_empty_paragraphs() {
        let blocks = ingest("Para1\n\nPara2");
        assert_eq!(
            blocks,
            vec![
                Block::paragraph(vec![Span::plain("Para1")]),
                Block::empty_paragraph(),
                Block::paragraph(vec![Span::plain("Para2")]),
            ]
        );
    }

    #[test]
    fn test_whitespace_line_is_blank() {
        assert_eq!(ingest("   \t"), vec![Block::empty_paragraph()]);
    }

    #[test]
    fn test_unmatched_marker_stays_plain() {
        assert_eq!(ingest("a * b"), vec![Block::paragraph(vec![Span::plain("a * b")])]);
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(ingest(""), vec![Block::empty_paragraph()]);
    }

    #[test]
    fn test_crlf_matches_lf() {
        assert_eq!(ingest("# A\r\nbody\r\n"), ingest("# A\nbody\n"));
    }

    #[test]
    fn test_leading_whitespace_kept_in_plain_span() {
        assert_eq!(
            ingest("  indented"),
            vec![Block::paragraph(vec![Span::plain("  indented")])]
        );
    }

    #[test]
    fn test_whitespace_between_emphasis_is_dropped() {
        let spans = tokenize_inline("**a** *b*");
        assert_eq!(spans, vec![Span::bold("a"), Span::italic("b")]);
    }

    #[test]
    fn test_triple_markers_split_into_single_styles() {
        let spans = tokenize_inline("***both***");
        assert_eq!(spans, vec![Span::bold("*both"), Span::plain("*")]);
    }

    #[test]
    fn test_welcome_document_shape() {
        let blocks = ingest(WELCOME_DOCUMENT);
        assert_eq!(blocks.len(), 25);
        assert_eq!(blocks[0], Block::heading(HeadingLevel::H1, "Document Title"));
        assert_eq!(
            blocks[9],
            Block::paragraph(vec![
                Span::plain("- "),
                Span::bold("Bold text"),
                Span::plain(" and "),
                Span::italic("italic text"),
            ])
        );
    }

    #[test]
    fn test_seed_replaces_content() {
        let mut doc = EditorDocument::from_blocks(vec![Block::heading(HeadingLevel::H1, "Old")]);

        assert!(seed(&mut doc, Some("# New\nbody")).unwrap());

        let children = doc.children().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].text_content(), "New");
        assert_eq!(doc.rev(), 1);
    }

    #[test]
    fn test_seed_without_source_leaves_document_alone() {
        let mut doc = EditorDocument::new();
        assert!(!seed(&mut doc, None).unwrap());
        assert!(doc.children().unwrap().is_empty());
        assert_eq!(doc.rev(), 0);
    }

    #[test]
    fn test_seed_detached_root_fails() {
        let mut doc = EditorDocument::new();
        doc.detach_root();
        assert_eq!(seed(&mut doc, Some("# A")), Err(ModelError::RootUnavailable));
    }
}
