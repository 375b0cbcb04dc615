//! Heading outline extraction
//!
//! Walks the root's direct children and summarizes every non-blank heading
//! as an [`OutlineEntry`]. The result is rebuilt from scratch on each call.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::{BlockView, DocumentModel, ModelError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutlineError {
    #[error("heading at position {position} has malformed tag {tag:?}")]
    MalformedTag { position: usize, tag: String },

    #[error("heading level {0} is outside 1..=6")]
    LevelOutOfRange(u8),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Heading depth, always within `1..=6`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const H1: Self = Self(1);
    pub const H2: Self = Self(2);
    pub const H3: Self = Self(3);
    pub const H4: Self = Self(4);
    pub const H5: Self = Self(5);
    pub const H6: Self = Self(6);

    pub fn new(level: u8) -> Option<Self> {
        (1..=6).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Parse a tag of the form `h1`..`h6`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.as_bytes() {
            [b'h', digit @ b'1'..=b'6'] => Some(Self(digit - b'0')),
            _ => None,
        }
    }

    pub fn tag(self) -> String {
        format!("h{}", self.0)
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = OutlineError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or(OutlineError::LevelOutOfRange(level))
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One navigable heading in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub id: String,
    pub text: String,
    pub level: HeadingLevel,
    /// Index of the heading among the root's direct children
    pub position: usize,
}

impl OutlineEntry {
    /// Indentation step used by the navigation list: levels past 4 share the deepest step
    pub fn indent_depth(&self) -> usize {
        (self.level.get() as usize - 1).min(3)
    }
}

/// What to do with a heading whose tag does not parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedTagPolicy {
    /// Abort the extraction with [`OutlineError::MalformedTag`]
    #[default]
    Fail,
    /// Leave the heading out of the outline
    Skip,
    /// Use the given level instead
    DefaultLevel(HeadingLevel),
}

/// Extract the outline, failing on the first malformed heading tag
pub fn extract_outline<N: BlockView>(children: &[N]) -> Result<Vec<OutlineEntry>, OutlineError> {
    extract_outline_with(children, MalformedTagPolicy::Fail)
}

/// Extract the outline, resolving malformed heading tags with `policy`
pub fn extract_outline_with<N: BlockView>(
    children: &[N],
    policy: MalformedTagPolicy,
) -> Result<Vec<OutlineEntry>, OutlineError> {
    let mut outline = Vec::new();

    // `index` counts every child, not just headings
    for (index, node) in children.iter().enumerate() {
        let Some(tag) = node.heading_tag() else {
            continue;
        };

        let level = match (HeadingLevel::from_tag(tag), policy) {
            (Some(level), _) => level,
            (None, MalformedTagPolicy::Fail) => {
                return Err(OutlineError::MalformedTag {
                    position: index,
                    tag: tag.to_string(),
                });
            }
            (None, MalformedTagPolicy::Skip) => {
                warn!("skipping heading at position {index} with malformed tag {tag:?}");
                continue;
            }
            (None, MalformedTagPolicy::DefaultLevel(fallback)) => {
                warn!("heading at position {index} has malformed tag {tag:?}, using level {fallback}");
                fallback
            }
        };

        let text = node.text_content();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        outline.push(OutlineEntry {
            id: format!("heading-{index}"),
            text: text.to_string(),
            level,
            position: index,
        });
    }

    Ok(outline)
}

/// Extract the outline straight from a document model
pub fn outline_of<M: DocumentModel>(
    model: &M,
    policy: MalformedTagPolicy,
) -> Result<Vec<OutlineEntry>, OutlineError> {
    extract_outline_with(model.children()?, policy)
}

/// Render the outline as indented plain text, one heading per line
pub fn render_outline(entries: &[OutlineEntry], indent_width: usize) -> String {
    let mut out = String::new();
    for entry in entries {
        let indent = entry.indent_depth() * indent_width;
        out.push_str(&" ".repeat(indent));
        out.push_str(&entry.text);
        out.push('\n');
    }
    out
}
