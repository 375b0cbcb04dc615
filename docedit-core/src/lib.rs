//! docedit core - document model, outline and markdown ingestion
//!
//! This crate contains the logic behind the editor, independent of any UI:
//! - Block document model behind the `DocumentModel` trait, with change subscription
//! - Heading outline extraction and the outline panel state
//! - Markdown-subset ingestion for seeding documents
//! - Configuration management
//! - File watching (optional feature)

pub mod config;
pub mod ingest;
pub mod model;
pub mod navigation;
pub mod outline;

#[cfg(feature = "watch")]
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{ingest, seed};
pub use model::{Block, BlockView, DocumentModel, EditorDocument, Span, SpanStyle, Subscription};
pub use navigation::{OutlinePanel, ScrollTarget};
pub use outline::{extract_outline, HeadingLevel, MalformedTagPolicy, OutlineEntry, OutlineError};
