//! Block-level document model
//!
//! The outline and ingest code never touch a concrete editor. They go through
//! two capability traits:
//! - [`BlockView`]: heading predicate, tag and text accessors for one node
//! - [`DocumentModel`]: child enumeration, node constructors, a scoped
//!   mutation of the root and change subscription
//!
//! [`EditorDocument`] is the in-memory implementation used by the CLI and tests.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use thiserror::Error;

use crate::outline::HeadingLevel;

/// Errors reported by a document model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("document root is unavailable")]
    RootUnavailable,

    #[error("child index {index} is out of range for a root with {len} children")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Read access to a single top-level node
pub trait BlockView {
    /// The heading tag (`"h1"`..`"h6"`) if this node is a heading, `None` otherwise.
    ///
    /// The tag is reported as the model stores it; validating it is up to the caller.
    fn heading_tag(&self) -> Option<&str>;

    /// Full text content of the node, inline styling removed.
    fn text_content(&self) -> String;
}

/// Inline style carried by a [`Span`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStyle {
    #[default]
    Plain,
    Bold,
    Italic,
}

/// An inline run of text with a single style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::Plain)
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::Bold)
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::Italic)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.style {
            SpanStyle::Plain => f.write_str(&self.text),
            SpanStyle::Bold => write!(f, "**{}**", self.text),
            SpanStyle::Italic => write!(f, "*{}*", self.text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingNode {
    pub tag: String,
    pub text: String,
}

impl HeadingNode {
    pub fn new(level: HeadingLevel, text: impl Into<String>) -> Self {
        Self {
            tag: level.tag(),
            text: text.into(),
        }
    }

    /// Build a heading with an arbitrary tag, as a foreign model could report it
    pub fn with_tag(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
        }
    }

    /// Parsed level, `None` when the tag is malformed
    pub fn level(&self) -> Option<HeadingLevel> {
        HeadingLevel::from_tag(&self.tag)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphNode {
    pub spans: Vec<Span>,
}

/// A top-level document unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Heading(HeadingNode),
    Paragraph(ParagraphNode),
}

impl Block {
    pub fn heading(level: HeadingLevel, text: impl Into<String>) -> Self {
        Block::Heading(HeadingNode::new(level, text))
    }

    pub fn paragraph(spans: Vec<Span>) -> Self {
        Block::Paragraph(ParagraphNode { spans })
    }

    /// Paragraph with no spans, used for blank lines
    pub fn empty_paragraph() -> Self {
        Block::Paragraph(ParagraphNode::default())
    }
}

impl BlockView for Block {
    fn heading_tag(&self) -> Option<&str> {
        match self {
            Block::Heading(heading) => Some(&heading.tag),
            Block::Paragraph(_) => None,
        }
    }

    fn text_content(&self) -> String {
        match self {
            Block::Heading(heading) => heading.text.clone(),
            Block::Paragraph(paragraph) => {
                paragraph.spans.iter().map(|span| span.text.as_str()).collect()
            }
        }
    }
}

/// Renders the block back into the markdown subset the ingestor reads
impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Heading(heading) => match heading.level() {
                Some(level) => write!(f, "{} {}", "#".repeat(level.get() as usize), heading.text),
                None => f.write_str(&heading.text),
            },
            Block::Paragraph(paragraph) => {
                for span in &paragraph.spans {
                    write!(f, "{}", span)?;
                }
                Ok(())
            }
        }
    }
}

/// Write access to the root's child list, handed out inside [`DocumentModel::update`]
pub struct RootMut<'a, N> {
    children: &'a mut Vec<N>,
}

impl<'a, N> RootMut<'a, N> {
    pub fn new(children: &'a mut Vec<N>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[N] {
        &self.children[..]
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Remove every child
    pub fn clear(&mut self) {
        self.children.clear();
    }

    pub fn append(&mut self, node: N) {
        self.children.push(node);
    }

    pub fn insert(&mut self, index: usize, node: N) -> Result<(), ModelError> {
        let len = self.children.len();
        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        self.children.insert(index, node);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<N, ModelError> {
        let len = self.children.len();
        if index >= len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        Ok(self.children.remove(index))
    }

    pub fn replace(&mut self, index: usize, node: N) -> Result<N, ModelError> {
        let len = self.children.len();
        let slot = self
            .children
            .get_mut(index)
            .ok_or(ModelError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, node))
    }
}

/// The editor collaborator as seen by the outline and ingest code
pub trait DocumentModel {
    type Node: BlockView + 'static;

    /// Ordered direct children of the root
    fn children(&self) -> Result<&[Self::Node], ModelError>;

    fn create_heading(&self, level: HeadingLevel, text: &str) -> Self::Node;

    fn create_paragraph(&self, spans: Vec<Span>) -> Self::Node;

    /// Run `mutate` with exclusive write access to the root, then commit.
    ///
    /// Subscribers are notified once per committed update, after `mutate` returns.
    fn update<R>(
        &mut self,
        mutate: impl FnOnce(&mut RootMut<'_, Self::Node>) -> R,
    ) -> Result<R, ModelError>;

    /// Register a change listener. Dropping the returned handle unsubscribes it.
    fn subscribe(&mut self, listener: impl FnMut(&[Self::Node]) + 'static) -> Subscription;
}

type Listener<N> = Box<dyn FnMut(&[N])>;

struct ListenerRegistry<N> {
    next_id: u64,
    entries: Vec<(u64, Listener<N>)>,
    notifying: bool,
    // Ids detached while their listener was taken out for a notification pass
    detached: Vec<u64>,
}

impl<N> ListenerRegistry<N> {
    fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
            notifying: false,
            detached: Vec::new(),
        }
    }
}

trait Detach {
    fn detach(&self, id: u64);
}

impl<N> Detach for RefCell<ListenerRegistry<N>> {
    fn detach(&self, id: u64) {
        let mut registry = self.borrow_mut();
        if let Some(pos) = registry.entries.iter().position(|(entry, _)| *entry == id) {
            registry.entries.remove(pos);
        } else if registry.notifying {
            registry.detached.push(id);
        }
    }
}

/// Listener list shared between a model and its [`Subscription`] handles
pub struct Listeners<N> {
    registry: Rc<RefCell<ListenerRegistry<N>>>,
}

impl<N: 'static> Listeners<N> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(ListenerRegistry::new())),
        }
    }

    pub fn subscribe(&self, listener: impl FnMut(&[N]) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Box::new(listener)));

        let weak: Weak<RefCell<ListenerRegistry<N>>> = Rc::downgrade(&self.registry);
        Subscription {
            id,
            registry: weak,
        }
    }

    /// Call every listener in subscription order.
    ///
    /// Listeners may drop their own or other subscriptions while being notified.
    pub fn notify(&self, children: &[N]) {
        let mut taken = {
            let mut registry = self.registry.borrow_mut();
            registry.notifying = true;
            std::mem::take(&mut registry.entries)
        };

        for (_, listener) in taken.iter_mut() {
            listener(children);
        }

        let mut registry = self.registry.borrow_mut();
        let detached = std::mem::take(&mut registry.detached);
        taken.retain(|(id, _)| !detached.contains(id));
        // Listeners added during the pass land after the existing ones
        taken.append(&mut registry.entries);
        registry.entries = taken;
        registry.notifying = false;
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<N: 'static> Default for Listeners<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Unsubscribe handle returned by [`DocumentModel::subscribe`]
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    /// Stop receiving change notifications
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &(self.registry.strong_count() > 0))
            .finish()
    }
}

/// In-memory document holding a flat list of [`Block`]s
pub struct EditorDocument {
    root: Option<Vec<Block>>,
    rev: u64,
    listeners: Listeners<Block>,
}

impl EditorDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::from_blocks(Vec::new())
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            root: Some(blocks),
            rev: 0,
            listeners: Listeners::new(),
        }
    }

    /// Number of committed updates
    pub fn rev(&self) -> u64 {
        self.rev
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Take the root away, leaving the document without one.
    ///
    /// Every later access fails with [`ModelError::RootUnavailable`] until
    /// [`EditorDocument::restore_root`] is called.
    pub fn detach_root(&mut self) -> Option<Vec<Block>> {
        self.root.take()
    }

    pub fn restore_root(&mut self, blocks: Vec<Block>) {
        self.root = Some(blocks);
    }
}

impl Default for EditorDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentModel for EditorDocument {
    type Node = Block;

    fn children(&self) -> Result<&[Block], ModelError> {
        self.root.as_deref().ok_or(ModelError::RootUnavailable)
    }

    fn create_heading(&self, level: HeadingLevel, text: &str) -> Block {
        Block::heading(level, text)
    }

    fn create_paragraph(&self, spans: Vec<Span>) -> Block {
        Block::paragraph(spans)
    }

    fn update<R>(&mut self, mutate: impl FnOnce(&mut RootMut<'_, Block>) -> R) -> Result<R, ModelError> {
        let children = self.root.as_mut().ok_or(ModelError::RootUnavailable)?;
        let result = mutate(&mut RootMut::new(children));
        self.rev += 1;

        log::trace!("committed document revision {}", self.rev);
        self.listeners.notify(children);

        Ok(result)
    }

    fn subscribe(&mut self, listener: impl FnMut(&[Block]) + 'static) -> Subscription {
        self.listeners.subscribe(listener)
    }
}
