//! Outline panel state
//!
//! Holds the outline a navigation list renders and resolves clicks on it to
//! scroll targets. The panel is refreshed wholesale on every committed
//! document change; a failed refresh keeps the previous outline.

use log::{debug, warn};
use std::cell::RefCell;
use std::rc::Rc;

use crate::model::{BlockView, DocumentModel, Subscription};
use crate::outline::{extract_outline_with, MalformedTagPolicy, OutlineEntry, OutlineError};

/// Where the view should scroll for a clicked outline entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollTarget {
    /// Index of the heading among the root's children
    pub position: usize,
    /// Index of the heading among all rendered headings (the Nth `h1`..`h6`)
    pub heading_ordinal: usize,
}

#[derive(Debug, Clone, Default)]
pub struct OutlinePanel {
    entries: Vec<OutlineEntry>,
    policy: MalformedTagPolicy,
    generation: u64,
}

impl OutlinePanel {
    pub fn new(policy: MalformedTagPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
            generation: 0,
        }
    }

    /// Subscribe a new panel to `model` and fill it from the current content.
    ///
    /// The panel lives as long as the returned [`Subscription`] is kept.
    pub fn attach<M: DocumentModel>(
        model: &mut M,
        policy: MalformedTagPolicy,
    ) -> (Rc<RefCell<Self>>, Subscription) {
        let panel = Rc::new(RefCell::new(Self::new(policy)));

        if let Err(err) = panel.borrow_mut().refresh_from(model) {
            debug!("initial outline refresh skipped: {err}");
        }

        let listener_panel = Rc::clone(&panel);
        let subscription = model.subscribe(move |children| {
            // refresh() already logs the failure and keeps the old outline
            let _ = listener_panel.borrow_mut().refresh(children);
        });

        (panel, subscription)
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    /// True when the navigation list should show its "no headings" placeholder
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn policy(&self) -> MalformedTagPolicy {
        self.policy
    }

    /// Number of successful refreshes so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Recompute the outline from `children`, replacing the current one.
    ///
    /// On error the previous outline is kept and the error is returned.
    pub fn refresh<N: BlockView>(&mut self, children: &[N]) -> Result<&[OutlineEntry], OutlineError> {
        match extract_outline_with(children, self.policy) {
            Ok(entries) => {
                self.entries = entries;
                self.generation += 1;
                debug!(
                    "outline refreshed: {} headings (generation {})",
                    self.entries.len(),
                    self.generation
                );
                Ok(&self.entries)
            }
            Err(err) => {
                warn!("keeping previous outline: {err}");
                Err(err)
            }
        }
    }

    pub fn refresh_from<M: DocumentModel>(&mut self, model: &M) -> Result<&[OutlineEntry], OutlineError> {
        match model.children() {
            Ok(children) => self.refresh(children),
            Err(err) => {
                warn!("keeping previous outline: {err}");
                Err(err.into())
            }
        }
    }

    /// Resolve a clicked entry's `position` against the live children.
    ///
    /// Returns `None` when no listed entry has that position or the child
    /// there is no longer a heading.
    pub fn scroll_target<N: BlockView>(&self, children: &[N], position: usize) -> Option<ScrollTarget> {
        self.entries.iter().find(|entry| entry.position == position)?;
        children.get(position)?.heading_tag()?;

        // Blank headings are still rendered, so they count toward the ordinal
        let heading_ordinal = children[..position]
            .iter()
            .filter(|node| node.heading_tag().is_some())
            .count();

        Some(ScrollTarget {
            position,
            heading_ordinal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, EditorDocument, HeadingNode, Span};
    use crate::outline::HeadingLevel;

    fn doc() -> EditorDocument {
        EditorDocument::from_blocks(vec![
            Block::heading(HeadingLevel::H1, "Title"),
            Block::paragraph(vec![Span::plain("intro")]),
            Block::heading(HeadingLevel::H2, " "),
            Block::heading(HeadingLevel::H2, "Section"),
        ])
    }

    #[test]
    fn test_new_panel_is_empty() {
        let panel = OutlinePanel::default();
        assert!(panel.is_empty());
        assert_eq!(panel.generation(), 0);
        assert_eq!(panel.policy(), MalformedTagPolicy::Fail);
    }

    #[test]
    fn test_refresh_replaces_entries() {
        let mut panel = OutlinePanel::new(MalformedTagPolicy::Fail);
        let mut document = doc();

        panel.refresh_from(&document).unwrap();
        assert_eq!(panel.entries().len(), 2);

        document.update(|root| root.clear()).unwrap();
        panel.refresh_from(&document).unwrap();
        assert!(panel.is_empty());
        assert_eq!(panel.generation(), 2);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_outline() {
        let mut panel = OutlinePanel::new(MalformedTagPolicy::Fail);
        let mut document = doc();
        panel.refresh_from(&document).unwrap();

        let broken = vec![Block::Heading(HeadingNode::with_tag("hh", "Broken"))];
        assert!(panel.refresh(&broken).is_err());
        assert_eq!(panel.entries().len(), 2);

        document.detach_root();
        assert!(matches!(
            panel.refresh_from(&document),
            Err(OutlineError::Model(_))
        ));
        assert_eq!(panel.entries().len(), 2);
        assert_eq!(panel.generation(), 1);
    }

    #[test]
    fn test_scroll_target_counts_rendered_headings() {
        let document = doc();
        let mut panel = OutlinePanel::default();
        panel.refresh_from(&document).unwrap();
        let children = document.children().unwrap();

        assert_eq!(
            panel.scroll_target(children, 0),
            Some(ScrollTarget {
                position: 0,
                heading_ordinal: 0
            })
        );
        assert_eq!(
            panel.scroll_target(children, 3),
            Some(ScrollTarget {
                position: 3,
                heading_ordinal: 2
            })
        );
    }

    #[test]
    fn test_scroll_target_unknown_position() {
        let document = doc();
        let mut panel = OutlinePanel::default();
        panel.refresh_from(&document).unwrap();
        let children = document.children().unwrap();

        // paragraph, blank heading, out of range
        assert_eq!(panel.scroll_target(children, 1), None);
        assert_eq!(panel.scroll_target(children, 2), None);
        assert_eq!(panel.scroll_target(children, 42), None);
    }

    #[test]
    fn test_attach_tracks_updates() {
        let mut document = doc();
        let (panel, subscription) = OutlinePanel::attach(&mut document, MalformedTagPolicy::Fail);
        assert_eq!(panel.borrow().entries().len(), 2);

        document
            .update(|root| root.append(Block::heading(HeadingLevel::H3, "More")))
            .unwrap();
        assert_eq!(panel.borrow().entries().len(), 3);
        assert_eq!(panel.borrow().entries()[2].id, "heading-4");

        drop(subscription);
        document.update(|root| root.clear()).unwrap();
        assert_eq!(panel.borrow().entries().len(), 3);
    }
}
