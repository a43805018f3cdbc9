//! Saved-HTML session for browserless extraction and tests.
//!
//! `scraper`'s parsed documents are `!Send`, so the document is re-parsed
//! per operation inside `spawn_blocking` and handles are document-order
//! element indices, which are deterministic across re-parses. Reveal is
//! meaningless against a static document: `supports_reveal()` is `false`
//! and mutating operations answer `Command` errors.

use super::{DocumentSession, ElementId, SessionError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// A static document implementing `DocumentSession`.
pub struct SnapshotSession {
    html: Arc<String>,
}

impl SnapshotSession {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: Arc::new(html.into()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        Ok(Self::from_html(html))
    }

    /// Re-parse the document on a blocking thread and run `f` over it.
    async fn with_document<T, F>(&self, f: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&Html) -> Result<T, SessionError> + Send + 'static,
    {
        let html = Arc::clone(&self.html);
        tokio::task::spawn_blocking(move || {
            let document = Html::parse_document(&html);
            f(&document)
        })
        .await
        .map_err(|e| SessionError::Command(format!("snapshot task panicked: {e}")))?
    }
}

fn parse_selector(selector: &str) -> Result<Selector, SessionError> {
    Selector::parse(selector)
        .map_err(|e| SessionError::Command(format!("bad selector '{selector}': {e}")))
}

/// Every element in document order. Index in this sequence is the handle.
fn elements_in_order(document: &Html) -> Vec<ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn element_at<'a>(ordered: &[ElementRef<'a>], id: ElementId) -> Result<ElementRef<'a>, SessionError> {
    ordered
        .get(id.0 as usize)
        .copied()
        .ok_or_else(|| SessionError::Command(format!("stale element handle {}", id.0)))
}

fn handle_of(ordered: &[ElementRef<'_>], target: ElementRef<'_>) -> Option<ElementId> {
    ordered
        .iter()
        .position(|el| el.id() == target.id())
        .map(|i| ElementId(i as u64))
}

/// Rendered-text approximation: one line per text fragment, trimmed, empty
/// fragments dropped. Matches how a browser renders block-per-field markup.
fn rendered_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl DocumentSession for SnapshotSession {
    async fn navigate(&mut self, _url: &str) -> Result<(), SessionError> {
        // The document is already loaded; nothing to do.
        Ok(())
    }

    async fn query(&mut self, selector: &str) -> Result<Vec<ElementId>, SessionError> {
        let selector = selector.to_string();
        self.with_document(move |doc| {
            let sel = parse_selector(&selector)?;
            let ordered = elements_in_order(doc);
            Ok(doc
                .select(&sel)
                .filter_map(|el| handle_of(&ordered, el))
                .collect())
        })
        .await
    }

    async fn query_texts(
        &mut self,
        selector: &str,
    ) -> Result<Vec<(ElementId, String)>, SessionError> {
        let selector = selector.to_string();
        self.with_document(move |doc| {
            let sel = parse_selector(&selector)?;
            let ordered = elements_in_order(doc);
            Ok(doc
                .select(&sel)
                .filter_map(|el| handle_of(&ordered, el).map(|id| (id, rendered_text(el))))
                .collect())
        })
        .await
    }

    async fn query_within(
        &mut self,
        root: ElementId,
        selector: &str,
    ) -> Result<Vec<ElementId>, SessionError> {
        let selector = selector.to_string();
        self.with_document(move |doc| {
            let sel = parse_selector(&selector)?;
            let ordered = elements_in_order(doc);
            let root = element_at(&ordered, root)?;
            Ok(root
                .select(&sel)
                .filter_map(|el| handle_of(&ordered, el))
                .collect())
        })
        .await
    }

    async fn count(&mut self, selector: &str) -> Result<usize, SessionError> {
        let selector = selector.to_string();
        self.with_document(move |doc| {
            let sel = parse_selector(&selector)?;
            Ok(doc.select(&sel).count())
        })
        .await
    }

    async fn read_text(&mut self, id: ElementId) -> Result<String, SessionError> {
        self.with_document(move |doc| {
            let ordered = elements_in_order(doc);
            Ok(rendered_text(element_at(&ordered, id)?))
        })
        .await
    }

    async fn attribute(
        &mut self,
        id: ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let name = name.to_string();
        self.with_document(move |doc| {
            let ordered = elements_in_order(doc);
            let el = element_at(&ordered, id)?;
            Ok(el.value().attr(&name).map(str::to_string))
        })
        .await
    }

    async fn click(&mut self, _id: ElementId) -> Result<(), SessionError> {
        Err(SessionError::Command("snapshot session is static".into()))
    }

    async fn parent(&mut self, id: ElementId) -> Result<Option<ElementId>, SessionError> {
        self.with_document(move |doc| {
            let ordered = elements_in_order(doc);
            let el = element_at(&ordered, id)?;
            Ok(el
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|p| handle_of(&ordered, p)))
        })
        .await
    }

    async fn closest(
        &mut self,
        id: ElementId,
        selector: &str,
    ) -> Result<Option<ElementId>, SessionError> {
        let selector = selector.to_string();
        self.with_document(move |doc| {
            let sel = parse_selector(&selector)?;
            let ordered = elements_in_order(doc);
            let el = element_at(&ordered, id)?;
            let matching: HashSet<_> = doc.select(&sel).map(|m| m.id()).collect();

            // CSS closest() starts at the element itself.
            let mut current = Some(el);
            while let Some(candidate) = current {
                if matching.contains(&candidate.id()) {
                    return Ok(handle_of(&ordered, candidate));
                }
                current = candidate.parent().and_then(ElementRef::wrap);
            }
            Ok(None)
        })
        .await
    }

    async fn is_visible(&mut self, id: ElementId) -> Result<bool, SessionError> {
        // No layout engine; an element that exists counts as visible.
        self.with_document(move |doc| {
            let ordered = elements_in_order(doc);
            element_at(&ordered, id).map(|_| true)
        })
        .await
    }

    async fn is_enabled(&mut self, id: ElementId) -> Result<bool, SessionError> {
        self.with_document(move |doc| {
            let ordered = elements_in_order(doc);
            let el = element_at(&ordered, id)?;
            Ok(el.value().attr("disabled").is_none())
        })
        .await
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        Err(SessionError::Command("snapshot session is static".into()))
    }

    async fn run_script(&mut self, _js: &str) -> Result<serde_json::Value, SessionError> {
        Err(SessionError::Command("snapshot session is static".into()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    fn supports_reveal(&self) -> bool {
        false
    }
}
