//! Document session abstraction.
//!
//! Defines the `DocumentSession` trait the reveal, convergence and
//! extraction layers are written against. Two implementations: a live
//! Chromium page driven over CDP, and a static saved-HTML snapshot.

pub mod chromium;
pub mod snapshot;
pub mod stealth;

pub use chromium::{find_chromium, ChromiumSession};
pub use snapshot::SnapshotSession;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque handle to an element inside a session. Handles stay valid for the
/// lifetime of the current document; after navigation they are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// Session failures, split by recoverability.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser process or CDP connection is gone. Unrecoverable; the
    /// only error that propagates past its enclosing unit.
    #[error("browser session lost: {0}")]
    Lost(String),
    /// One operation failed (stale handle, bad selector, script error).
    /// Callers log and continue.
    #[error("session command failed: {0}")]
    Command(String),
}

impl SessionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Lost(_))
    }
}

/// One rendered document, exclusively owned by its driver.
///
/// All mutation goes through this trait in strict turn order; there is no
/// concurrent access to a session.
#[async_trait]
pub trait DocumentSession: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// All elements matching a CSS selector, in document order.
    async fn query(&mut self, selector: &str) -> Result<Vec<ElementId>, SessionError>;

    /// Bulk variant of `query` that also returns each element's trimmed
    /// rendered text, saving one round trip per candidate.
    async fn query_texts(
        &mut self,
        selector: &str,
    ) -> Result<Vec<(ElementId, String)>, SessionError>;

    /// Matching descendants of `root`.
    async fn query_within(
        &mut self,
        root: ElementId,
        selector: &str,
    ) -> Result<Vec<ElementId>, SessionError>;

    /// Number of elements matching a selector.
    async fn count(&mut self, selector: &str) -> Result<usize, SessionError>;

    /// Rendered text of an element, block boundaries as newlines.
    async fn read_text(&mut self, id: ElementId) -> Result<String, SessionError>;

    async fn attribute(
        &mut self,
        id: ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    async fn click(&mut self, id: ElementId) -> Result<(), SessionError>;

    /// Parent element, `None` at the document root.
    async fn parent(&mut self, id: ElementId) -> Result<Option<ElementId>, SessionError>;

    /// Nearest ancestor (including the element itself) matching a selector.
    async fn closest(
        &mut self,
        id: ElementId,
        selector: &str,
    ) -> Result<Option<ElementId>, SessionError>;

    async fn is_visible(&mut self, id: ElementId) -> Result<bool, SessionError>;

    async fn is_enabled(&mut self, id: ElementId) -> Result<bool, SessionError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError>;

    async fn run_script(&mut self, js: &str) -> Result<serde_json::Value, SessionError>;

    async fn close(&mut self) -> Result<(), SessionError>;

    /// Whether reveal actions (scroll, click) can change this document.
    /// `false` for static snapshots; the harvester then skips the reveal
    /// loop entirely.
    fn supports_reveal(&self) -> bool {
        true
    }
}
