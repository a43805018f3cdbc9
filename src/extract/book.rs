//! Typed view of the embedded selector configuration.
//!
//! Every CSS selector the system probes lives in `selectors.json`, embedded
//! at compile time. Centralizing them keeps markup drift a data edit, not a
//! code edit.

use serde::Deserialize;

const SELECTORS_JSON: &str = include_str!("selectors.json");

/// Ordered per-field selector probes for one comment.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldProbes {
    pub author: Vec<String>,
    pub content: Vec<String>,
    pub timestamp: Vec<String>,
    pub like_count: Vec<String>,
}

/// Ordered selector probes for page-level post metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct PostProbes {
    pub title: Vec<String>,
    pub author: Vec<String>,
    pub like_count: Vec<String>,
}

/// The complete selector set: counting selectors, item strategies,
/// per-field probes, post probes, thread-container and expander candidates.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorBook {
    /// Independent counting selectors; the monitor takes the maximum.
    pub counting: Vec<String>,
    /// Bulk candidate selector for expand controls.
    pub expander_candidates: String,
    /// Precise structural-attribute item selector.
    pub item_precise: String,
    /// Level-1 (root comment) marker.
    pub item_root: String,
    /// Looser class-substring item selectors, in priority order.
    pub item_class_hints: Vec<String>,
    /// Candidate pool for the heuristic text scan.
    pub item_text_scan: String,
    /// Interactive/landmark role scan, the final fallback.
    pub item_role_scan: String,
    /// Ancestor enclosing one root comment and all of its replies.
    pub thread_container: String,
    /// Attribute carrying the `comment-level-<N>` marker.
    pub level_marker_attr: String,
    pub fields: FieldProbes,
    pub post: PostProbes,
}

impl SelectorBook {
    /// The compiled-in selector set.
    pub fn builtin() -> Self {
        serde_json::from_str(SELECTORS_JSON).expect("embedded selector book is valid JSON")
    }
}
