//! Capture data model: comments, post metadata, per-run stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extracted comment. Created once from a snapshot of the rendered
/// structure and never updated in place; re-extraction of changed text
/// produces a new record with a different id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Content hash of the enclosing container's normalized text.
    pub id: String,
    /// 0 = top-level comment, >0 = nested reply.
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Kept as the page renders it ("1.2K"), not parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<String>,
    /// Id of the root comment in the same thread container, when resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Page-level metadata probed before the reveal loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<String>,
}

/// Counters from the reveal/convergence loop.
///
/// `extracted < peak_count` is expected: reveal counting and extraction use
/// independent selector sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealStats {
    pub rounds: u32,
    pub expanders_clicked: u32,
    /// Best visible-item count the convergence monitor ever observed.
    pub peak_count: usize,
    pub extracted: usize,
}

/// Everything captured from one URL. Owned by the caller once returned;
/// the harvester keeps no state across captures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadCapture {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub post: PostMetadata,
    pub comments: Vec<CommentRecord>,
    /// Name of the extraction strategy that produced the comments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub stats: RevealStats,
    /// Populated (with empty comments) when the whole URL failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ThreadCapture {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            scraped_at: Utc::now(),
            post: PostMetadata::default(),
            comments: Vec::new(),
            strategy: None,
            stats: RevealStats::default(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_omitted() {
        let record = CommentRecord {
            id: "abc".into(),
            depth: 0,
            author: Some("alice".into()),
            content: Some("so good".into()),
            timestamp: None,
            like_count: None,
            parent_id: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"author\""));
        assert!(!json.contains("timestamp"));
        assert!(!json.contains("parent_id"));
    }

    #[test]
    fn test_capture_round_trip() {
        let mut capture = ThreadCapture::new("https://example.com/video/1");
        capture.comments.push(CommentRecord {
            id: "d41d8cd9".into(),
            depth: 1,
            author: Some("bob".into()),
            content: Some("a, \"quoted\" reply".into()),
            timestamp: Some("2d".into()),
            like_count: Some("1.2K".into()),
            parent_id: Some("abc".into()),
        });
        capture.strategy = Some("precise-attribute".into());

        let json = serde_json::to_string_pretty(&capture).unwrap();
        let back: ThreadCapture = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url, capture.url);
        assert_eq!(back.comments, capture.comments);
        assert_eq!(back.strategy.as_deref(), Some("precise-attribute"));
        assert!(back.error.is_none());
    }
}
