//! Record linker — stable identifiers and reply-parent resolution.
//!
//! Identifiers are content hashes of the enclosing container's normalized
//! text, not random or sequential ids: re-running extraction over an
//! unchanged comment yields the same id, which enables de-duplication
//! across runs, and MD5 collisions are a non-issue at thread sizes.

use crate::extract::book::SelectorBook;
use crate::session::{DocumentSession, ElementId, SessionError};
use md5::{Digest, Md5};
use regex::Regex;
use tracing::debug;

/// Collapse raw element text to trimmed, non-empty lines.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hex-encoded MD5 digest of the normalized text.
pub fn content_fingerprint(text: &str) -> String {
    let digest = Md5::digest(normalize_text(text).as_bytes());
    hex::encode(digest)
}

/// Nesting depth from a `comment-level-<N>` marker: depth = N - 1.
/// Absent or unparseable markers default to 0 (root).
pub fn depth_from_marker(marker: Option<&str>) -> u32 {
    let Some(marker) = marker else { return 0 };
    let pattern = Regex::new(r"^comment-level-(\d+)$").expect("level pattern is valid");
    pattern
        .captures(marker)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|level| level.saturating_sub(1))
        .unwrap_or(0)
}

/// Resolve the parent comment's id for a nested item: walk up to the
/// nearest thread container, find the root (level-1) comment inside it,
/// and fingerprint that comment's enclosing container text.
///
/// Every miss along the walk yields `None`; the caller still emits the
/// record. Only fatal session loss propagates.
pub async fn resolve_parent_id(
    session: &mut dyn DocumentSession,
    element: ElementId,
    book: &SelectorBook,
) -> Result<Option<String>, SessionError> {
    match try_resolve(session, element, book).await {
        Ok(parent_id) => Ok(parent_id),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("parent linkage failed: {e}");
            Ok(None)
        }
    }
}

async fn try_resolve(
    session: &mut dyn DocumentSession,
    element: ElementId,
    book: &SelectorBook,
) -> Result<Option<String>, SessionError> {
    let Some(container) = session.closest(element, &book.thread_container).await? else {
        debug!("nested comment has no enclosing thread container");
        return Ok(None);
    };
    let roots = session.query_within(container, &book.item_root).await?;
    let Some(&root) = roots.first() else {
        debug!("thread container has no root comment");
        return Ok(None);
    };
    // The id hashes the root's enclosing container, same as extraction does.
    let root_container = session.parent(root).await?.unwrap_or(root);
    let text = session.read_text(root_container).await?;
    Ok(Some(content_fingerprint(&text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_idempotent() {
        let text = "alice\nso good\n2d\n5";
        assert_eq!(content_fingerprint(text), content_fingerprint(text));
        assert_eq!(content_fingerprint(text).len(), 32);
    }

    #[test]
    fn test_fingerprint_normalizes_whitespace() {
        assert_eq!(
            content_fingerprint("  alice  \n\n so good \n"),
            content_fingerprint("alice\nso good")
        );
        assert_ne!(content_fingerprint("alice"), content_fingerprint("bob"));
    }

    #[test]
    fn test_depth_from_marker() {
        assert_eq!(depth_from_marker(Some("comment-level-1")), 0);
        assert_eq!(depth_from_marker(Some("comment-level-2")), 1);
        assert_eq!(depth_from_marker(Some("comment-level-13")), 12);
        assert_eq!(depth_from_marker(Some("comment-item")), 0);
        assert_eq!(depth_from_marker(Some("comment-level-x")), 0);
        assert_eq!(depth_from_marker(None), 0);
    }
}
