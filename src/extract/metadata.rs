//! Post metadata prober.
//!
//! Runs once after navigation settle, before the reveal loop. Per field an
//! ordered selector list is tried; the first element with non-empty trimmed
//! text wins. All probe failures are swallowed (the field stays absent).

use crate::extract::book::SelectorBook;
use crate::records::PostMetadata;
use crate::session::{DocumentSession, SessionError};
use tracing::debug;

pub async fn probe_post(
    session: &mut dyn DocumentSession,
    book: &SelectorBook,
) -> Result<PostMetadata, SessionError> {
    Ok(PostMetadata {
        title: probe_field(session, &book.post.title, "title").await?,
        author: probe_field(session, &book.post.author, "author").await?,
        like_count: probe_field(session, &book.post.like_count, "like_count").await?,
    })
}

/// First selector yielding non-empty trimmed text wins.
pub(crate) async fn probe_field(
    session: &mut dyn DocumentSession,
    selectors: &[String],
    field: &str,
) -> Result<Option<String>, SessionError> {
    for selector in selectors {
        let elements = match session.query(selector).await {
            Ok(els) => els,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!("{field} probe '{selector}' failed: {e}");
                continue;
            }
        };
        let Some(&first) = elements.first() else {
            continue;
        };
        match session.read_text(first).await {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    debug!("{field} resolved via '{selector}'");
                    return Ok(Some(text.to_string()));
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!("{field} read via '{selector}' failed: {e}"),
        }
    }
    Ok(None)
}
