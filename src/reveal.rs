//! Reveal driver — scroll and expand to surface hidden comments.
//!
//! Expand controls are matched against a strict text grammar rather than a
//! substring check: loose matching has been observed clicking unrelated
//! "View more comments" style controls and derailing the page state.

use crate::pacing::DelayRange;
use crate::session::{DocumentSession, SessionError};
use regex::Regex;
use tracing::{debug, warn};

/// Exact-grammar matcher for reply-expansion controls.
///
/// Accepts `View 1 reply`, `View <N> replies` for N > 1, and
/// `View <N> more` for N >= 1. Case-sensitive, full-text only.
#[derive(Debug, Clone)]
pub struct ExpanderGrammar {
    replies: Regex,
    more: Regex,
}

impl Default for ExpanderGrammar {
    fn default() -> Self {
        Self {
            replies: Regex::new(r"^View (\d+) replies$").expect("replies pattern is valid"),
            more: Regex::new(r"^View (\d+) more$").expect("more pattern is valid"),
        }
    }
}

impl ExpanderGrammar {
    pub fn matches(&self, text: &str) -> bool {
        let text = text.trim();
        if text == "View 1 reply" {
            return true;
        }
        if let Some(caps) = self.replies.captures(text) {
            return caps[1].parse::<u64>().map(|n| n > 1).unwrap_or(false);
        }
        if let Some(caps) = self.more.captures(text) {
            return caps[1].parse::<u64>().map(|n| n >= 1).unwrap_or(false);
        }
        false
    }
}

/// Issues one reveal cycle at a time against a live session.
pub struct RevealDriver {
    grammar: ExpanderGrammar,
    /// Bulk selector for candidate controls; grammar filtering happens here.
    candidates: String,
    settle: DelayRange,
}

impl RevealDriver {
    pub fn new(candidates: impl Into<String>, settle: DelayRange) -> Self {
        Self {
            grammar: ExpanderGrammar::default(),
            candidates: candidates.into(),
            settle,
        }
    }

    /// Scroll to the current bottom extent, then activate every visible,
    /// enabled expand control whose text matches the grammar. Returns how
    /// many controls were activated. Per-control failures are logged and
    /// swallowed; only fatal session loss propagates.
    pub async fn reveal_once(
        &self,
        session: &mut dyn DocumentSession,
    ) -> Result<u32, SessionError> {
        if let Err(e) = session.scroll_to_bottom().await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("scroll failed: {e}");
        }

        let candidates = match session.query_texts(&self.candidates).await {
            Ok(c) => c,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("expander query failed: {e}");
                return Ok(0);
            }
        };

        let mut clicked = 0u32;
        for (id, text) in candidates {
            if !self.grammar.matches(&text) {
                continue;
            }
            match self.activate(session, id).await {
                Ok(true) => {
                    debug!("expanded '{}'", text.trim());
                    clicked += 1;
                    // Let the inserted replies attach before the next probe.
                    self.settle.settle().await;
                }
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("skipping expander '{}': {e}", text.trim()),
            }
        }
        Ok(clicked)
    }

    async fn activate(
        &self,
        session: &mut dyn DocumentSession,
        id: crate::session::ElementId,
    ) -> Result<bool, SessionError> {
        if !session.is_visible(id).await? || !session.is_enabled(id).await? {
            return Ok(false);
        }
        session.click(id).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_accepts_reply_forms() {
        let grammar = ExpanderGrammar::default();
        assert!(grammar.matches("View 1 reply"));
        assert!(grammar.matches("View 2 replies"));
        assert!(grammar.matches("View 47 replies"));
        assert!(grammar.matches("View 1 more"));
        assert!(grammar.matches("View 12 more"));
        assert!(grammar.matches("  View 1 reply  ")); // trimmed first
    }

    #[test]
    fn test_grammar_rejects_loose_matches() {
        let grammar = ExpanderGrammar::default();
        assert!(!grammar.matches("View more comments"));
        assert!(!grammar.matches("View 1 replies")); // plural form needs N > 1
        assert!(!grammar.matches("View 0 more"));
        assert!(!grammar.matches("view 2 replies")); // case-sensitive
        assert!(!grammar.matches("View 2 replies now")); // no trailing text
        assert!(!grammar.matches("Please View 2 replies")); // no leading text
        assert!(!grammar.matches(""));
    }
}
