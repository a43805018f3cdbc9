// Copyright 2026 Unspool Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end harvest flow against a scripted in-memory session.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use unspool::extract::{ExtractionPipeline, ExtractionStrategy, SelectorBook};
use unspool::harvest::{HarvestOptions, Harvester};
use unspool::records::CommentRecord;
use unspool::session::{DocumentSession, ElementId, SessionError, SnapshotSession};

const PRECISE_ITEM: &str = "[data-e2e^='comment-level-']";
const PRIMARY_COUNTER: &str = "[data-e2e='comment-item']";
const EXPANDER_CANDIDATES: &str = "span, div, button";

enum NavBehavior {
    Ok,
    Fatal,
    Flaky,
}

/// Scripted page: the visible count follows a fixed per-round schedule,
/// three expander controls are always on screen (two matching the grammar,
/// one decoy), and two comment items are extractable.
struct ScriptedSession {
    counts: Vec<usize>,
    round: usize,
    clicks: Vec<ElementId>,
    nav: NavBehavior,
}

impl ScriptedSession {
    fn new(counts: Vec<usize>) -> Self {
        Self {
            counts,
            round: 0,
            clicks: Vec::new(),
            nav: NavBehavior::Ok,
        }
    }
}

#[async_trait]
impl DocumentSession for ScriptedSession {
    async fn navigate(&mut self, _url: &str) -> Result<(), SessionError> {
        match self.nav {
            NavBehavior::Ok => Ok(()),
            NavBehavior::Fatal => Err(SessionError::Lost("browser exited".into())),
            NavBehavior::Flaky => Err(SessionError::Command("net::ERR_TIMED_OUT".into())),
        }
    }

    async fn query(&mut self, selector: &str) -> Result<Vec<ElementId>, SessionError> {
        if selector == PRECISE_ITEM {
            Ok(vec![ElementId(1), ElementId(2)])
        } else {
            Ok(Vec::new())
        }
    }

    async fn query_texts(
        &mut self,
        selector: &str,
    ) -> Result<Vec<(ElementId, String)>, SessionError> {
        if selector == EXPANDER_CANDIDATES {
            Ok(vec![
                (ElementId(100), "View 2 replies".into()),
                (ElementId(101), "View more comments".into()),
                (ElementId(102), "View 1 reply".into()),
            ])
        } else {
            Ok(Vec::new())
        }
    }

    async fn query_within(
        &mut self,
        _root: ElementId,
        _selector: &str,
    ) -> Result<Vec<ElementId>, SessionError> {
        Ok(Vec::new())
    }

    async fn count(&mut self, selector: &str) -> Result<usize, SessionError> {
        if selector != PRIMARY_COUNTER {
            return Ok(0);
        }
        let index = self.round.saturating_sub(1).min(self.counts.len() - 1);
        Ok(self.counts[index])
    }

    async fn read_text(&mut self, id: ElementId) -> Result<String, SessionError> {
        match id.0 {
            1 => Ok("alice\nthis is so good\n2d\nReply\n5".into()),
            2 => Ok("bob\nI love it\n1d\nReply\n3".into()),
            _ => Err(SessionError::Command(format!("no text for handle {}", id.0))),
        }
    }

    async fn attribute(
        &mut self,
        id: ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        if name == "data-e2e" && (id.0 == 1 || id.0 == 2) {
            Ok(Some("comment-level-1".into()))
        } else {
            Ok(None)
        }
    }

    async fn click(&mut self, id: ElementId) -> Result<(), SessionError> {
        self.clicks.push(id);
        Ok(())
    }

    async fn parent(&mut self, _id: ElementId) -> Result<Option<ElementId>, SessionError> {
        Ok(None)
    }

    async fn closest(
        &mut self,
        _id: ElementId,
        _selector: &str,
    ) -> Result<Option<ElementId>, SessionError> {
        Ok(None)
    }

    async fn is_visible(&mut self, _id: ElementId) -> Result<bool, SessionError> {
        Ok(true)
    }

    async fn is_enabled(&mut self, _id: ElementId) -> Result<bool, SessionError> {
        Ok(true)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.round += 1;
        Ok(())
    }

    async fn run_script(&mut self, _js: &str) -> Result<serde_json::Value, SessionError> {
        Ok(serde_json::Value::Null)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_harvest_converges_on_plateau_and_extracts() {
    // Count grows for three rounds, then plateaus; default stagnation
    // threshold of 5 means the loop runs exactly 8 rounds.
    let mut session = ScriptedSession::new(vec![5, 10, 15]);
    let harvester = Harvester::new(HarvestOptions::immediate());

    let capture = harvester
        .run(&mut session, "https://example.com/video/1")
        .await
        .unwrap();

    assert!(capture.error.is_none());
    assert_eq!(capture.stats.rounds, 8);
    assert_eq!(capture.stats.peak_count, 15);
    // Two grammar-matching expanders clicked per round; the decoy
    // "View more comments" never is.
    assert_eq!(capture.stats.expanders_clicked, 16);
    assert_eq!(session.clicks.len(), 16);
    assert!(session.clicks.iter().all(|id| id.0 == 100 || id.0 == 102));

    assert_eq!(capture.strategy.as_deref(), Some("precise-attribute"));
    assert_eq!(capture.comments.len(), 2);
    assert_eq!(capture.stats.extracted, 2);

    let first = &capture.comments[0];
    assert_eq!(first.author.as_deref(), Some("alice"));
    assert_eq!(first.content.as_deref(), Some("this is so good"));
    assert_eq!(first.timestamp.as_deref(), Some("2d"));
    assert_eq!(first.like_count.as_deref(), Some("5"));
    assert_eq!(first.depth, 0);
    assert!(first.parent_id.is_none());

    // Ids are stable content hashes, distinct per comment.
    assert_eq!(first.id.len(), 32);
    assert_ne!(first.id, capture.comments[1].id);
}

#[tokio::test]
async fn test_fatal_session_loss_propagates() {
    let mut session = ScriptedSession::new(vec![5]);
    session.nav = NavBehavior::Fatal;
    let harvester = Harvester::new(HarvestOptions::immediate());

    let err = harvester
        .run(&mut session, "https://example.com/video/2")
        .await
        .unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_recoverable_navigation_failure_yields_errored_capture() {
    let mut session = ScriptedSession::new(vec![5]);
    session.nav = NavBehavior::Flaky;
    let harvester = Harvester::new(HarvestOptions::immediate());

    let capture = harvester
        .run(&mut session, "https://example.com/video/3")
        .await
        .unwrap();
    assert!(capture.error.is_some());
    assert!(capture.comments.is_empty());
    // No reveal loop ran.
    assert_eq!(capture.stats.rounds, 0);
}

// ── Strategy-chain ordering ──────────────────────────────────────────────────

struct FixedStrategy {
    name: &'static str,
    records: usize,
    calls: Arc<AtomicUsize>,
}

fn dummy_record(id: &str) -> CommentRecord {
    CommentRecord {
        id: id.into(),
        depth: 0,
        author: None,
        content: Some("placeholder".into()),
        timestamp: None,
        like_count: None,
        parent_id: None,
    }
}

#[async_trait]
impl ExtractionStrategy for FixedStrategy {
    fn name(&self) -> &str {
        self.name
    }

    async fn attempt(
        &self,
        _session: &mut dyn DocumentSession,
        _book: &SelectorBook,
    ) -> Result<Vec<CommentRecord>, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..self.records)
            .map(|i| dummy_record(&format!("{}-{i}", self.name)))
            .collect())
    }
}

struct FailingStrategy;

#[async_trait]
impl ExtractionStrategy for FailingStrategy {
    fn name(&self) -> &str {
        "failing"
    }

    async fn attempt(
        &self,
        _session: &mut dyn DocumentSession,
        _book: &SelectorBook,
    ) -> Result<Vec<CommentRecord>, SessionError> {
        Err(SessionError::Command("script threw".into()))
    }
}

#[tokio::test]
async fn test_first_nonempty_strategy_short_circuits() {
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));
    let pipeline = ExtractionPipeline::new(vec![
        Box::new(FixedStrategy {
            name: "first",
            records: 2,
            calls: Arc::clone(&first_calls),
        }),
        Box::new(FixedStrategy {
            name: "second",
            records: 10,
            calls: Arc::clone(&second_calls),
        }),
    ]);

    let mut session = SnapshotSession::from_html("<html><body></body></html>");
    let book = SelectorBook::builtin();
    let (strategy, records) = pipeline.extract_all(&mut session, &book).await.unwrap();

    assert_eq!(strategy.as_deref(), Some("first"));
    assert_eq!(records.len(), 2);
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_and_erroring_strategies_fall_through() {
    let fallback_calls = Arc::new(AtomicUsize::new(0));
    let pipeline = ExtractionPipeline::new(vec![
        Box::new(FixedStrategy {
            name: "empty",
            records: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        }),
        Box::new(FailingStrategy),
        Box::new(FixedStrategy {
            name: "fallback",
            records: 3,
            calls: Arc::clone(&fallback_calls),
        }),
    ]);

    let mut session = SnapshotSession::from_html("<html><body></body></html>");
    let book = SelectorBook::builtin();
    let (strategy, records) = pipeline.extract_all(&mut session, &book).await.unwrap();

    assert_eq!(strategy.as_deref(), Some("fallback"));
    assert_eq!(records.len(), 3);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_all_strategies_empty_yields_no_strategy() {
    let pipeline = ExtractionPipeline::new(vec![Box::new(FixedStrategy {
        name: "empty",
        records: 0,
        calls: Arc::new(AtomicUsize::new(0)),
    })]);

    let mut session = SnapshotSession::from_html("<html><body></body></html>");
    let book = SelectorBook::builtin();
    let (strategy, records) = pipeline.extract_all(&mut session, &book).await.unwrap();

    assert!(strategy.is_none());
    assert!(records.is_empty());
}
