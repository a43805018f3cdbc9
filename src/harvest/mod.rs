//! Harvester — orchestrates one capture end to end.
//!
//! navigate → initial settle → post metadata → reveal/convergence loop →
//! extraction → assemble `ThreadCapture`. Every failure short of fatal
//! session loss is folded into the capture's `error` field so a batch can
//! keep moving.

use crate::convergence::{visible_count, ConvergencePolicy, ConvergenceState, Verdict};
use crate::extract::{metadata, ExtractionPipeline, SelectorBook};
use crate::pacing::DelayRange;
use crate::records::ThreadCapture;
use crate::reveal::RevealDriver;
use crate::session::{DocumentSession, SessionError};
use std::time::Instant;
use tracing::{info, warn};

/// Tunables for one capture.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Per-cycle settle after scroll/click.
    pub settle: DelayRange,
    /// Longer post-navigation settle before the first probe.
    pub initial_settle: DelayRange,
    pub policy: ConvergencePolicy,
    pub book: SelectorBook,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            settle: DelayRange::settle_default(),
            initial_settle: DelayRange::initial_default(),
            policy: ConvergencePolicy::default(),
            book: SelectorBook::builtin(),
        }
    }
}

impl HarvestOptions {
    /// Zero delays for snapshot extraction and tests.
    pub fn immediate() -> Self {
        Self {
            settle: DelayRange::zero(),
            initial_settle: DelayRange::zero(),
            ..Self::default()
        }
    }
}

pub struct Harvester {
    options: HarvestOptions,
    pipeline: ExtractionPipeline,
}

impl Harvester {
    pub fn new(options: HarvestOptions) -> Self {
        Self {
            options,
            pipeline: ExtractionPipeline::standard(),
        }
    }

    /// Swap in a custom strategy chain.
    pub fn with_pipeline(options: HarvestOptions, pipeline: ExtractionPipeline) -> Self {
        Self { options, pipeline }
    }

    /// Capture one URL. Only `SessionError::Lost` escapes as `Err`; every
    /// other failure comes back as a capture with a populated `error` field
    /// and empty comments.
    pub async fn run(
        &self,
        session: &mut dyn DocumentSession,
        url: &str,
    ) -> Result<ThreadCapture, SessionError> {
        let started = Instant::now();
        let mut capture = ThreadCapture::new(url);
        info!("capturing {url}");

        if let Err(e) = session.navigate(url).await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("navigation failed for {url}: {e}");
            capture.error = Some(format!("navigation failed: {e}"));
            return Ok(capture);
        }
        self.options.initial_settle.settle().await;

        match self.capture_inner(session, &mut capture).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("capture failed for {url}: {e}");
                capture.error = Some(e.to_string());
                capture.comments.clear();
            }
        }

        info!(
            "captured {url}: {} comments in {:.1}s (peak count {}, {} expanders)",
            capture.comments.len(),
            started.elapsed().as_secs_f64(),
            capture.stats.peak_count,
            capture.stats.expanders_clicked,
        );
        Ok(capture)
    }

    async fn capture_inner(
        &self,
        session: &mut dyn DocumentSession,
        capture: &mut ThreadCapture,
    ) -> Result<(), SessionError> {
        let book = &self.options.book;
        capture.post = metadata::probe_post(session, book).await?;

        if session.supports_reveal() {
            let driver = RevealDriver::new(book.expander_candidates.clone(), self.options.settle);
            let mut state = ConvergenceState::default();
            loop {
                let clicked = driver.reveal_once(session).await?;
                capture.stats.expanders_clicked += clicked;
                self.options.settle.settle().await;

                let observed = visible_count(session, &book.counting).await?;
                match state.advance(observed, &self.options.policy) {
                    Verdict::Continue => {}
                    Verdict::Stop(reason) => {
                        info!(
                            "reveal converged after {} rounds ({reason:?}, peak {})",
                            state.round, state.high_count
                        );
                        break;
                    }
                }
            }
            capture.stats.rounds = state.round;
            capture.stats.peak_count = state.high_count;
        } else {
            info!("session does not support reveal, extracting as-is");
        }

        let (strategy, comments) = self.pipeline.extract_all(session, book).await?;
        capture.stats.extracted = comments.len();
        capture.strategy = strategy;
        capture.comments = comments;
        Ok(())
    }
}
