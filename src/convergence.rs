//! Convergence monitor — decide when enough content has been revealed.
//!
//! There is no reliable "end of list" signal across markup variants, so the
//! loop watches the visible-item count instead: several independent counting
//! selectors are probed each round and the maximum is kept (different markup
//! variants populate different selectors, so a lower bound is never
//! preferred). When the best count stops growing for a fixed number of
//! rounds, or the round budget runs out, the loop stops.

use crate::session::{DocumentSession, SessionError};
use tracing::debug;

/// Termination knobs for the reveal loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergencePolicy {
    /// Consecutive rounds without a new high count before stopping.
    pub stagnation_threshold: u32,
    /// Hard cap on reveal rounds, bounding runtime on endless feeds.
    pub max_rounds: u32,
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            stagnation_threshold: 5,
            max_rounds: 500,
        }
    }
}

/// Why the reveal loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The count stopped growing for `stagnation_threshold` rounds.
    Stagnated,
    /// `max_rounds` was reached while the count was still moving.
    BudgetExhausted,
}

/// Outcome of one `advance` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Stop(StopReason),
}

/// Running state of the convergence loop.
///
/// `high_count` is a high-water mark: an oscillating count can never reset
/// stagnation, so termination is guaranteed by threshold or budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvergenceState {
    pub high_count: usize,
    pub stagnant_rounds: u32,
    pub round: u32,
}

impl ConvergenceState {
    /// Fold one fresh count into the state and decide whether to keep going.
    pub fn advance(&mut self, observed: usize, policy: &ConvergencePolicy) -> Verdict {
        self.round += 1;
        if observed > self.high_count {
            self.high_count = observed;
            self.stagnant_rounds = 0;
        } else {
            self.stagnant_rounds += 1;
        }
        debug!(
            "round {}: {} visible (peak {}, stagnant {}/{})",
            self.round, observed, self.high_count, self.stagnant_rounds, policy.stagnation_threshold
        );

        if self.stagnant_rounds >= policy.stagnation_threshold {
            Verdict::Stop(StopReason::Stagnated)
        } else if self.round >= policy.max_rounds {
            Verdict::Stop(StopReason::BudgetExhausted)
        } else {
            Verdict::Continue
        }
    }
}

/// Count currently-visible content items: probe every counting selector and
/// take the maximum. A selector whose query fails contributes 0, so one
/// broken selector never stalls a run.
pub async fn visible_count(
    session: &mut dyn DocumentSession,
    selectors: &[String],
) -> Result<usize, SessionError> {
    let mut best = 0usize;
    for selector in selectors {
        match session.count(selector).await {
            Ok(n) => {
                if n > 0 {
                    debug!("selector '{selector}' counted {n}");
                }
                best = best.max(n);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!("count failed for '{selector}': {e}"),
        }
    }
    Ok(best)
}
