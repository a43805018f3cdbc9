//! CLI subcommand implementations.

pub mod batch_cmd;
pub mod doctor;
pub mod export_cmd;
pub mod extract_cmd;
pub mod scrape_cmd;

use clap::Args;
use unspool::convergence::ConvergencePolicy;
use unspool::harvest::HarvestOptions;
use unspool::pacing::DelayRange;

/// Flags shared by the browser-driven capture commands.
#[derive(Args, Debug, Clone)]
pub struct CaptureFlags {
    /// Run with a visible browser window (headless is the default)
    #[arg(long)]
    pub headed: bool,

    /// Minimum settle delay after scroll/click, in seconds
    #[arg(long, default_value_t = 2.0)]
    pub settle_min: f64,

    /// Maximum settle delay after scroll/click, in seconds
    #[arg(long, default_value_t = 5.0)]
    pub settle_max: f64,

    /// Hard cap on reveal rounds
    #[arg(long, default_value_t = 500)]
    pub max_rounds: u32,

    /// Stagnant rounds before the reveal loop stops
    #[arg(long, default_value_t = 5)]
    pub stagnation: u32,
}

impl CaptureFlags {
    pub fn harvest_options(&self) -> HarvestOptions {
        HarvestOptions {
            settle: DelayRange::from_secs_f64(self.settle_min, self.settle_max),
            policy: ConvergencePolicy {
                stagnation_threshold: self.stagnation,
                max_rounds: self.max_rounds,
            },
            ..HarvestOptions::default()
        }
    }
}
