//! Capture every URL in a list file.

use super::CaptureFlags;
use anyhow::Result;
use std::path::PathBuf;
use unspool::batch::{self, BatchOptions};
use unspool::export;
use unspool::pacing::DelayRange;
use unspool::session::{ChromiumSession, DocumentSession};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    file: PathBuf,
    out: PathBuf,
    csv: Option<PathBuf>,
    flags: &CaptureFlags,
    snapshot_every: usize,
    pause_min: f64,
    pause_max: f64,
) -> Result<()> {
    let urls = batch::load_url_list(&file)?;

    let mut options = BatchOptions::new(out.clone());
    options.harvest = flags.harvest_options();
    options.snapshot_every = snapshot_every;
    options.pause = DelayRange::from_secs_f64(pause_min, pause_max);

    let mut session = ChromiumSession::launch(!flags.headed).await?;
    let result = batch::run_batch(&mut session, &urls, &options).await;
    let _ = session.close().await;
    let captures = result?;

    if let Some(csv_path) = &csv {
        export::export_csv(&captures, csv_path)?;
    }

    let failed = captures.iter().filter(|c| c.error.is_some()).count();
    let comments: usize = captures.iter().map(|c| c.comments.len()).sum();
    println!(
        "Processed {} URLs: {comments} comments, {failed} failed",
        captures.len()
    );
    println!("  saved to {}", out.display());
    Ok(())
}
