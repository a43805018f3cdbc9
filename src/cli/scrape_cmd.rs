//! Capture a single URL with a live browser.

use super::CaptureFlags;
use anyhow::Result;
use std::path::PathBuf;
use unspool::export;
use unspool::harvest::Harvester;
use unspool::session::{ChromiumSession, DocumentSession};

pub async fn run(
    url: &str,
    out: Option<PathBuf>,
    csv: Option<PathBuf>,
    flags: &CaptureFlags,
) -> Result<()> {
    let mut session = ChromiumSession::launch(!flags.headed).await?;
    let harvester = Harvester::new(flags.harvest_options());
    let result = harvester.run(&mut session, url).await;
    let _ = session.close().await;
    let capture = result.map_err(anyhow::Error::new)?;

    let out = out.unwrap_or_else(|| PathBuf::from(export::default_output_name(url)));
    export::save_captures(std::slice::from_ref(&capture), &out)?;
    if let Some(csv_path) = &csv {
        export::export_csv(std::slice::from_ref(&capture), csv_path)?;
    }

    println!("Extracted {} comments from {url}", capture.comments.len());
    if let Some(strategy) = &capture.strategy {
        println!("  strategy: {strategy}");
    }
    if let Some(error) = &capture.error {
        println!("  capture error: {error}");
    }
    println!("  saved to {}", out.display());
    Ok(())
}
