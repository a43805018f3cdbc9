//! Run the extraction pipeline over a saved HTML snapshot (no browser).

use anyhow::Result;
use std::path::Path;
use unspool::harvest::{HarvestOptions, Harvester};
use unspool::session::SnapshotSession;

pub async fn run(file: &Path) -> Result<()> {
    let mut session = SnapshotSession::from_file(file)?;
    let harvester = Harvester::new(HarvestOptions::immediate());
    let capture = harvester
        .run(&mut session, &file.display().to_string())
        .await
        .map_err(anyhow::Error::new)?;
    println!("{}", serde_json::to_string_pretty(&capture)?);
    Ok(())
}
