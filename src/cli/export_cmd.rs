//! Flatten a previously captured JSON file to CSV.

use anyhow::Result;
use std::path::Path;
use unspool::export;

pub fn run(captures_path: &Path, out: &Path) -> Result<()> {
    let captures = export::load_captures(captures_path)?;
    export::export_csv(&captures, out)?;
    let rows: usize = captures.iter().map(|c| c.comments.len()).sum();
    println!(
        "Exported {rows} comment rows from {} captures to {}",
        captures.len(),
        out.display()
    );
    Ok(())
}
