//! Batch runner — a serial loop over a URL list with politeness pauses and
//! crash-resilient snapshot persistence.

use crate::export;
use crate::harvest::{HarvestOptions, Harvester};
use crate::pacing::DelayRange;
use crate::records::ThreadCapture;
use crate::session::DocumentSession;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub harvest: HarvestOptions,
    /// Randomized pause between URLs.
    pub pause: DelayRange,
    /// Persist accumulated captures every N URLs.
    pub snapshot_every: usize,
    pub out_path: PathBuf,
}

impl BatchOptions {
    pub fn new(out_path: PathBuf) -> Self {
        Self {
            harvest: HarvestOptions::default(),
            pause: DelayRange::pause_default(),
            snapshot_every: 5,
            out_path,
        }
    }
}

/// Load a URL list: plain text (one URL per line, `#` comments and blank
/// lines ignored) or CSV with a `url` column. Invalid entries are logged
/// and skipped.
pub fn load_url_list(path: &Path) -> Result<Vec<String>> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let raw: Vec<String> = if is_csv {
        read_csv_urls(path)?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()
    };

    let mut urls = Vec::with_capacity(raw.len());
    for entry in raw {
        match url::Url::parse(&entry) {
            Ok(_) => urls.push(entry),
            Err(e) => warn!("skipping invalid URL '{entry}': {e}"),
        }
    }
    if urls.is_empty() {
        anyhow::bail!("no valid URLs in {}", path.display());
    }
    info!("loaded {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

fn read_csv_urls(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let url_column = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("url"))
        .context("CSV file has no 'url' column")?;

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(url_column) {
            let value = value.trim();
            if !value.is_empty() {
                urls.push(value.to_string());
            }
        }
    }
    Ok(urls)
}

/// Capture every URL in order over one shared session.
///
/// Per-URL failures are recorded in that URL's capture and the loop moves
/// on; a fatal session loss persists what has been collected and aborts.
pub async fn run_batch(
    session: &mut dyn DocumentSession,
    urls: &[String],
    options: &BatchOptions,
) -> Result<Vec<ThreadCapture>> {
    let harvester = Harvester::new(options.harvest.clone());
    let mut captures = Vec::with_capacity(urls.len());

    for (i, url) in urls.iter().enumerate() {
        info!("URL {}/{}: {url}", i + 1, urls.len());
        match harvester.run(session, url).await {
            Ok(capture) => captures.push(capture),
            Err(e) => {
                error!("session lost on {url}: {e}");
                export::save_captures(&captures, &options.out_path)?;
                return Err(anyhow::Error::new(e)
                    .context("browser session lost; partial results saved"));
            }
        }

        if (i + 1) % options.snapshot_every.max(1) == 0 {
            export::save_captures(&captures, &options.out_path)?;
            info!("progress saved: {}/{} URLs", i + 1, urls.len());
        }
        if i + 1 < urls.len() {
            options.pause.settle().await;
        }
    }

    export::save_captures(&captures, &options.out_path)?;
    Ok(captures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_text_list_skips_comments_and_junk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# seed list").unwrap();
        writeln!(file, "https://example.com/video/1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not-a-url").unwrap();
        writeln!(file, "https://example.com/video/2").unwrap();

        let urls = load_url_list(&path).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://example.com/video/1".to_string(),
                "https://example.com/video/2".to_string(),
            ]
        );
    }

    #[test]
    fn test_load_csv_list_uses_url_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "label,url").unwrap();
        writeln!(file, "first,https://example.com/video/1").unwrap();
        writeln!(file, "second,https://example.com/video/2").unwrap();

        let urls = load_url_list(&path).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[1].ends_with("/video/2"));
    }

    #[test]
    fn test_load_csv_without_url_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "link\nhttps://example.com\n").unwrap();
        assert!(load_url_list(&path).is_err());
    }

    #[test]
    fn test_empty_list_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(load_url_list(&path).is_err());
    }
}
