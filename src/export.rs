//! Persistence: pretty JSON capture files and row-per-comment CSV.

use crate::records::ThreadCapture;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::info;

/// CSV header for the flattened export. Capture-level fields repeat on
/// every comment row.
const CSV_HEADER: [&str; 13] = [
    "url",
    "post_author",
    "post_title",
    "post_like_count",
    "scraped_at",
    "author",
    "content",
    "like_count",
    "timestamp",
    "depth",
    "comment_id",
    "parent_id",
    "strategy",
];

/// Write captures as pretty-printed JSON.
pub fn save_captures(captures: &[ThreadCapture], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(captures).context("failed to serialize captures")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("saved {} captures to {}", captures.len(), path.display());
    Ok(())
}

pub fn load_captures(path: &Path) -> Result<Vec<ThreadCapture>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid capture file {}", path.display()))
}

/// Flatten captures into one CSV row per comment.
pub fn export_csv(captures: &[ThreadCapture], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(CSV_HEADER)?;

    let mut rows = 0usize;
    for capture in captures {
        for comment in &capture.comments {
            writer.write_record([
                capture.url.as_str(),
                capture.post.author.as_deref().unwrap_or(""),
                capture.post.title.as_deref().unwrap_or(""),
                capture.post.like_count.as_deref().unwrap_or(""),
                &capture.scraped_at.to_rfc3339(),
                comment.author.as_deref().unwrap_or(""),
                comment.content.as_deref().unwrap_or(""),
                comment.like_count.as_deref().unwrap_or(""),
                comment.timestamp.as_deref().unwrap_or(""),
                &comment.depth.to_string(),
                comment.id.as_str(),
                comment.parent_id.as_deref().unwrap_or(""),
                capture.strategy.as_deref().unwrap_or(""),
            ])?;
            rows += 1;
        }
    }
    writer.flush()?;
    info!("exported {rows} comment rows to {}", path.display());
    Ok(())
}

/// Default JSON output name: `unspool-<host>-<timestamp>.json`.
pub fn default_output_name(url: &str) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "capture".to_string());
    format!("unspool-{host}-{}.json", Utc::now().format("%Y%m%d-%H%M%S"))
}
