//! Extraction pipeline — a prioritized chain of strategies over the
//! revealed page.
//!
//! Strategies are tried in a fixed order, each progressively looser, and
//! the first one producing at least one record wins (first-success, not
//! best-of). Per-element failures skip that element; a strategy that errors
//! wholesale is treated as empty and the chain falls through.

pub mod book;
pub mod linker;
pub mod metadata;

pub use book::SelectorBook;

use crate::records::CommentRecord;
use crate::session::{DocumentSession, ElementId, SessionError};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Primary-content fallback threshold: shorter texts are noise.
const MIN_CONTENT_LEN: usize = 3;
/// Heuristic text-scan bounds.
const TEXT_SCAN_MIN: usize = 3;
const TEXT_SCAN_MAX: usize = 500;
/// Positional-line fallback length guard for the author line.
const MAX_AUTHOR_LINE: usize = 80;

/// One extraction heuristic. `attempt` maps the current document state to
/// records; an empty result is not an error.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn attempt(
        &self,
        session: &mut dyn DocumentSession,
        book: &SelectorBook,
    ) -> Result<Vec<CommentRecord>, SessionError>;
}

/// Ordered strategy chain, short-circuiting on first non-empty result.
pub struct ExtractionPipeline {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractionPipeline {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// The built-in chain: precise attribute, class hints, text heuristic,
    /// role scan.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(PreciseAttributeStrategy),
            Box::new(ClassHintStrategy),
            Box::new(TextHeuristicStrategy),
            Box::new(RoleScanStrategy),
        ])
    }

    /// Run the chain. Returns the adopted strategy's name alongside its
    /// records; `(None, [])` when every strategy came back empty.
    pub async fn extract_all(
        &self,
        session: &mut dyn DocumentSession,
        book: &SelectorBook,
    ) -> Result<(Option<String>, Vec<CommentRecord>), SessionError> {
        for strategy in &self.strategies {
            match strategy.attempt(session, book).await {
                Ok(records) if !records.is_empty() => {
                    info!(
                        "strategy '{}' extracted {} comments",
                        strategy.name(),
                        records.len()
                    );
                    return Ok((Some(strategy.name().to_string()), records));
                }
                Ok(_) => debug!("strategy '{}' found nothing, falling through", strategy.name()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("strategy '{}' failed: {e}, falling through", strategy.name()),
            }
        }
        warn!("every extraction strategy came back empty");
        Ok((None, Vec::new()))
    }
}

// ── Built-in strategies ──────────────────────────────────────────────────────

/// Strategy 1: exact structural-attribute selector. Low false-positive,
/// used whenever the attribute markup is present.
struct PreciseAttributeStrategy;

#[async_trait]
impl ExtractionStrategy for PreciseAttributeStrategy {
    fn name(&self) -> &str {
        "precise-attribute"
    }

    async fn attempt(
        &self,
        session: &mut dyn DocumentSession,
        book: &SelectorBook,
    ) -> Result<Vec<CommentRecord>, SessionError> {
        let elements = session.query(&book.item_precise).await?;
        extract_elements(session, book, &elements).await
    }
}

/// Strategy 2: class-name-substring selectors. The first selector matching
/// at least one element supplies the whole candidate set.
struct ClassHintStrategy;

#[async_trait]
impl ExtractionStrategy for ClassHintStrategy {
    fn name(&self) -> &str {
        "class-hint"
    }

    async fn attempt(
        &self,
        session: &mut dyn DocumentSession,
        book: &SelectorBook,
    ) -> Result<Vec<CommentRecord>, SessionError> {
        for selector in &book.item_class_hints {
            let elements = match session.query(selector).await {
                Ok(els) => els,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("class hint '{selector}' failed: {e}");
                    continue;
                }
            };
            if !elements.is_empty() {
                debug!("class hint '{selector}' matched {} elements", elements.len());
                return extract_elements(session, book, &elements).await;
            }
        }
        Ok(Vec::new())
    }
}

/// Strategy 3: heuristic text scan. Classifies arbitrary text-bearing
/// elements as probable comments by length bounds and common-word tokens.
/// High false-positive risk, so it sits late in the chain.
struct TextHeuristicStrategy;

const COMMON_WORDS: &[&str] = &[
    "the", "this", "that", "is", "so", "you", "i", "love", "good", "not", "and", "it",
];

fn looks_like_comment(text: &str) -> bool {
    let text = text.trim();
    if text.len() < TEXT_SCAN_MIN || text.len() > TEXT_SCAN_MAX {
        return false;
    }
    text.split_whitespace()
        .any(|word| COMMON_WORDS.contains(&word.to_lowercase().trim_matches(|c: char| !c.is_alphanumeric())))
}

#[async_trait]
impl ExtractionStrategy for TextHeuristicStrategy {
    fn name(&self) -> &str {
        "text-heuristic"
    }

    async fn attempt(
        &self,
        session: &mut dyn DocumentSession,
        book: &SelectorBook,
    ) -> Result<Vec<CommentRecord>, SessionError> {
        let candidates = session.query_texts(&book.item_text_scan).await?;
        let elements: Vec<ElementId> = candidates
            .into_iter()
            .filter(|(_, text)| looks_like_comment(text))
            .map(|(id, _)| id)
            .collect();
        extract_elements(session, book, &elements).await
    }
}

/// Strategy 4: generic structural-role scan, the final fallback.
struct RoleScanStrategy;

#[async_trait]
impl ExtractionStrategy for RoleScanStrategy {
    fn name(&self) -> &str {
        "role-scan"
    }

    async fn attempt(
        &self,
        session: &mut dyn DocumentSession,
        book: &SelectorBook,
    ) -> Result<Vec<CommentRecord>, SessionError> {
        let elements = session.query(&book.item_role_scan).await?;
        extract_elements(session, book, &elements).await
    }
}

// ── Per-element extraction ───────────────────────────────────────────────────

/// Extract every element, isolating failures: one bad element never aborts
/// the rest.
pub async fn extract_elements(
    session: &mut dyn DocumentSession,
    book: &SelectorBook,
    elements: &[ElementId],
) -> Result<Vec<CommentRecord>, SessionError> {
    let mut records = Vec::new();
    for &element in elements {
        match extract_single(session, book, element).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!("skipping element: {e}"),
        }
    }
    Ok(records)
}

/// Extract one comment from its marker element.
///
/// Field resolution order: selector probes within the enclosing container,
/// then positional lines of the container text (author, content, timestamp,
/// likes at lines 0/1/2/4), then the element's own text for content. An
/// element with neither author nor content yields no record.
pub async fn extract_single(
    session: &mut dyn DocumentSession,
    book: &SelectorBook,
    element: ElementId,
) -> Result<Option<CommentRecord>, SessionError> {
    let container = match session.parent(element).await {
        Ok(Some(parent)) => parent,
        Ok(None) => element,
        Err(e) if e.is_fatal() => return Err(e),
        Err(_) => element,
    };
    let container_text = session.read_text(container).await?;
    let lines: Vec<&str> = container_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut author = probe_within(session, container, &book.fields.author).await?;
    let mut content = probe_within(session, container, &book.fields.content).await?;
    let mut timestamp = probe_within(session, container, &book.fields.timestamp).await?;
    let mut like_count = probe_within(session, container, &book.fields.like_count).await?;

    // Positional layout of a rendered comment container:
    // username / text / date / reply-control / likes.
    if author.is_none() {
        author = lines
            .first()
            .filter(|line| line.len() <= MAX_AUTHOR_LINE)
            .map(|line| line.to_string());
    }
    if content.is_none() {
        content = lines.get(1).map(|line| line.to_string());
    }
    if timestamp.is_none() {
        timestamp = lines.get(2).map(|line| line.to_string());
    }
    if like_count.is_none() {
        like_count = lines.get(4).map(|line| line.to_string());
    }

    if content.is_none() {
        let own_text = session.read_text(element).await.unwrap_or_default();
        let own_text = own_text.trim();
        if own_text.len() >= MIN_CONTENT_LEN {
            content = Some(own_text.to_string());
        }
    }

    // Identity or content, or it is not a comment.
    if author.is_none() && content.is_none() {
        return Ok(None);
    }

    let marker = match session.attribute(element, &book.level_marker_attr).await {
        Ok(value) => value,
        Err(e) if e.is_fatal() => return Err(e),
        Err(_) => None,
    };
    let depth = linker::depth_from_marker(marker.as_deref());

    let parent_id = if depth > 0 {
        linker::resolve_parent_id(session, element, book).await?
    } else {
        None
    };

    Ok(Some(CommentRecord {
        id: linker::content_fingerprint(&container_text),
        depth,
        author,
        content,
        timestamp,
        like_count,
        parent_id,
    }))
}

/// First field probe yielding non-empty text within the container wins.
async fn probe_within(
    session: &mut dyn DocumentSession,
    container: ElementId,
    selectors: &[String],
) -> Result<Option<String>, SessionError> {
    for selector in selectors {
        let matches = match session.query_within(container, selector).await {
            Ok(els) => els,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => continue,
        };
        let Some(&first) = matches.first() else {
            continue;
        };
        match session.read_text(first).await {
            Ok(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    return Ok(Some(text.to_string()));
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => {}
        }
    }
    Ok(None)
}
