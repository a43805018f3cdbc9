//! Live Chromium session driven over CDP via chromiumoxide.
//!
//! Elements are held in a page-side registry (`window.__unspoolReg`)
//! populated by injected JavaScript; every trait operation is one
//! `Runtime.evaluate` round trip. Handles are small integers stamped onto
//! the DOM nodes themselves, so repeated queries return stable ids for the
//! same element within one document.

use super::{stealth, DocumentSession, ElementId, SessionError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Find the Chromium executable: env override, then PATH, then common
/// install locations.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("UNSPOOL_CHROMIUM") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let local = home.join(".unspool/chromium/chrome");
        if local.exists() {
            return Some(local);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A live browser page implementing `DocumentSession`.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    /// Set by the handler task when the CDP connection dies.
    closed: Arc<AtomicBool>,
}

impl ChromiumSession {
    /// Launch Chromium with fingerprint masking and open one blank page.
    pub async fn launch(headless: bool) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Install Chrome/Chromium or set UNSPOOL_CHROMIUM")?;
        debug!("launching {} (headless={headless})", chrome_path.display());

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        for arg in stealth::launch_args(headless) {
            builder = builder.arg(arg);
        }
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let closed = Arc::new(AtomicBool::new(false));
        let closed_flag = Arc::clone(&closed);
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            closed_flag.store(true, Ordering::SeqCst);
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        Ok(Self {
            browser,
            page,
            closed,
        })
    }

    fn classify(&self, context: &str, message: String) -> SessionError {
        if self.closed.load(Ordering::SeqCst) {
            SessionError::Lost(format!("{context}: {message}"))
        } else {
            SessionError::Command(format!("{context}: {message}"))
        }
    }

    /// Evaluate a script and deserialize its return value.
    async fn eval(&self, js: &str) -> Result<serde_json::Value, SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Lost("browser handler exited".into()));
        }
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| self.classify("evaluate", e.to_string()))?;
        result
            .into_value()
            .map_err(|e| SessionError::Command(format!("script result: {e}")))
    }

    /// Evaluate an op snippet returning `{ ok, value }` / `{ ok, error }`.
    async fn eval_op(&self, js: &str) -> Result<serde_json::Value, SessionError> {
        let value = self.eval(js).await?;
        let obj = value
            .as_object()
            .ok_or_else(|| SessionError::Command("unexpected script result shape".into()))?;
        if obj.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            Ok(obj.get("value").cloned().unwrap_or(serde_json::Value::Null))
        } else {
            let message = obj
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("element operation failed");
            Err(SessionError::Command(message.to_string()))
        }
    }

    fn ids_from(value: serde_json::Value) -> Result<Vec<ElementId>, SessionError> {
        value
            .as_array()
            .ok_or_else(|| SessionError::Command("expected id array".into()))?
            .iter()
            .map(|v| {
                v.as_u64()
                    .map(ElementId)
                    .ok_or_else(|| SessionError::Command("non-numeric element id".into()))
            })
            .collect()
    }

    fn opt_id_from(value: serde_json::Value) -> Result<Option<ElementId>, SessionError> {
        match value {
            serde_json::Value::Null => Ok(None),
            other => other
                .as_u64()
                .map(|id| Some(ElementId(id)))
                .ok_or_else(|| SessionError::Command("non-numeric element id".into())),
        }
    }
}

// ── JS snippet builders ──────────────────────────────────────────────────────

/// Boot the page-side element registry.
const REG_BOOT: &str =
    "const reg = window.__unspoolReg = window.__unspoolReg || { next: 1, els: new Map() };";

/// Register an element and return its id.
const REGISTER: &str = "const track = (n) => { if (!n.__unspoolId) { n.__unspoolId = reg.next++; \
     reg.els.set(n.__unspoolId, n); } return n.__unspoolId; };";

fn query_js(selector: &str) -> String {
    format!(
        "(() => {{ {REG_BOOT} {REGISTER} \
         try {{ \
           const ids = []; \
           for (const el of document.querySelectorAll('{sel}')) ids.push(track(el)); \
           return {{ ok: true, value: ids }}; \
         }} catch (e) {{ return {{ ok: false, error: String(e) }}; }} }})()",
        sel = sanitize_js_string(selector)
    )
}

fn query_texts_js(selector: &str) -> String {
    format!(
        "(() => {{ {REG_BOOT} {REGISTER} \
         try {{ \
           const out = []; \
           for (const el of document.querySelectorAll('{sel}')) \
             out.push([track(el), ((el.innerText !== undefined ? el.innerText : el.textContent) || '').trim()]); \
           return {{ ok: true, value: out }}; \
         }} catch (e) {{ return {{ ok: false, error: String(e) }}; }} }})()",
        sel = sanitize_js_string(selector)
    )
}

fn count_js(selector: &str) -> String {
    format!(
        "(() => {{ try {{ \
           return {{ ok: true, value: document.querySelectorAll('{sel}').length }}; \
         }} catch (e) {{ return {{ ok: false, error: String(e) }}; }} }})()",
        sel = sanitize_js_string(selector)
    )
}

/// Wrap a body that expects `el` to be the resolved, connected element.
fn element_js(id: ElementId, body: &str) -> String {
    format!(
        "(() => {{ {REG_BOOT} {REGISTER} \
         const el = reg.els.get({id}) || null; \
         if (!el || !el.isConnected) return {{ ok: false, error: 'stale element' }}; \
         try {{ {body} }} catch (e) {{ return {{ ok: false, error: String(e) }}; }} }})()",
        id = id.0
    )
}

/// Escape a value for safe injection into a JS single-quoted string literal.
fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}

#[async_trait]
impl DocumentSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Lost("browser handler exited".into()));
        }
        self.page
            .goto(url)
            .await
            .map_err(|e| self.classify("navigate", e.to_string()))?;
        let _ = self.page.wait_for_navigation().await;

        // Mask failures are non-fatal; the page may still be usable.
        if let Err(e) = self.eval(stealth::MASK_WEBDRIVER_JS).await {
            if e.is_fatal() {
                return Err(e);
            }
            debug!("webdriver mask failed: {e}");
        }
        Ok(())
    }

    async fn query(&mut self, selector: &str) -> Result<Vec<ElementId>, SessionError> {
        let value = self.eval_op(&query_js(selector)).await?;
        Self::ids_from(value)
    }

    async fn query_texts(
        &mut self,
        selector: &str,
    ) -> Result<Vec<(ElementId, String)>, SessionError> {
        let value = self.eval_op(&query_texts_js(selector)).await?;
        let pairs = value
            .as_array()
            .ok_or_else(|| SessionError::Command("expected id/text array".into()))?;
        let mut out = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let id = pair
                .get(0)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| SessionError::Command("non-numeric element id".into()))?;
            let text = pair.get(1).and_then(|v| v.as_str()).unwrap_or_default();
            out.push((ElementId(id), text.to_string()));
        }
        Ok(out)
    }

    async fn query_within(
        &mut self,
        root: ElementId,
        selector: &str,
    ) -> Result<Vec<ElementId>, SessionError> {
        let body = format!(
            "const ids = []; \
             for (const child of el.querySelectorAll('{sel}')) ids.push(track(child)); \
             return {{ ok: true, value: ids }};",
            sel = sanitize_js_string(selector)
        );
        let value = self.eval_op(&element_js(root, &body)).await?;
        Self::ids_from(value)
    }

    async fn count(&mut self, selector: &str) -> Result<usize, SessionError> {
        let value = self.eval_op(&count_js(selector)).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| SessionError::Command("non-numeric count".into()))
    }

    async fn read_text(&mut self, id: ElementId) -> Result<String, SessionError> {
        let body = "return { ok: true, value: \
             ((el.innerText !== undefined ? el.innerText : el.textContent) || '') };";
        let value = self.eval_op(&element_js(id, body)).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(
        &mut self,
        id: ElementId,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let body = format!(
            "return {{ ok: true, value: el.getAttribute('{name}') }};",
            name = sanitize_js_string(name)
        );
        let value = self.eval_op(&element_js(id, &body)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&mut self, id: ElementId) -> Result<(), SessionError> {
        let body = "el.scrollIntoView({ block: 'center' }); el.click(); \
             return { ok: true, value: true };";
        self.eval_op(&element_js(id, body)).await?;
        Ok(())
    }

    async fn parent(&mut self, id: ElementId) -> Result<Option<ElementId>, SessionError> {
        let body = "const p = el.parentElement; \
             return { ok: true, value: p ? track(p) : null };";
        let value = self.eval_op(&element_js(id, body)).await?;
        Self::opt_id_from(value)
    }

    async fn closest(
        &mut self,
        id: ElementId,
        selector: &str,
    ) -> Result<Option<ElementId>, SessionError> {
        let body = format!(
            "const hit = el.closest('{sel}'); \
             return {{ ok: true, value: hit ? track(hit) : null }};",
            sel = sanitize_js_string(selector)
        );
        let value = self.eval_op(&element_js(id, &body)).await?;
        Self::opt_id_from(value)
    }

    async fn is_visible(&mut self, id: ElementId) -> Result<bool, SessionError> {
        let body = "const r = el.getBoundingClientRect(); \
             const st = getComputedStyle(el); \
             return { ok: true, value: r.width > 0 && r.height > 0 \
               && st.visibility !== 'hidden' && st.display !== 'none' };";
        let value = self.eval_op(&element_js(id, body)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&mut self, id: ElementId) -> Result<bool, SessionError> {
        let body = "return { ok: true, value: !el.disabled \
             && el.getAttribute('aria-disabled') !== 'true' };";
        let value = self.eval_op(&element_js(id, body)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.eval_op(
            "(() => { window.scrollTo(0, document.body.scrollHeight); \
             return { ok: true, value: true }; })()",
        )
        .await?;
        Ok(())
    }

    async fn run_script(&mut self, js: &str) -> Result<serde_json::Value, SessionError> {
        self.eval(js).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.browser.close().await {
            warn!("browser close failed: {e}");
        }
        let _ = self.browser.wait().await;
        Ok(())
    }
}
