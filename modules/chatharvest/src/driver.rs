// Capability surface of the browser-automation collaborator.
//
// UiDriver is everything the harvester needs from a live page: query, read,
// scroll, click, navigate. Reads return Option so "element not there" is a
// normal value; only navigation-critical operations return Result.
//
// ReplayDriver implements this over an in-memory page model; the tests and
// the binary run against it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use chatharvest_common::{Config, HarvestError, Result};

use crate::settle::poll_pause;

/// Opaque handle to one element of the rendered page at the time it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Root of a selector query: the whole page or the subtree of one element.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Page,
    Within(&'a ElementRef),
}

impl Scope<'_> {
    pub fn key(&self) -> Option<&str> {
        match self {
            Scope::Page => None,
            Scope::Within(el) => Some(el.id()),
        }
    }
}

// ---------------------------------------------------------------------------
// UiDriver
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UiDriver: Send + Sync {
    /// All elements currently rendered under `scope` that match `selector`,
    /// in document order. An empty list is a valid answer.
    async fn discover(&self, scope: Scope<'_>, selector: &str) -> Vec<ElementRef>;

    async fn read_text(&self, item: &ElementRef) -> Option<String>;

    async fn read_attribute(&self, item: &ElementRef, name: &str) -> Option<String>;

    /// Upper-case tag name as the DOM reports it (`IMG`, `VIDEO`, `DIV`).
    async fn tag_name(&self, item: &ElementRef) -> Option<String>;

    /// Fire-and-forget: bring `item` to the centre of its scroll container.
    async fn scroll_into_view(&self, item: &ElementRef);

    /// Fire-and-forget: shift the scroll position of `item` by `dy` pixels (negative is up).
    async fn scroll_by(&self, item: &ElementRef, dy: i64);

    /// Whether a match for `selector` becomes visible within `timeout`.
    async fn wait_visible(&self, scope: Scope<'_>, selector: &str, timeout: Duration) -> bool;

    /// Click the first match of `selector`. Fails with `Navigation` when no
    /// match becomes actionable within `timeout`.
    async fn click(&self, scope: Scope<'_>, selector: &str, timeout: Duration) -> Result<()>;

    async fn click_item(&self, item: &ElementRef) -> Result<()>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn is_authenticated(&self) -> bool;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Query helpers
// ---------------------------------------------------------------------------

/// Fail the workflow before any scraping if the session is not logged in.
pub async fn ensure_authenticated(driver: &dyn UiDriver) -> Result<()> {
    if driver.is_authenticated().await {
        Ok(())
    } else {
        Err(HarvestError::AuthenticationRequired)
    }
}

pub async fn first(driver: &dyn UiDriver, scope: Scope<'_>, selector: &str) -> Option<ElementRef> {
    driver.discover(scope, selector).await.into_iter().next()
}

/// Text of the first match, if any.
pub async fn text_of(driver: &dyn UiDriver, scope: Scope<'_>, selector: &str) -> Option<String> {
    let el = first(driver, scope, selector).await?;
    driver.read_text(&el).await
}

/// Attribute of the first match, if any.
pub async fn attr_of(
    driver: &dyn UiDriver,
    scope: Scope<'_>,
    selector: &str,
    name: &str,
) -> Option<String> {
    let el = first(driver, scope, selector).await?;
    driver.read_attribute(&el, name).await
}

/// Page-level text that may take a moment to render. `None` when it never shows up.
pub async fn wait_text(
    driver: &dyn UiDriver,
    selector: &str,
    timeout: Duration,
) -> Option<String> {
    if !driver.wait_visible(Scope::Page, selector, timeout).await {
        return None;
    }
    text_of(driver, Scope::Page, selector).await
}

/// Poll until at least `min_count` matches are rendered or `timeout` elapses.
/// Returns whatever matched on the last poll, possibly fewer than asked for.
pub async fn wait_elements(
    driver: &dyn UiDriver,
    scope: Scope<'_>,
    selector: &str,
    timeout: Duration,
    min_count: usize,
    config: &Config,
) -> Vec<ElementRef> {
    let started = Instant::now();
    loop {
        let found = driver.discover(scope, selector).await;
        if found.len() >= min_count || started.elapsed() > timeout {
            return found;
        }
        poll_pause(config).await;
    }
}

/// Trimmed, non-empty text or `None`.
pub fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
