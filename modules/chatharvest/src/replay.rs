//! ReplayDriver: an in-memory page model behind the `UiDriver` trait.
//!
//! A `ReplayPage` describes elements, static query results and virtual lists
//! that render a moving window of rows as their edge row is scrolled into
//! view. Pages load from JSON so recorded sessions can be re-run offline, and
//! every side effect is logged as a `ReplayAction` for assertions.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chatharvest_common::{HarvestError, Result};

use crate::driver::{ElementRef, Scope, UiDriver};

fn default_true() -> bool {
    true
}

fn default_step() -> usize {
    1
}

// ---------------------------------------------------------------------------
// Page model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayElement {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub attrs: HashMap<String, String>,
    /// Clicking this element moves the page to this URL.
    #[serde(default)]
    pub navigates_to: Option<String>,
}

impl ReplayElement {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigates_to = Some(url.into());
        self
    }
}

/// Fixed answer to `discover(scope, selector)`. With `url` set it only
/// applies while the page is at that URL, and it wins over a query without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayQuery {
    #[serde(default)]
    pub scope: Option<String>,
    pub selector: String,
    pub results: Vec<ElementRef>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Which edge of a virtual list loads more rows when scrolled into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListAnchor {
    /// Rows load below; the window starts at the head of `items`.
    #[default]
    Last,
    /// Rows load above; the window starts at the tail of `items`.
    First,
}

/// A virtualized list. `initial` rows are rendered after navigation; each
/// time the anchor-edge row is scrolled into view, `step` more are revealed.
/// With `window` set only that many of the revealed rows stay rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualList {
    #[serde(default)]
    pub scope: Option<String>,
    pub selector: String,
    pub items: Vec<ElementRef>,
    pub initial: usize,
    #[serde(default = "default_step")]
    pub step: usize,
    #[serde(default)]
    pub window: Option<usize>,
    #[serde(default)]
    pub anchor: ListAnchor,
    #[serde(default)]
    pub url: Option<String>,
}

impl VirtualList {
    pub fn new(selector: impl Into<String>, items: Vec<ElementRef>, initial: usize) -> Self {
        Self {
            scope: None,
            selector: selector.into(),
            items,
            initial,
            step: 1,
            window: None,
            anchor: ListAnchor::Last,
            url: None,
        }
    }

    pub fn within(mut self, scope: &ElementRef) -> Self {
        self.scope = Some(scope.id().to_string());
        self
    }

    pub fn step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    pub fn anchor(mut self, anchor: ListAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn at_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Rows rendered when `revealed` rows have loaded.
    fn rendered(&self, revealed: usize) -> &[ElementRef] {
        let len = self.items.len();
        let to = revealed.min(len);
        let from = self.window.map(|w| to.saturating_sub(w)).unwrap_or(0);
        match self.anchor {
            ListAnchor::Last => &self.items[from..to],
            ListAnchor::First => &self.items[len - to..len - from],
        }
    }

    fn edge<'a>(&self, rendered: &'a [ElementRef]) -> Option<&'a ElementRef> {
        match self.anchor {
            ListAnchor::Last => rendered.last(),
            ListAnchor::First => rendered.first(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayPage {
    #[serde(default = "default_true")]
    pub authenticated: bool,
    #[serde(default)]
    pub start_url: Option<String>,
    #[serde(default)]
    pub elements: HashMap<String, ReplayElement>,
    #[serde(default)]
    pub queries: Vec<ReplayQuery>,
    #[serde(default)]
    pub lists: Vec<VirtualList>,
    /// URLs whose navigation fails.
    #[serde(default)]
    pub unreachable: HashSet<String>,
}

impl ReplayPage {
    /// Every element a query or list refers to must be declared in `elements`.
    pub fn validate(&self) -> Result<()> {
        let queried = self.queries.iter().flat_map(|q| {
            let results = q.results.iter().map(ElementRef::id);
            q.scope.as_deref().into_iter().chain(results)
        });
        let listed = self.lists.iter().flat_map(|l| {
            let items = l.items.iter().map(ElementRef::id);
            l.scope.as_deref().into_iter().chain(items)
        });

        match queried.chain(listed).find(|id| !self.elements.contains_key(*id)) {
            Some(id) => Err(HarvestError::Driver(format!(
                "replay page refers to undeclared element {id}"
            ))),
            None => Ok(()),
        }
    }
}

/// Side effect observed by the driver, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayAction {
    Navigate(String),
    Click(String),
    ScrollIntoView(String),
    ScrollBy(String, i64),
}

#[derive(Debug, Default)]
struct ReplayState {
    current_url: Option<String>,
    revealed: HashMap<usize, usize>,
    actions: Vec<ReplayAction>,
}

// ---------------------------------------------------------------------------
// ReplayDriver
// ---------------------------------------------------------------------------

pub struct ReplayDriver {
    page: ReplayPage,
    state: Mutex<ReplayState>,
}

impl Default for ReplayDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayDriver {
    /// Empty, authenticated page.
    pub fn new() -> Self {
        Self::from_page(ReplayPage {
            authenticated: true,
            ..Default::default()
        })
    }

    pub fn from_page(page: ReplayPage) -> Self {
        let state = ReplayState {
            current_url: page.start_url.clone(),
            ..Default::default()
        };
        Self {
            page,
            state: Mutex::new(state),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let page: ReplayPage = serde_json::from_str(&json)?;
        page.validate()?;
        debug!(
            path = %path.display(),
            elements = page.elements.len(),
            queries = page.queries.len(),
            lists = page.lists.len(),
            "Loaded replay page"
        );
        Ok(Self::from_page(page))
    }

    pub fn page(&self) -> &ReplayPage {
        &self.page
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.page.authenticated = authenticated;
    }

    pub fn add_element(
        &mut self,
        id: &ElementRef,
        build: impl FnOnce(ReplayElement) -> ReplayElement,
    ) {
        let element = build(self.page.elements.remove(id.id()).unwrap_or_default());
        self.page.elements.insert(id.id().to_string(), element);
    }

    pub fn add_query(
        &mut self,
        scope: Option<&ElementRef>,
        selector: &str,
        results: Vec<ElementRef>,
    ) {
        self.page.queries.push(ReplayQuery {
            scope: scope.map(|s| s.id().to_string()),
            selector: selector.to_string(),
            results,
            url: None,
        });
    }

    /// Like `add_query`, but only while the page is at `url`.
    pub fn add_query_at(
        &mut self,
        url: &str,
        scope: Option<&ElementRef>,
        selector: &str,
        results: Vec<ElementRef>,
    ) {
        self.page.queries.push(ReplayQuery {
            scope: scope.map(|s| s.id().to_string()),
            selector: selector.to_string(),
            results,
            url: Some(url.to_string()),
        });
    }

    pub fn add_list(&mut self, list: VirtualList) {
        self.page.lists.push(list);
    }

    pub fn mark_unreachable(&mut self, url: &str) {
        self.page.unreachable.insert(url.to_string());
    }

    pub fn actions(&self) -> Vec<ReplayAction> {
        self.state().actions.clone()
    }

    pub fn current_url(&self) -> Option<String> {
        self.state().current_url.clone()
    }

    fn state(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn applies(url: &Option<String>, current: &Option<String>) -> bool {
        url.is_none() || url == current
    }

    fn matches(
        scope: &Option<String>,
        selector: &str,
        want_scope: Option<&str>,
        want: &str,
    ) -> bool {
        scope.as_deref() == want_scope && selector == want
    }

    fn resolve(&self, state: &ReplayState, scope: Scope<'_>, selector: &str) -> Vec<ElementRef> {
        let key = scope.key();

        let list = self
            .page
            .lists
            .iter()
            .enumerate()
            .filter(|(_, l)| Self::matches(&l.scope, &l.selector, key, selector))
            .filter(|(_, l)| Self::applies(&l.url, &state.current_url))
            .min_by_key(|(_, l)| l.url.is_none());
        if let Some((index, list)) = list {
            let revealed = state.revealed.get(&index).copied().unwrap_or(list.initial);
            return list.rendered(revealed).to_vec();
        }

        let candidates = self
            .page
            .queries
            .iter()
            .filter(|q| Self::matches(&q.scope, &q.selector, key, selector))
            .filter(|q| Self::applies(&q.url, &state.current_url));
        let mut fallback = None;
        for query in candidates {
            if query.url.is_some() {
                return query.results.clone();
            }
            fallback.get_or_insert(query);
        }
        fallback.map(|q| q.results.clone()).unwrap_or_default()
    }

    fn go_to(state: &mut ReplayState, url: &str) {
        state.current_url = Some(url.to_string());
        state.revealed.clear();
    }
}

#[async_trait]
impl UiDriver for ReplayDriver {
    async fn discover(&self, scope: Scope<'_>, selector: &str) -> Vec<ElementRef> {
        let state = self.state();
        self.resolve(&state, scope, selector)
    }

    async fn read_text(&self, item: &ElementRef) -> Option<String> {
        self.page.elements.get(item.id())?.text.clone()
    }

    async fn read_attribute(&self, item: &ElementRef, name: &str) -> Option<String> {
        self.page.elements.get(item.id())?.attrs.get(name).cloned()
    }

    async fn tag_name(&self, item: &ElementRef) -> Option<String> {
        let tag = self.page.elements.get(item.id())?.tag.as_ref()?;
        Some(tag.to_ascii_uppercase())
    }

    async fn scroll_into_view(&self, item: &ElementRef) {
        let mut state = self.state();
        state.actions.push(ReplayAction::ScrollIntoView(item.id().to_string()));

        for (index, list) in self.page.lists.iter().enumerate() {
            if !Self::applies(&list.url, &state.current_url) {
                continue;
            }
            let revealed = state.revealed.get(&index).copied().unwrap_or(list.initial);
            let at_edge = list.edge(list.rendered(revealed)) == Some(item);
            if at_edge && revealed < list.items.len() {
                state.revealed.insert(index, revealed + list.step);
            }
        }
    }

    async fn scroll_by(&self, item: &ElementRef, dy: i64) {
        self.state()
            .actions
            .push(ReplayAction::ScrollBy(item.id().to_string(), dy));
    }

    async fn wait_visible(&self, scope: Scope<'_>, selector: &str, _timeout: Duration) -> bool {
        // Nothing renders asynchronously here, so one look is as good as a wait.
        let state = self.state();
        !self.resolve(&state, scope, selector).is_empty()
    }

    async fn click(&self, scope: Scope<'_>, selector: &str, _timeout: Duration) -> Result<()> {
        let target = {
            let state = self.state();
            self.resolve(&state, scope, selector).into_iter().next()
        };
        match target {
            Some(item) => self.click_item(&item).await,
            None => Err(HarvestError::Navigation(format!(
                "nothing to click for {selector}"
            ))),
        }
    }

    async fn click_item(&self, item: &ElementRef) -> Result<()> {
        let mut state = self.state();
        state.actions.push(ReplayAction::Click(item.id().to_string()));
        if let Some(url) = self
            .page
            .elements
            .get(item.id())
            .and_then(|el| el.navigates_to.as_deref())
        {
            Self::go_to(&mut state, url);
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.actions.push(ReplayAction::Navigate(url.to_string()));
        if self.page.unreachable.contains(url) {
            return Err(HarvestError::Navigation(format!("{url} is unreachable")));
        }
        Self::go_to(&mut state, url);
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        self.page.authenticated
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(prefix: &str, n: usize) -> Vec<ElementRef> {
        (0..n).map(|i| ElementRef::new(format!("{prefix}{i}"))).collect()
    }

    fn ids(items: &[ElementRef]) -> Vec<&str> {
        items.iter().map(|e| e.id()).collect()
    }

    #[test]
    fn undeclared_element_is_a_driver_error() {
        let mut driver = ReplayDriver::new();
        let row = ElementRef::new("row-1");
        driver.add_element(&row, |el| el.text("hello"));
        driver.add_query(None, "li", vec![row, ElementRef::new("row-2")]);

        let err = driver.page().validate().unwrap_err();
        assert!(matches!(err, HarvestError::Driver(msg) if msg.contains("row-2")));
    }

    #[test]
    fn declared_page_validates() {
        let mut driver = ReplayDriver::new();
        let list = ElementRef::new("list");
        let row = ElementRef::new("row-1");
        driver.add_element(&list, |el| el.tag("ul"));
        driver.add_element(&row, |el| el.text("hello"));
        driver.add_list(VirtualList::new("li", vec![row], 1).within(&list));

        assert!(driver.page().validate().is_ok());
    }

    #[tokio::test]
    async fn scrolling_the_last_row_reveals_more() {
        let mut driver = ReplayDriver::new();
        driver.add_list(VirtualList::new("li", rows("r", 5), 2).step(2));

        let seen = driver.discover(Scope::Page, "li").await;
        assert_eq!(ids(&seen), vec!["r0", "r1"]);

        // Not the edge row: nothing changes.
        driver.scroll_into_view(&seen[0]).await;
        assert_eq!(driver.discover(Scope::Page, "li").await.len(), 2);

        driver.scroll_into_view(&seen[1]).await;
        let seen = driver.discover(Scope::Page, "li").await;
        assert_eq!(ids(&seen), vec!["r0", "r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn windowed_list_slides() {
        let mut driver = ReplayDriver::new();
        driver.add_list(VirtualList::new("li", rows("r", 6), 3).window(3));

        let seen = driver.discover(Scope::Page, "li").await;
        driver.scroll_into_view(seen.last().unwrap()).await;
        let seen = driver.discover(Scope::Page, "li").await;
        assert_eq!(ids(&seen), vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn first_anchor_loads_upwards() {
        let mut driver = ReplayDriver::new();
        driver.add_list(VirtualList::new("li", rows("r", 4), 2).anchor(ListAnchor::First));

        let seen = driver.discover(Scope::Page, "li").await;
        assert_eq!(ids(&seen), vec!["r2", "r3"]);

        driver.scroll_into_view(&seen[0]).await;
        let seen = driver.discover(Scope::Page, "li").await;
        assert_eq!(ids(&seen), vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn navigation_resets_lists_and_selects_url_queries() {
        let mut driver = ReplayDriver::new();
        driver.add_list(VirtualList::new("li", rows("r", 3), 1));
        driver.add_query(None, "h1", vec![ElementRef::new("home")]);
        driver.add_query_at("page-b", None, "h1", vec![ElementRef::new("b")]);

        let first = driver.discover(Scope::Page, "li").await;
        driver.scroll_into_view(&first[0]).await;
        assert_eq!(driver.discover(Scope::Page, "li").await.len(), 2);
        assert_eq!(ids(&driver.discover(Scope::Page, "h1").await), vec!["home"]);

        driver.navigate("page-b").await.unwrap();
        assert_eq!(driver.discover(Scope::Page, "li").await.len(), 1);
        assert_eq!(ids(&driver.discover(Scope::Page, "h1").await), vec!["b"]);
        assert_eq!(driver.current_url().as_deref(), Some("page-b"));
    }

    #[tokio::test]
    async fn clicking_a_link_element_navigates() {
        let mut driver = ReplayDriver::new();
        let link = ElementRef::new("archive");
        driver.add_element(&link, |el| el.navigates_to("archive-view"));
        driver.add_query(None, "a.archive", vec![link.clone()]);

        driver
            .click(Scope::Page, "a.archive", Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(driver.current_url().as_deref(), Some("archive-view"));
        assert_eq!(driver.actions(), vec![ReplayAction::Click("archive".into())]);

        let err = driver
            .click(Scope::Page, "missing", Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Navigation(_)));
    }

    #[test]
    fn page_loads_from_json() {
        let json = r##"{
            "authenticated": false,
            "elements": { "t": { "text": "Hi", "tag": "div", "attrs": { "class": "x" } } },
            "queries": [ { "selector": "h3", "results": ["t"] } ],
            "lists": [ { "selector": "li", "items": ["a", "b"], "initial": 1, "anchor": "first" } ]
        }"##;
        let page: ReplayPage = serde_json::from_str(json).unwrap();
        assert!(!page.authenticated);
        assert_eq!(page.lists[0].anchor, ListAnchor::First);
        assert_eq!(page.lists[0].step, 1);
        assert_eq!(page.queries[0].results, vec![ElementRef::new("t")]);
    }
}
