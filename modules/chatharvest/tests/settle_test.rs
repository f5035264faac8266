//! Condition-based settling: wait until the rendered row count stops changing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use chatharvest::driver::{ElementRef, Scope, UiDriver};
use chatharvest::replay::ReplayDriver;
use chatharvest::settle::{settle, wait_for_stable_count};
use chatharvest_common::{Config, HarvestError, Result, SettlePolicy};

/// Renders one more row on every query until `cap` rows are showing.
struct GrowingList {
    polls: AtomicUsize,
    cap: usize,
}

impl GrowingList {
    fn new(cap: usize) -> Self {
        Self {
            polls: AtomicUsize::new(0),
            cap,
        }
    }
}

#[async_trait]
impl UiDriver for GrowingList {
    async fn discover(&self, _scope: Scope<'_>, _selector: &str) -> Vec<ElementRef> {
        let n = (self.polls.fetch_add(1, Ordering::SeqCst) + 1).min(self.cap);
        (0..n).map(|i| ElementRef::new(format!("row-{i}"))).collect()
    }

    async fn read_text(&self, _item: &ElementRef) -> Option<String> {
        None
    }

    async fn read_attribute(&self, _item: &ElementRef, _name: &str) -> Option<String> {
        None
    }

    async fn tag_name(&self, _item: &ElementRef) -> Option<String> {
        None
    }

    async fn scroll_into_view(&self, _item: &ElementRef) {}

    async fn scroll_by(&self, _item: &ElementRef, _dy: i64) {}

    async fn wait_visible(&self, _scope: Scope<'_>, _selector: &str, _timeout: Duration) -> bool {
        true
    }

    async fn click(&self, _scope: Scope<'_>, selector: &str, _timeout: Duration) -> Result<()> {
        Err(HarvestError::Navigation(selector.to_string()))
    }

    async fn click_item(&self, _item: &ElementRef) -> Result<()> {
        Ok(())
    }

    async fn navigate(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "growing"
    }
}

#[tokio::test]
async fn stable_count_waits_for_growth_to_stop() {
    let driver = GrowingList::new(5);
    let config = Config::for_replay();

    let count = wait_for_stable_count(
        &driver,
        Scope::Page,
        "li",
        Duration::from_millis(30),
        Duration::from_secs(5),
        &config,
    )
    .await;

    assert_eq!(count, 5);
    assert!(driver.polls.load(Ordering::SeqCst) > 5);
}

#[tokio::test]
async fn stable_count_gives_up_at_timeout() {
    let driver = GrowingList::new(usize::MAX);
    let config = Config::for_replay();
    let started = Instant::now();

    let count = wait_for_stable_count(
        &driver,
        Scope::Page,
        "li",
        Duration::from_secs(10),
        Duration::from_millis(40),
        &config,
    )
    .await;

    assert!(count > 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn settle_dispatches_on_policy() {
    let driver = ReplayDriver::new();
    let config = Config {
        settle: SettlePolicy::StableCount {
            quiet: Duration::from_millis(10),
            timeout: Duration::from_millis(500),
        },
        ..Config::for_replay()
    };
    let started = Instant::now();
    settle(&driver, Scope::Page, "li", &config).await;
    assert!(started.elapsed() >= Duration::from_millis(10));

    let config = Config {
        settle: SettlePolicy::Jitter {
            min: Duration::from_millis(15),
            max: Duration::from_millis(20),
        },
        ..Config::for_replay()
    };
    let started = Instant::now();
    settle(&driver, Scope::Page, "li", &config).await;
    assert!(started.elapsed() >= Duration::from_millis(15));
}
