// Convergence-driven collection over a virtualized, scroll-loaded list.
//
// The host UI renders only a window of rows and loads more as it scrolls,
// and it never reports the true total. The collector repeatedly discovers
// what is rendered, assembles and dedups it, scrolls, and stops once a pass
// adds no new identity. A per-invocation iteration bound guards against
// runaway loops; an optional item bound stops early once enough is collected.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use chatharvest_common::{Identified, Result};

use crate::dedup::IdentitySet;

/// One workflow's view of a scrollable list.
#[async_trait]
pub trait ScrollSource: Send + Sync {
    /// Transient handle to one rendered row.
    type Item: Send + Sync;
    type Record: Identified + Send;

    /// Rows currently rendered, in document order.
    async fn discover(&mut self) -> Vec<Self::Item>;

    /// Build a record from a row. `Ok(None)` skips the row quietly; an error
    /// skips it and is counted as a failure.
    async fn assemble(&self, item: &Self::Item) -> Result<Option<Self::Record>>;

    /// Scroll so more rows get rendered. Only called with a non-empty slice.
    async fn advance(&mut self, discovered: &[Self::Item]);

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorBounds {
    pub max_iterations: usize,
    pub max_items: Option<usize>,
}

impl CollectorBounds {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            max_items: None,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeReason {
    /// A full pass added no new identity.
    Stalled,
    /// The configured item bound was reached.
    ItemLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Init,
    Scanning,
    Converged(ConvergeReason),
    /// Soft success: the caller still gets everything collected so far.
    IterationLimitReached,
}

impl CollectorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CollectorState::Converged(_) | CollectorState::IterationLimitReached
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub state: CollectorState,
    pub iterations: usize,
    /// Rows the assembler declined (`Ok(None)`).
    pub skipped: usize,
    /// Rows whose assembly failed with an error.
    pub failed: usize,
}

#[derive(Debug)]
pub struct Collection<T> {
    pub items: Vec<T>,
    pub report: CollectionReport,
}

/// Drive `source` until convergence or the iteration bound.
pub async fn collect<S: ScrollSource>(
    source: &mut S,
    bounds: CollectorBounds,
) -> Collection<S::Record> {
    let mut seen: IdentitySet<S::Record> = IdentitySet::new();
    let mut report = CollectionReport {
        state: CollectorState::Init,
        iterations: 0,
        skipped: 0,
        failed: 0,
    };
    let mut previous_count = 0;

    report.state = CollectorState::Scanning;
    while report.iterations < bounds.max_iterations {
        if let Some(max_items) = bounds.max_items {
            if seen.len() >= max_items {
                report.state = CollectorState::Converged(ConvergeReason::ItemLimit);
                break;
            }
        }

        report.iterations += 1;
        let discovered = source.discover().await;

        for item in &discovered {
            match source.assemble(item).await {
                Ok(Some(record)) => {
                    seen.add(record);
                }
                Ok(None) => report.skipped += 1,
                Err(e) if e.is_item_scoped() => {
                    report.failed += 1;
                    warn!(source = source.name(), error = %e, "Skipping unparsable row");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(source = source.name(), error = %e, "Row assembly failed, skipping");
                }
            }
        }

        if !discovered.is_empty() {
            source.advance(&discovered).await;
        }

        debug!(
            source = source.name(),
            iteration = report.iterations,
            rendered = discovered.len(),
            collected = seen.len(),
            "Collector pass complete"
        );

        if seen.len() > previous_count {
            previous_count = seen.len();
        } else {
            report.state = CollectorState::Converged(ConvergeReason::Stalled);
            break;
        }
    }

    if !report.state.is_terminal() {
        report.state = CollectorState::IterationLimitReached;
        warn!(
            source = source.name(),
            max_iterations = bounds.max_iterations,
            collected = seen.len(),
            "Iteration limit reached before the list converged"
        );
    }

    info!(
        source = source.name(),
        collected = seen.len(),
        iterations = report.iterations,
        skipped = report.skipped,
        failed = report.failed,
        state = ?report.state,
        "Collection finished"
    );

    Collection {
        items: seen.into_vec(),
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatharvest_common::HarvestError;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec(u32);

    impl Identified for Rec {
        type Key = u32;

        fn identity(&self) -> u32 {
            self.0
        }
    }

    /// Returns `window(call)` on each discover; records advance calls.
    struct Scripted<F: Fn(usize) -> Vec<u32> + Send + Sync> {
        window: F,
        calls: usize,
        advances: usize,
        last_anchor: Option<u32>,
    }

    impl<F: Fn(usize) -> Vec<u32> + Send + Sync> Scripted<F> {
        fn new(window: F) -> Self {
            Self {
                window,
                calls: 0,
                advances: 0,
                last_anchor: None,
            }
        }
    }

    #[async_trait]
    impl<F: Fn(usize) -> Vec<u32> + Send + Sync> ScrollSource for Scripted<F> {
        type Item = u32;
        type Record = Rec;

        async fn discover(&mut self) -> Vec<u32> {
            let rows = (self.window)(self.calls);
            self.calls += 1;
            rows
        }

        async fn assemble(&self, item: &u32) -> Result<Option<Rec>> {
            match *item {
                n if n >= 900 => Err(HarvestError::MalformedItem(format!("row {n}"))),
                n if n >= 800 => Ok(None),
                n => Ok(Some(Rec(n))),
            }
        }

        async fn advance(&mut self, discovered: &[u32]) {
            self.advances += 1;
            self.last_anchor = discovered.last().copied();
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn ids(items: &[Rec]) -> Vec<u32> {
        items.iter().map(|r| r.0).collect()
    }

    #[tokio::test]
    async fn fixed_window_converges_after_two_iterations() {
        let mut source = Scripted::new(|_| vec![1, 2, 3, 4, 5]);
        let out = collect(&mut source, CollectorBounds::new(1_000_000)).await;

        assert_eq!(out.report.iterations, 2);
        assert_eq!(
            out.report.state,
            CollectorState::Converged(ConvergeReason::Stalled)
        );
        assert_eq!(ids(&out.items), vec![1, 2, 3, 4, 5]);
        assert_eq!(source.calls, 2);
    }

    #[tokio::test]
    async fn growing_window_collects_every_item_in_first_seen_order() {
        const N: u32 = 7;
        // Call k renders rows 0..=min(k, N): one more row per pass until N.
        let mut source = Scripted::new(|call| (0..=(call as u32).min(N)).rev().collect());
        let out = collect(&mut source, CollectorBounds::new(1000)).await;

        assert_eq!(out.items.len(), (N + 1) as usize);
        assert_eq!(out.report.iterations, (N + 2) as usize);
        // Rows arrive newest-first within a pass, so first-seen order is 0, 1, 2, ...
        assert_eq!(ids(&out.items), (0..=N).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_first_pass_converges_immediately() {
        let mut source = Scripted::new(|_| Vec::new());
        let out = collect(&mut source, CollectorBounds::new(10)).await;

        assert!(out.items.is_empty());
        assert_eq!(out.report.iterations, 1);
        assert_eq!(source.advances, 0);
        assert_eq!(
            out.report.state,
            CollectorState::Converged(ConvergeReason::Stalled)
        );
    }

    #[tokio::test]
    async fn advance_uses_last_discovered_row() {
        let mut source = Scripted::new(|call| vec![call as u32 * 10, call as u32 * 10 + 1]);
        let _ = collect(&mut source, CollectorBounds::new(3)).await;
        assert_eq!(source.last_anchor, Some(21));
    }

    #[tokio::test]
    async fn iteration_limit_is_a_soft_stop() {
        let mut source = Scripted::new(|call| vec![call as u32]);
        let out = collect(&mut source, CollectorBounds::new(4)).await;

        assert_eq!(out.report.state, CollectorState::IterationLimitReached);
        assert_eq!(out.report.iterations, 4);
        assert_eq!(ids(&out.items), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn item_bound_stops_before_next_pass() {
        let mut source = Scripted::new(|call| {
            let base = call as u32 * 3;
            vec![base, base + 1, base + 2]
        });
        let out = collect(&mut source, CollectorBounds::new(100).with_max_items(5)).await;

        assert_eq!(
            out.report.state,
            CollectorState::Converged(ConvergeReason::ItemLimit)
        );
        // Checked at the top of a pass, so the pass that crossed the bound is kept whole.
        assert_eq!(out.items.len(), 6);
        assert_eq!(out.report.iterations, 2);
    }

    #[tokio::test]
    async fn bad_rows_are_counted_and_skipped() {
        let mut source = Scripted::new(|_| vec![1, 901, 2, 801, 902]);
        let out = collect(&mut source, CollectorBounds::new(10)).await;

        assert_eq!(ids(&out.items), vec![1, 2]);
        // Two passes, each seeing two failures and one decline.
        assert_eq!(out.report.failed, 4);
        assert_eq!(out.report.skipped, 2);
    }

    #[tokio::test]
    async fn zero_iteration_bound_collects_nothing() {
        let mut source = Scripted::new(|_| vec![1]);
        let out = collect(&mut source, CollectorBounds::new(0)).await;

        assert!(out.items.is_empty());
        assert_eq!(out.report.state, CollectorState::IterationLimitReached);
        assert_eq!(source.calls, 0);
    }
}
