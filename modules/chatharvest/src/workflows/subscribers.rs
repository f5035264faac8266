use async_trait::async_trait;
use tracing::{info, warn};

use chatharvest_common::{ChatSummary, Config, Result, Subscriber};

use crate::assemble::{assemble_subscriber, enrich_profile};
use crate::collector::{collect, CollectorBounds, ScrollSource};
use crate::driver::{ensure_authenticated, first, wait_elements, ElementRef, Scope, UiDriver};
use crate::selectors;

use super::open_chat;

/// Scroll source over the member list in a chat's side panel.
///
/// The list only loads more members once its scroll container has actually
/// moved, so advancing nudges the container up and down before waiting for
/// at least one new row.
pub struct MemberListSource<'a> {
    driver: &'a dyn UiDriver,
    config: &'a Config,
    list: ElementRef,
}

impl<'a> MemberListSource<'a> {
    pub fn new(driver: &'a dyn UiDriver, config: &'a Config, list: ElementRef) -> Self {
        Self {
            driver,
            config,
            list,
        }
    }

    async fn rows(&self, timeout: std::time::Duration, min_count: usize) -> Vec<ElementRef> {
        wait_elements(
            self.driver,
            Scope::Within(&self.list),
            selectors::MEMBER_ROW,
            timeout,
            min_count,
            self.config,
        )
        .await
    }

    async fn jiggle(&self) {
        for _ in 0..self.config.member_jiggle_rounds {
            let Some(scroller) = first(self.driver, Scope::Page, selectors::MEMBERS_SCROLLER).await
            else {
                return;
            };
            self.driver
                .scroll_by(&scroller, -self.config.member_jiggle_up_px)
                .await;
            self.driver
                .scroll_by(&scroller, self.config.member_jiggle_down_px)
                .await;
        }
    }
}

#[async_trait]
impl ScrollSource for MemberListSource<'_> {
    type Item = ElementRef;
    type Record = Subscriber;

    async fn discover(&mut self) -> Vec<ElementRef> {
        self.rows(self.config.element_timeout, 1).await
    }

    async fn assemble(&self, row: &ElementRef) -> Result<Option<Subscriber>> {
        assemble_subscriber(self.driver, row, &self.config.app_base_url)
            .await
            .map(Some)
    }

    async fn advance(&mut self, discovered: &[ElementRef]) {
        if let Some(last) = discovered.last() {
            self.driver.scroll_into_view(last).await;
        }

        let rendered = self.rows(self.config.element_timeout, 1).await;
        let Some(last) = rendered.last() else {
            return;
        };
        self.driver.scroll_into_view(last).await;

        self.jiggle().await;

        let grown = self
            .rows(self.config.growth_timeout, rendered.len() + 1)
            .await;
        if let Some(last) = grown.last() {
            self.driver.scroll_into_view(last).await;
        }
    }

    fn name(&self) -> &str {
        "subscribers"
    }
}

/// Members of `chat`, in list order, each enriched from its profile page.
///
/// Pass 1 scans the member list into minimal records. Pass 2 visits every
/// profile; a profile that fails to load leaves its subscriber minimal.
pub async fn fetch_subscribers(
    driver: &dyn UiDriver,
    config: &Config,
    chat: &ChatSummary,
) -> Result<Vec<Subscriber>> {
    ensure_authenticated(driver).await?;
    open_chat(driver, config, chat).await?;
    driver
        .click(Scope::Page, selectors::MIDDLE_HEADER, config.element_timeout)
        .await?;

    driver
        .wait_visible(Scope::Page, selectors::MEMBER_LIST, config.element_timeout)
        .await;
    let Some(list) = first(driver, Scope::Page, selectors::MEMBER_LIST).await else {
        warn!(chat = %chat.url, "No member list, returning no subscribers");
        return Ok(Vec::new());
    };

    let mut source = MemberListSource::new(driver, config, list);
    let collection = collect(
        &mut source,
        CollectorBounds::new(config.subscriber_iteration_limit),
    )
    .await;

    let mut subscribers = collection.items;
    let total = subscribers.len();
    for (i, subscriber) in subscribers.iter_mut().enumerate() {
        match enrich_profile(driver, subscriber, config).await {
            Ok(profile) => subscriber.enrich(profile),
            Err(e) => warn!(
                peer_id = subscriber.peer_id.as_str(),
                error = %e,
                "Profile visit failed, keeping minimal record"
            ),
        }
        info!(
            n = i + 1,
            total,
            name = subscriber.display_name.as_str(),
            "Scraped subscriber"
        );
    }

    Ok(subscribers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{ReplayAction, ReplayDriver};
    use crate::testing::{member_list, member_row, members_scroller};

    #[tokio::test]
    async fn advance_jiggles_the_scroller_between_scrolls() {
        let config = Config::for_replay();
        let mut driver = ReplayDriver::new();
        let list = member_list(&mut driver);
        let scroller = members_scroller(&mut driver);
        let a = member_row(&mut driver, "1", "Ann");
        let b = member_row(&mut driver, "2", "Bo");
        driver.add_query(Some(&list), selectors::MEMBER_ROW, vec![a, b]);

        let mut source = MemberListSource::new(&driver, &config, list);
        let rows = source.discover().await;
        source.advance(&rows).await;

        let id = scroller.id().to_string();
        assert_eq!(
            driver.actions(),
            vec![
                ReplayAction::ScrollIntoView("member-2".into()),
                ReplayAction::ScrollIntoView("member-2".into()),
                ReplayAction::ScrollBy(id.clone(), -500),
                ReplayAction::ScrollBy(id.clone(), 1000),
                ReplayAction::ScrollBy(id.clone(), -500),
                ReplayAction::ScrollBy(id, 1000),
                ReplayAction::ScrollIntoView("member-2".into()),
            ]
        );
    }
}
