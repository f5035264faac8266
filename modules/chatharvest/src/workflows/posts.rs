use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{info, warn};

use chatharvest_common::{ChatSummary, Config, Post, Result};

use crate::assemble::assemble_post;
use crate::collector::{collect, CollectorBounds, ScrollSource};
use crate::driver::{
    ensure_authenticated, first, text_of, wait_elements, ElementRef, Scope, UiDriver,
};
use crate::selectors;
use crate::settle::settle;

use super::open_chat;

/// One rendered message row together with the date group it sits under.
#[derive(Debug, Clone)]
pub struct PostRow {
    pub element: ElementRef,
    pub group: ElementRef,
    pub date_token: String,
    pub first_in_group: bool,
}

/// Scroll source over the date-grouped message history of one chat.
///
/// History loads upwards, so advancing scrolls towards the oldest rendered
/// message and then backs off a little so the next batch can stream in.
pub struct PostSource<'a> {
    driver: &'a dyn UiDriver,
    config: &'a Config,
    container: ElementRef,
    chat_title: Option<String>,
    now: DateTime<Local>,
}

impl<'a> PostSource<'a> {
    pub fn new(
        driver: &'a dyn UiDriver,
        config: &'a Config,
        container: ElementRef,
        chat_title: Option<String>,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            driver,
            config,
            container,
            chat_title,
            now,
        }
    }
}

#[async_trait]
impl ScrollSource for PostSource<'_> {
    type Item = PostRow;
    type Record = Post;

    async fn discover(&mut self) -> Vec<PostRow> {
        let groups = wait_elements(
            self.driver,
            Scope::Within(&self.container),
            selectors::DATE_GROUP,
            self.config.element_timeout,
            1,
            self.config,
        )
        .await;

        let mut rows = Vec::new();
        for group in groups {
            let date_token = text_of(self.driver, Scope::Within(&group), selectors::DATE_LABEL)
                .await
                .map(|d| d.trim().to_string())
                .unwrap_or_default();
            let messages = self
                .driver
                .discover(Scope::Within(&group), selectors::MESSAGE)
                .await;

            for (i, element) in messages.into_iter().enumerate() {
                rows.push(PostRow {
                    element,
                    group: group.clone(),
                    date_token: date_token.clone(),
                    first_in_group: i == 0,
                });
            }
        }
        rows
    }

    async fn assemble(&self, row: &PostRow) -> Result<Option<Post>> {
        assemble_post(
            self.driver,
            &row.element,
            &row.date_token,
            self.chat_title.as_deref(),
            &self.now,
        )
        .await
        .map(Some)
    }

    async fn advance(&mut self, discovered: &[PostRow]) {
        for row in discovered.iter().filter(|r| r.first_in_group) {
            self.driver.scroll_into_view(&row.element).await;
        }

        let Some(oldest) = discovered.first() else {
            return;
        };
        self.driver.scroll_into_view(&oldest.group).await;
        self.driver.scroll_into_view(&oldest.element).await;

        let scope = Scope::Within(&self.container);
        settle(self.driver, scope, selectors::DATE_GROUP, self.config).await;
        self.driver
            .scroll_by(&oldest.element, -self.config.post_backscroll_px)
            .await;
        settle(self.driver, scope, selectors::DATE_GROUP, self.config).await;
    }

    fn name(&self) -> &str {
        "posts"
    }
}

/// Up to roughly `max_posts` posts of `chat`, sorted by message id.
///
/// The bound is checked between passes, so the last pass may overshoot it.
/// Private chats pass their title down so each post can be attributed.
pub async fn fetch_posts(
    driver: &dyn UiDriver,
    config: &Config,
    chat: &ChatSummary,
    max_posts: usize,
) -> Result<Vec<Post>> {
    ensure_authenticated(driver).await?;
    open_chat(driver, config, chat).await?;

    if !driver
        .wait_visible(Scope::Page, selectors::MESSAGES_CONTAINER, config.element_timeout)
        .await
    {
        warn!(chat = %chat.url, "Message history did not render");
    }
    let Some(container) = first(driver, Scope::Page, selectors::MESSAGES_CONTAINER).await else {
        warn!(chat = %chat.url, "No message container, returning no posts");
        return Ok(Vec::new());
    };

    let chat_title = chat.is_private().then(|| chat.title.clone());
    let mut source = PostSource::new(driver, config, container, chat_title, Local::now());
    let bounds = CollectorBounds::new(config.post_iteration_limit).with_max_items(max_posts);
    let collection = collect(&mut source, bounds).await;

    let mut posts = collection.items;
    posts.sort_by_key(|p| p.message_id);

    info!(
        chat = %chat.url,
        count = posts.len(),
        failed = collection.report.failed,
        "Posts harvested"
    );
    Ok(posts)
}
