//! End-to-end harvest workflows over one logged-in browsing session.
//!
//! Each workflow checks authentication before touching the page, builds the
//! scroll source for its list and hands it to the collector with bounds
//! taken from `Config`. `Harvester` bundles a driver and a config so callers
//! don't have to thread both through every call.

pub mod chats;
pub mod details;
pub mod posts;
pub mod subscribers;

use std::sync::Arc;

use typed_builder::TypedBuilder;

use chatharvest_common::{ChatDetails, ChatSummary, Config, Post, Result, Subscriber};

use crate::driver::UiDriver;

pub use chats::fetch_chats;
pub use details::fetch_details;
pub use posts::fetch_posts;
pub use subscribers::fetch_subscribers;

/// Shared entry point for all workflows.
#[derive(Clone, TypedBuilder)]
pub struct Harvester {
    driver: Arc<dyn UiDriver>,
    #[builder(default)]
    config: Config,
}

impl Harvester {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn driver(&self) -> &dyn UiDriver {
        self.driver.as_ref()
    }

    pub async fn chats(&self) -> Result<Vec<ChatSummary>> {
        fetch_chats(self.driver(), &self.config).await
    }

    /// Posts of `chat`, oldest id first. `max_posts` falls back to the configured default.
    pub async fn posts(&self, chat: &ChatSummary, max_posts: Option<usize>) -> Result<Vec<Post>> {
        let max_posts = max_posts.unwrap_or(self.config.default_max_posts);
        fetch_posts(self.driver(), &self.config, chat, max_posts).await
    }

    pub async fn subscribers(&self, chat: &ChatSummary) -> Result<Vec<Subscriber>> {
        fetch_subscribers(self.driver(), &self.config, chat).await
    }

    pub async fn details(&self, chat: &ChatSummary) -> Result<ChatDetails> {
        fetch_details(self.driver(), &self.config, chat).await
    }
}

/// Load `chat` from a blank page. Hash-only URL changes don't always
/// re-render the client, so every chat visit goes through the reset URL.
pub(crate) async fn open_chat(
    driver: &dyn UiDriver,
    config: &Config,
    chat: &ChatSummary,
) -> Result<()> {
    driver.navigate(&config.reset_url).await?;
    driver.navigate(&chat.url).await
}
