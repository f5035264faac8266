use async_trait::async_trait;
use tracing::{info, warn};

use chatharvest_common::{ChatSummary, Config, Result};

use crate::assemble::assemble_chat;
use crate::collector::{collect, CollectorBounds, ScrollSource};
use crate::dedup::IdentitySet;
use crate::driver::{ensure_authenticated, ElementRef, Scope, UiDriver};
use crate::selectors;

/// Scroll source over the rendered rows of the chat list.
pub struct ChatListSource<'a> {
    driver: &'a dyn UiDriver,
    app_base_url: &'a str,
}

impl<'a> ChatListSource<'a> {
    pub fn new(driver: &'a dyn UiDriver, app_base_url: &'a str) -> Self {
        Self {
            driver,
            app_base_url,
        }
    }
}

#[async_trait]
impl ScrollSource for ChatListSource<'_> {
    type Item = ElementRef;
    type Record = ChatSummary;

    async fn discover(&mut self) -> Vec<ElementRef> {
        self.driver.discover(Scope::Page, selectors::CHAT_ROWS).await
    }

    async fn assemble(&self, row: &ElementRef) -> Result<Option<ChatSummary>> {
        assemble_chat(self.driver, row, self.app_base_url).await.map(Some)
    }

    async fn advance(&mut self, discovered: &[ElementRef]) {
        if let Some(last) = discovered.last() {
            self.driver.scroll_into_view(last).await;
        }
    }

    fn name(&self) -> &str {
        "chats"
    }
}

/// Every chat in the "All Chats" folder, followed by archived chats when
/// `include_archived` is set. Chats seen in both keep their first position.
pub async fn fetch_chats(driver: &dyn UiDriver, config: &Config) -> Result<Vec<ChatSummary>> {
    ensure_authenticated(driver).await?;

    let mut chats: IdentitySet<ChatSummary> = scan_chat_list(driver, config, false)
        .await?
        .into_iter()
        .collect();

    if config.include_archived {
        let archived = scan_chat_list(driver, config, true).await?;
        let added = chats.add_all(archived);
        info!(added, "Archived chats merged");
    }

    info!(count = chats.len(), "Chat list harvested");
    Ok(chats.into_vec())
}

async fn scan_chat_list(
    driver: &dyn UiDriver,
    config: &Config,
    archive: bool,
) -> Result<Vec<ChatSummary>> {
    if !driver
        .wait_visible(Scope::Page, selectors::CHAT_ITEM, config.element_timeout)
        .await
    {
        warn!("Chat list did not render");
    }

    let Some(tab) = all_chats_tab(driver).await else {
        warn!(archive, "No \"All Chats\" tab found, skipping chat list");
        return Ok(Vec::new());
    };
    driver.click_item(&tab).await?;

    if archive {
        if let Err(e) = driver
            .click(Scope::Page, selectors::ARCHIVE_ROW, config.element_timeout)
            .await
        {
            warn!(error = %e, "Archive row not available, skipping archived chats");
            return Ok(Vec::new());
        }
    }

    let mut source = ChatListSource::new(driver, &config.app_base_url);
    let collection = collect(&mut source, CollectorBounds::new(config.chat_iteration_limit)).await;
    Ok(collection.items)
}

async fn all_chats_tab(driver: &dyn UiDriver) -> Option<ElementRef> {
    for tab in driver.discover(Scope::Page, selectors::CHAT_TABS).await {
        let text = driver.read_text(&tab).await.unwrap_or_default();
        if text.trim_start().starts_with(selectors::ALL_CHATS_TAB_PREFIX) {
            return Some(tab);
        }
    }
    None
}
