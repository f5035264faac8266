use tracing::info;

use chatharvest_common::{ChatDetails, ChatSummary, Config, Result};

use crate::driver::{ensure_authenticated, non_blank, wait_elements, wait_text, Scope, UiDriver};
use crate::selectors;

use super::open_chat;

/// Header-level details of `chat` from its side panel.
pub async fn fetch_details(
    driver: &dyn UiDriver,
    config: &Config,
    chat: &ChatSummary,
) -> Result<ChatDetails> {
    ensure_authenticated(driver).await?;
    open_chat(driver, config, chat).await?;
    driver
        .click(Scope::Page, selectors::MIDDLE_HEADER, config.element_timeout)
        .await?;

    // The side panel slides in after the click. "Group Info", "Channel Info",
    // "User Info": the first word is the kind.
    let heading = wait_text(driver, selectors::RIGHT_HEADER_TITLE, config.element_timeout).await;
    let kind_label = non_blank(heading)
        .and_then(|heading| heading.split_whitespace().next().map(str::to_string));
    let public_link = non_blank(
        wait_text(driver, selectors::PUBLIC_LINK, config.profile_field_timeout).await,
    );

    let photos = wait_elements(
        driver,
        Scope::Page,
        selectors::PROFILE_PHOTOS,
        config.element_timeout,
        1,
        config,
    )
    .await;
    let mut avatars = Vec::with_capacity(photos.len());
    for photo in &photos {
        if let Some(src) = non_blank(driver.read_attribute(photo, "src").await) {
            avatars.push(src);
        }
    }

    info!(
        chat = %chat.url,
        kind = kind_label.as_deref().unwrap_or("-"),
        avatars = avatars.len(),
        "Chat details harvested"
    );

    Ok(ChatDetails {
        summary: chat.clone(),
        kind_label,
        public_link,
        avatars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatharvest_common::{ChatType, HarvestError};

    use crate::replay::ReplayDriver;

    #[tokio::test]
    async fn missing_header_is_a_navigation_error() {
        let driver = ReplayDriver::new();
        let chat = ChatSummary {
            title: "Ann".into(),
            url: "https://web.telegram.org/a/#1".into(),
            chat_type: ChatType::Private,
        };

        let err = fetch_details(&driver, &Config::for_replay(), &chat)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Navigation(_)));
    }
}
