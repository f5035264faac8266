use chatharvest_common::{ChatSummary, ChatType, HarvestError, Result};

use crate::driver::{attr_of, non_blank, text_of, ElementRef, Scope, UiDriver};
use crate::selectors;

/// Build a chat summary from one chat-list row.
///
/// The row link's `href` is a fragment (`#-100123`) relative to the app base URL.
pub async fn assemble_chat(
    driver: &dyn UiDriver,
    row: &ElementRef,
    app_base_url: &str,
) -> Result<ChatSummary> {
    let scope = Scope::Within(row);

    let title = non_blank(text_of(driver, scope, selectors::CHAT_TITLE).await)
        .ok_or_else(|| HarvestError::MalformedItem(format!("chat row {row} has no title")))?;

    let href = non_blank(attr_of(driver, scope, selectors::CHAT_LINK, "href").await)
        .ok_or_else(|| HarvestError::MalformedItem(format!("chat row {row} has no link")))?;

    let class = driver.read_attribute(row, "class").await.unwrap_or_default();
    let chat_type = if class
        .split_whitespace()
        .any(|c| c.contains(selectors::PRIVATE_CLASS_MARKER))
    {
        ChatType::Private
    } else {
        ChatType::Group
    };

    Ok(ChatSummary {
        title,
        url: format!("{app_base_url}{href}"),
        chat_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplayDriver;
    use crate::testing::chat_row;

    const BASE: &str = "https://web.telegram.org/a/";

    #[tokio::test]
    async fn private_marker_sets_chat_type() {
        let mut driver = ReplayDriver::new();
        let private = chat_row(&mut driver, "c1", "Ann", "#111", true);
        let group = chat_row(&mut driver, "c2", "Rust Users", "#-100222", false);

        let ann = assemble_chat(&driver, &private, BASE).await.unwrap();
        assert_eq!(ann.title, "Ann");
        assert_eq!(ann.url, "https://web.telegram.org/a/#111");
        assert_eq!(ann.chat_type, ChatType::Private);

        let rust = assemble_chat(&driver, &group, BASE).await.unwrap();
        assert_eq!(rust.chat_type, ChatType::Group);
        assert!(!rust.is_private());
    }

    #[tokio::test]
    async fn row_without_link_is_malformed() {
        let mut driver = ReplayDriver::new();
        let row = ElementRef::new("c1");
        driver.add_element(&row, |el| el.attr("class", "chat-item-clickable"));
        let title = ElementRef::new("c1-title");
        driver.add_element(&title, |el| el.text("Orphan"));
        driver.add_query(Some(&row), selectors::CHAT_TITLE, vec![title]);

        let err = assemble_chat(&driver, &row, BASE).await.unwrap_err();
        assert!(matches!(err, HarvestError::MalformedItem(_)));
    }
}
