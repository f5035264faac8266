use chrono::{DateTime, Local};

use chatharvest_common::{HarvestError, MediaKind, MediaRef, Post, Result};

use crate::date::normalize_at;
use crate::driver::{first, non_blank, text_of, ElementRef, Scope, UiDriver};
use crate::selectors;

/// Build a post from one message row.
///
/// `date_token` is the label of the date group the row sits under.
/// `chat_title` is set for private chats, where the other party is the chat
/// itself and rows carry no per-message sender name. `now` anchors relative
/// date labels and should be captured once per workflow run.
pub async fn assemble_post(
    driver: &dyn UiDriver,
    row: &ElementRef,
    date_token: &str,
    chat_title: Option<&str>,
    now: &DateTime<Local>,
) -> Result<Post> {
    let scope = Scope::Within(row);

    let dom_id = driver.read_attribute(row, "id").await.unwrap_or_default();
    let message_id = message_id_from(&dom_id).ok_or_else(|| {
        HarvestError::MalformedItem(format!("message row {row} has no numeric id: {dom_id:?}"))
    })?;

    let time_token = text_of(driver, scope, selectors::MESSAGE_TIME).await;
    let text = text_of(driver, scope, selectors::MESSAGE_TEXT)
        .await
        .map(|content| text_before_time(&content, time_token.as_deref()));

    let (sender, receiver) = attribute(driver, row, chat_title).await;
    let media = media_of(driver, row).await;
    let parsed_at = normalize_at(date_token, time_token.as_deref(), now)?;

    Ok(Post {
        message_id,
        date_token: date_token.to_string(),
        time_token,
        parsed_at,
        text,
        sender,
        receiver,
        media,
    })
}

/// Every ASCII digit in the DOM id, in order. `message12345` gives 12345.
pub fn message_id_from(dom_id: &str) -> Option<u64> {
    let digits: String = dom_id.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Rendered content with the trailing time label cut off.
pub fn text_before_time(content: &str, time_token: Option<&str>) -> String {
    match time_token.filter(|t| !t.is_empty()) {
        Some(time) => match content.rfind(time) {
            Some(at) => content[..at].to_string(),
            None => content.to_string(),
        },
        None => content.to_string(),
    }
}

/// (sender, receiver). In a private chat the title is the other party: the
/// receiver of outgoing rows, the sender of everything else. In group chats
/// the sender comes from the row's title element, when it has one.
async fn attribute(
    driver: &dyn UiDriver,
    row: &ElementRef,
    chat_title: Option<&str>,
) -> (Option<String>, Option<String>) {
    let scope = Scope::Within(row);

    match chat_title.filter(|t| !t.trim().is_empty()) {
        Some(title) => {
            let outgoing = first(driver, scope, selectors::OUTGOING_MARKER).await.is_some();
            if outgoing {
                (None, Some(title.to_string()))
            } else {
                (Some(title.to_string()), None)
            }
        }
        None => (
            non_blank(text_of(driver, scope, selectors::SENDER_NAME).await),
            None,
        ),
    }
}

async fn media_of(driver: &dyn UiDriver, row: &ElementRef) -> Vec<MediaRef> {
    let blocks = driver.discover(Scope::Within(row), selectors::MEDIA_BLOCK).await;

    let mut media = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let media_id = non_blank(driver.read_attribute(block, "id").await);
        let kind = match first(driver, Scope::Within(block), selectors::ANY_CHILD).await {
            Some(child) => {
                let tag = driver.tag_name(&child).await;
                let class = driver.read_attribute(&child, "class").await;
                MediaKind::classify(tag.as_deref(), class.as_deref())
            }
            None => MediaKind::Unknown,
        };
        media.push(MediaRef { media_id, kind });
    }
    media
}
