// Fixture helpers for building ReplayDriver pages in tests.
//
// Each helper registers the elements and scoped queries one UI fragment
// needs (a chat row, a message row, a member row, a profile field) under
// the default selector profile and returns the fragment's root handle.
// Virtual lists over those roots are added by the test itself.

use chatharvest_common::{ChatSummary, ChatType};

use crate::driver::ElementRef;
use crate::replay::ReplayDriver;
use crate::selectors;

// ---------------------------------------------------------------------------
// Chat list
// ---------------------------------------------------------------------------

/// A chat-list row with a title and a link. `href` is the fragment after the app base URL.
pub fn chat_row(
    driver: &mut ReplayDriver,
    id: &str,
    title: &str,
    href: &str,
    private: bool,
) -> ElementRef {
    let row = ElementRef::new(id);
    let class = if private {
        "ListItem chat-item-clickable private"
    } else {
        "ListItem chat-item-clickable group"
    };
    driver.add_element(&row, |el| el.tag("div").attr("class", class));

    let title_el = ElementRef::new(format!("{id}-title"));
    driver.add_element(&title_el, |el| el.tag("h3").text(title));
    driver.add_query(Some(&row), selectors::CHAT_TITLE, vec![title_el]);

    let link = ElementRef::new(format!("{id}-link"));
    driver.add_element(&link, |el| el.tag("a").attr("href", href));
    driver.add_query(Some(&row), selectors::CHAT_LINK, vec![link]);

    row
}

/// Folder tabs above the chat list, in order. Also marks the list as rendered.
pub fn chat_tabs(driver: &mut ReplayDriver, labels: &[&str]) -> Vec<ElementRef> {
    let tabs: Vec<ElementRef> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let tab = ElementRef::new(format!("tab-{i}"));
            driver.add_element(&tab, |el| el.tag("div").text(*label));
            tab
        })
        .collect();
    driver.add_query(None, selectors::CHAT_TABS, tabs.clone());
    driver.add_query(None, selectors::CHAT_ITEM, tabs.clone());
    tabs
}

/// The archive entry of the chat list. Clicking it moves the page to `archive_url`.
pub fn archive_row(driver: &mut ReplayDriver, archive_url: &str) -> ElementRef {
    let row = ElementRef::new("archive");
    driver.add_element(&row, |el| el.tag("div").navigates_to(archive_url));
    driver.add_query(None, selectors::ARCHIVE_ROW, vec![row.clone()]);
    row
}

/// A chat summary as the chat-list workflow would produce it.
pub fn summary(title: &str, url: &str, private: bool) -> ChatSummary {
    ChatSummary {
        title: title.to_string(),
        url: url.to_string(),
        chat_type: if private {
            ChatType::Private
        } else {
            ChatType::Group
        },
    }
}

// ---------------------------------------------------------------------------
// Message history
// ---------------------------------------------------------------------------

pub fn messages_container(driver: &mut ReplayDriver) -> ElementRef {
    let container = ElementRef::new("messages");
    driver.add_element(&container, |el| el.tag("div"));
    driver.add_query(None, selectors::MESSAGES_CONTAINER, vec![container.clone()]);
    container
}

/// A message row whose DOM id is `dom_id`. The text block renders `content`;
/// `time` is the time label, absent for service rows.
pub fn message_row(
    driver: &mut ReplayDriver,
    dom_id: &str,
    content: &str,
    time: Option<&str>,
) -> ElementRef {
    let row = ElementRef::new(dom_id);
    driver.add_element(&row, |el| el.tag("div").attr("id", dom_id));

    let text = ElementRef::new(format!("{dom_id}-text"));
    driver.add_element(&text, |el| el.tag("div").text(content));
    driver.add_query(Some(&row), selectors::MESSAGE_TEXT, vec![text]);

    if let Some(time) = time {
        let time_el = ElementRef::new(format!("{dom_id}-time"));
        driver.add_element(&time_el, |el| el.tag("span").text(time));
        driver.add_query(Some(&row), selectors::MESSAGE_TIME, vec![time_el]);
    }

    row
}

/// A date group labelled `label` holding `messages`.
pub fn date_group(
    driver: &mut ReplayDriver,
    id: &str,
    label: &str,
    messages: Vec<ElementRef>,
) -> ElementRef {
    let group = ElementRef::new(id);
    driver.add_element(&group, |el| el.tag("div"));

    let label_el = ElementRef::new(format!("{id}-label"));
    driver.add_element(&label_el, |el| el.tag("span").text(label));
    driver.add_query(Some(&group), selectors::DATE_LABEL, vec![label_el]);
    driver.add_query(Some(&group), selectors::MESSAGE, messages);

    group
}

/// A media block whose first child renders as `<tag class="class">`.
pub fn media_block(driver: &mut ReplayDriver, id: &str, tag: &str, class: &str) -> ElementRef {
    let block = ElementRef::new(id);
    driver.add_element(&block, |el| el.tag("div").attr("id", id));

    let child = ElementRef::new(format!("{id}-child"));
    driver.add_element(&child, |el| el.tag(tag).attr("class", class));
    driver.add_query(Some(&block), selectors::ANY_CHILD, vec![child]);

    block
}

// ---------------------------------------------------------------------------
// Side panel and members
// ---------------------------------------------------------------------------

/// The chat header that opens the side panel.
pub fn middle_header(driver: &mut ReplayDriver) -> ElementRef {
    let header = ElementRef::new("middle-header");
    driver.add_element(&header, |el| el.tag("div"));
    driver.add_query(None, selectors::MIDDLE_HEADER, vec![header.clone()]);
    header
}

pub fn member_list(driver: &mut ReplayDriver) -> ElementRef {
    let list = ElementRef::new("members");
    driver.add_element(&list, |el| el.tag("div"));
    driver.add_query(None, selectors::MEMBER_LIST, vec![list.clone()]);
    list
}

pub fn members_scroller(driver: &mut ReplayDriver) -> ElementRef {
    let scroller = ElementRef::new("members-scroller");
    driver.add_element(&scroller, |el| el.tag("div"));
    driver.add_query(None, selectors::MEMBERS_SCROLLER, vec![scroller.clone()]);
    scroller
}

/// A member row with id `member-<peer_id>`.
pub fn member_row(driver: &mut ReplayDriver, peer_id: &str, name: &str) -> ElementRef {
    let row = ElementRef::new(format!("member-{peer_id}"));
    driver.add_element(&row, |el| el.tag("div"));

    let avatar = ElementRef::new(format!("member-{peer_id}-avatar"));
    driver.add_element(&avatar, |el| {
        el.tag("div").attr(selectors::PEER_ID_ATTR, peer_id)
    });
    driver.add_query(Some(&row), selectors::MEMBER_AVATAR, vec![avatar]);

    let name_el = ElementRef::new(format!("member-{peer_id}-name"));
    driver.add_element(&name_el, |el| el.tag("h3").text(name));
    driver.add_query(Some(&row), selectors::MEMBER_NAME, vec![name_el]);

    row
}

/// A profile field rendered only while the page is at `url`.
pub fn profile_field(driver: &mut ReplayDriver, url: &str, selector: &str, text: &str) {
    let field = ElementRef::new(format!("{url}|{selector}"));
    driver.add_element(&field, |el| el.tag("span").text(text));
    driver.add_query_at(url, None, selector, vec![field]);
}
