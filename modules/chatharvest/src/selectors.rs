//! Default selector profile for the Telegram Web "A" client.
//!
//! The collection algorithms only see these through the workflows, so a
//! different target needs a different profile, not different algorithms.

// --- Chat list ---

pub const CHAT_ITEM: &str = "div.chat-item-clickable";
pub const CHAT_ROWS: &str = "div.chat-item-clickable:not(.chat-item-archive)";
pub const ARCHIVE_ROW: &str = "div.chat-item-clickable.chat-item-archive";
pub const CHAT_TABS: &str = "div.TabList.no-scrollbar div.Tab.Tab--interactive";
pub const ALL_CHATS_TAB_PREFIX: &str = "All Chats";
pub const CHAT_TITLE: &str = "div.info h3";
pub const CHAT_LINK: &str = "a";
pub const PRIVATE_CLASS_MARKER: &str = "private";

// --- Chat header / side panel ---

pub const MIDDLE_HEADER: &str = "div.MiddleHeader div.info";
pub const RIGHT_HEADER_TITLE: &str = "div.RightHeader h3";
pub const PUBLIC_LINK: &str = "div.ChatExtra div.ListItem-button span.title";
pub const PROFILE_PHOTOS: &str = "div.profile-info div.ProfilePhoto img";

// --- Messages ---

pub const MESSAGES_CONTAINER: &str = "div.messages-container";
pub const DATE_GROUP: &str = "div.message-date-group";
pub const DATE_LABEL: &str = "div.sticky-date span";
pub const MESSAGE: &str = "div[id^='message']";
pub const MESSAGE_TIME: &str = "span.message-time";
pub const MESSAGE_TEXT: &str = "div.text-content";
pub const OUTGOING_MARKER: &str = "div.with-outgoing-icon";
pub const SENDER_NAME: &str = "span.message-title-name";
pub const MEDIA_BLOCK: &str = "div.content-inner div.media-inner";
pub const ANY_CHILD: &str = "*";

// --- Members ---

pub const MEMBER_LIST: &str = "div.shared-media div.members-list";
pub const MEMBER_ROW: &str =
    "div.ListItem.chat-item-clickable.contact-list-item.scroll-item.small-icon";
pub const MEMBERS_SCROLLER: &str =
    "div.Profile.custom-scroll.Transition_slide.Transition_slide-active";
pub const MEMBER_AVATAR: &str = "div.ChatInfo div.Avatar";
pub const MEMBER_NAME: &str = "h3";
pub const PEER_ID_ATTR: &str = "data-peer-id";

// --- Profile page ---

pub const PROFILE_PHONE: &str = ".icon-phone + .multiline-item .title";
pub const PROFILE_BIRTHDAY: &str = ".icon-calendar + .multiline-item .title";
pub const PROFILE_BIO: &str = ".icon-info + .multiline-item .title";
pub const PROFILE_MENTION: &str = ".icon-mention + .multiline-item .title";
