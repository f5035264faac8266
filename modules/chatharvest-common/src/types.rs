use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Private,
    Group,
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatType::Private => write!(f, "private"),
            ChatType::Group => write!(f, "group"),
        }
    }
}

/// Coarse classification of a media block attached to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Document,
    Unknown,
}

impl MediaKind {
    /// Classify from the first rendered child of a media block: its tag name
    /// and its class attribute. Video wins over image because video
    /// thumbnails render an `<img>` poster next to the player class.
    pub fn classify(tag: Option<&str>, class: Option<&str>) -> Self {
        let tag = tag.map(|t| t.to_ascii_lowercase()).unwrap_or_default();
        let class = class.map(|c| c.to_ascii_lowercase()).unwrap_or_default();

        if tag == "video" || class.contains("video") {
            MediaKind::Video
        } else if tag == "img"
            || tag == "canvas"
            || class.contains("photo")
            || class.contains("thumbnail")
            || class.contains("image")
        {
            MediaKind::Image
        } else if class.contains("document") || class.contains("file") || class.contains("audio") {
            MediaKind::Document
        } else {
            MediaKind::Unknown
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Document => write!(f, "document"),
            MediaKind::Unknown => write!(f, "unknown"),
        }
    }
}

// --- Identity ---

/// Stable natural key of a harvested record. Two observations with equal
/// identity are the same logical record, whatever else differs between them.
pub trait Identified {
    type Key: Eq + std::hash::Hash + Clone + std::fmt::Debug;

    fn identity(&self) -> Self::Key;
}

// --- Chats ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub title: String,
    /// Unique per chat; doubles as the identity key.
    pub url: String,
    pub chat_type: ChatType,
}

impl ChatSummary {
    pub fn is_private(&self) -> bool {
        self.chat_type == ChatType::Private
    }
}

impl PartialEq for ChatSummary {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for ChatSummary {}

impl Identified for ChatSummary {
    type Key = String;

    fn identity(&self) -> String {
        self.url.clone()
    }
}

/// Header-level information about one chat, read from its side panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetails {
    pub summary: ChatSummary,
    /// First word of the side panel heading, e.g. "Group", "Channel", "User".
    pub kind_label: Option<String>,
    pub public_link: Option<String>,
    #[serde(default)]
    pub avatars: Vec<String>,
}

// --- Posts ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub media_id: Option<String>,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub message_id: u64,
    /// Raw date group label as rendered ("TODAY", "Monday", "March 3, 2023").
    pub date_token: String,
    /// Raw time label as rendered, possibly carrying an "edited" marker.
    pub time_token: Option<String>,
    pub parsed_at: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaRef>,
}

impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        self.message_id == other.message_id
    }
}

impl Eq for Post {}

impl Identified for Post {
    type Key = u64;

    fn identity(&self) -> u64 {
        self.message_id
    }
}

// --- Subscribers ---

/// Optional profile fields filled during the enrichment pass.
/// Any of them may be absent on an incomplete public profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProfile {
    pub public_handle_url: Option<String>,
    pub phone: Option<String>,
    pub birth_date_raw: Option<String>,
    pub bio: Option<String>,
}

impl SubscriberProfile {
    pub fn is_empty(&self) -> bool {
        self.public_handle_url.is_none()
            && self.phone.is_none()
            && self.birth_date_raw.is_none()
            && self.bio.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub peer_id: String,
    pub profile_url: String,
    pub display_name: String,
    #[serde(flatten)]
    pub profile: SubscriberProfile,
}

impl Subscriber {
    /// Minimal record as seen in the member list.
    pub fn new(peer_id: String, profile_url: String, display_name: String) -> Self {
        Self {
            peer_id,
            profile_url,
            display_name,
            profile: SubscriberProfile::default(),
        }
    }

    /// Second phase: attach what the profile page revealed. Identity fields are untouched.
    pub fn enrich(&mut self, profile: SubscriberProfile) {
        self.profile = profile;
    }

    pub fn is_enriched(&self) -> bool {
        !self.profile.is_empty()
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.peer_id == other.peer_id
    }
}

impl Eq for Subscriber {}

impl Identified for Subscriber {
    type Key = String;

    fn identity(&self) -> String {
        self.peer_id.clone()
    }
}
