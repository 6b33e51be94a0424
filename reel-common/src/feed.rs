//! Feed model
//!
//! Read-only view of the items supplied by the feed data loader. The
//! coordinator only ever reads `id`, media options and the audio track.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Feed item identifier
///
/// Feeds hand out numeric or string ids; both deserialize into the same
/// string-backed identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawItemId", into = "String")]
pub struct ItemId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItemId {
    Number(u64),
    Text(String),
}

impl From<RawItemId> for ItemId {
    fn from(raw: RawItemId) -> Self {
        match raw {
            RawItemId::Number(n) => ItemId(n.to_string()),
            RawItemId::Text(s) => ItemId(s),
        }
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId(n.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media option type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

/// One renderable media option of a feed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaOption {
    /// Option id, unique within its item
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Content locator (URL or path)
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl MediaOption {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

/// Optional audio track attached to a feed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub url: String,
    #[serde(default, rename = "loop")]
    pub looping: bool,
}

/// One unit of feed content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: ItemId,
    #[serde(default)]
    pub media: Vec<MediaOption>,
    #[serde(default)]
    pub audio: Option<AudioTrack>,
}

impl FeedItem {
    /// Video options in display order
    pub fn videos(&self) -> impl Iterator<Item = &MediaOption> {
        self.media.iter().filter(|m| m.is_video())
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// One page returned by the feed loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Whether the loader can supply further pages
    #[serde(default)]
    pub has_more: bool,
}

/// Parse a JSON array of feed items
pub fn parse_items(json: &str) -> crate::Result<Vec<FeedItem>> {
    Ok(serde_json::from_str(json)?)
}
