//! Feed item builders

use reel_common::feed::{AudioTrack, FeedItem, FeedPage, MediaKind, MediaOption};
use reel_common::ItemId;

fn video_option(id: &str, n: usize) -> MediaOption {
    MediaOption {
        id: format!("v{}", n),
        kind: MediaKind::Video,
        url: format!("https://cdn.test/{}/v{}.mp4", id, n),
        thumbnail: None,
    }
}

/// Item with one video and a non-looping audio track `<id>.mp3`
pub fn audio_item(id: &str) -> FeedItem {
    FeedItem {
        id: ItemId::new(id),
        media: vec![video_option(id, 0)],
        audio: Some(AudioTrack {
            url: format!("{}.mp3", id),
            looping: false,
        }),
    }
}

/// Item with one video and no audio
pub fn silent_item(id: &str) -> FeedItem {
    FeedItem {
        id: ItemId::new(id),
        media: vec![video_option(id, 0)],
        audio: None,
    }
}

/// `count` audio items named item-0, item-1, ...
pub fn video_feed(count: usize) -> Vec<FeedItem> {
    (0..count).map(|i| audio_item(&format!("item-{}", i))).collect()
}

pub fn page(items: Vec<FeedItem>, has_more: bool) -> FeedPage {
    FeedPage { items, has_more }
}
