//! Feed prefetching

use crate::Result;
use async_trait::async_trait;
use reel_common::FeedPage;

/// Supplies further feed pages
#[async_trait]
pub trait FeedLoader: Send + Sync {
    async fn load_more(&self) -> Result<FeedPage>;
}

/// True when the loader should be asked for more items
///
/// `remaining` counts the items after the active one.
pub fn should_prefetch(remaining: usize, threshold: usize, has_more: bool, loading: bool) -> bool {
    has_more && !loading && remaining < threshold
}
