//! Counting feed loader

use async_trait::async_trait;
use reel_common::FeedPage;
use reel_mc::navigation::FeedLoader;
use reel_mc::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;

/// Loader answering from a queue of results; an empty queue is an error
pub struct MockFeedLoader {
    calls: AtomicUsize,
    latency: Duration,
    results: Mutex<VecDeque<std::result::Result<FeedPage, String>>>,
}

impl MockFeedLoader {
    pub fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            latency,
            results: Mutex::new(VecDeque::new()),
        })
    }

    pub fn push_page(&self, page: FeedPage) {
        self.results.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self, message: &str) {
        self.results.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedLoader for MockFeedLoader {
    async fn load_more(&self) -> Result<FeedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        time::sleep(self.latency).await;
        let next = self.results.lock().unwrap().pop_front();
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(Error::Loader(message)),
            None => Err(Error::Loader("nothing queued".to_string())),
        }
    }
}
