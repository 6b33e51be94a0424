//! Simulated media backends
//!
//! Logging implementations of the media and loader seams. The `reel-mc`
//! binary drives a coordinator with them so the coordination decisions can
//! be watched without a platform media stack.

use crate::media::{AudioBackend, AudioElement, PreloadHint, VideoElement};
use crate::navigation::FeedLoader;
use crate::{Error, Result};
use async_trait::async_trait;
use reel_common::feed::parse_items;
use reel_common::{FeedItem, FeedPage};
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Audio backend that "plays" by keeping time on the tokio clock
#[derive(Debug, Default)]
pub struct SimAudioBackend {
    start_delay: Duration,
    failing: HashSet<String>,
}

impl SimAudioBackend {
    pub fn new(start_delay: Duration) -> Self {
        Self {
            start_delay,
            failing: HashSet::new(),
        }
    }

    /// Make every start of `locator` fail
    pub fn with_failing(mut self, locator: impl Into<String>) -> Self {
        self.failing.insert(locator.into());
        self
    }
}

#[async_trait]
impl AudioBackend for SimAudioBackend {
    async fn open(&self, locator: &str) -> Result<Arc<dyn AudioElement>> {
        debug!("[sim] open audio {}", locator);
        Ok(Arc::new(SimAudioElement {
            locator: locator.to_string(),
            start_delay: self.start_delay,
            fails: self.failing.contains(locator),
            state: Mutex::new(SimAudioState::default()),
        }))
    }

    async fn unlock(&self) -> Result<()> {
        info!("[sim] audio context unlocked");
        Ok(())
    }
}

#[derive(Debug)]
struct SimAudioState {
    volume: f32,
    looping: bool,
    /// Offset at the last start/pause/seek
    base_position: f64,
    started_at: Option<Instant>,
    released: bool,
}

impl Default for SimAudioState {
    fn default() -> Self {
        Self {
            volume: 1.0,
            looping: false,
            base_position: 0.0,
            started_at: None,
            released: false,
        }
    }
}

impl SimAudioState {
    fn position(&self) -> f64 {
        match self.started_at {
            Some(at) => self.base_position + at.elapsed().as_secs_f64(),
            None => self.base_position,
        }
    }
}

/// Simulated audio element
#[derive(Debug)]
pub struct SimAudioElement {
    locator: String,
    start_delay: Duration,
    fails: bool,
    state: Mutex<SimAudioState>,
}

#[async_trait]
impl AudioElement for SimAudioElement {
    async fn start(&self) -> Result<()> {
        time::sleep(self.start_delay).await;
        if self.fails {
            return Err(Error::Media(format!("cannot decode {}", self.locator)));
        }
        let mut state = lock(&self.state);
        if state.released {
            return Err(Error::Media(format!("{} already released", self.locator)));
        }
        if state.started_at.is_none() {
            state.started_at = Some(Instant::now());
        }
        info!("[sim] ▶ audio {} at {:.2}s", self.locator, state.base_position);
        Ok(())
    }

    fn pause(&self) {
        let mut state = lock(&self.state);
        if state.started_at.is_some() {
            state.base_position = state.position();
            state.started_at = None;
            info!("[sim] ⏸ audio {} at {:.2}s", self.locator, state.base_position);
        }
    }

    fn is_paused(&self) -> bool {
        lock(&self.state).started_at.is_none()
    }

    fn set_volume(&self, volume: f32) {
        lock(&self.state).volume = volume;
    }

    fn volume(&self) -> f32 {
        lock(&self.state).volume
    }

    fn set_looping(&self, looping: bool) {
        lock(&self.state).looping = looping;
    }

    fn seek(&self, position: f64) {
        let mut state = lock(&self.state);
        state.base_position = position.max(0.0);
        if state.started_at.is_some() {
            state.started_at = Some(Instant::now());
        }
    }

    fn position(&self) -> f64 {
        lock(&self.state).position()
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn release(&self) {
        lock(&self.state).released = true;
        debug!("[sim] released audio {}", self.locator);
    }
}

/// Simulated video element
///
/// Rejects unmuted playback unless constructed with `allow_unmuted`, the way
/// platforms without a prior user gesture do.
#[derive(Debug)]
pub struct SimVideoElement {
    label: String,
    allow_unmuted: bool,
    state: Mutex<SimVideoState>,
}

#[derive(Debug, Default)]
struct SimVideoState {
    playing: bool,
    muted: bool,
    preload: PreloadHint,
}

impl SimVideoElement {
    pub fn new(label: impl Into<String>, allow_unmuted: bool) -> Self {
        Self {
            label: label.into(),
            allow_unmuted,
            state: Mutex::new(SimVideoState::default()),
        }
    }
}

#[async_trait]
impl VideoElement for SimVideoElement {
    async fn play(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.muted && !self.allow_unmuted {
            return Err(Error::Autoplay(format!("{} needs a user gesture", self.label)));
        }
        state.playing = true;
        info!("[sim] ▶ video {} (muted={})", self.label, state.muted);
        Ok(())
    }

    fn pause(&self) {
        let mut state = lock(&self.state);
        if state.playing {
            state.playing = false;
            info!("[sim] ⏸ video {}", self.label);
        }
    }

    fn is_paused(&self) -> bool {
        !lock(&self.state).playing
    }

    fn set_muted(&self, muted: bool) {
        lock(&self.state).muted = muted;
    }

    fn is_muted(&self) -> bool {
        lock(&self.state).muted
    }

    fn set_preload(&self, hint: PreloadHint) -> Result<()> {
        let mut state = lock(&self.state);
        if state.preload != hint {
            debug!("[sim] video {} preload {:?} -> {:?}", self.label, state.preload, hint);
            state.preload = hint;
        }
        Ok(())
    }

    fn preload(&self) -> PreloadHint {
        lock(&self.state).preload
    }
}

/// Feed file accepted by the binary
///
/// Either a bare item array (one page, nothing more to load) or
/// `{ "pages": [ { "items": [...], "has_more": true }, ... ] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SimFeed {
    Items(Vec<FeedItem>),
    Pages { pages: Vec<FeedPage> },
}

impl SimFeed {
    /// A bare item array or `{"pages": [...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim_start().starts_with('[') {
            return Ok(SimFeed::Items(parse_items(json)?));
        }
        serde_json::from_str(json).map_err(|e| Error::Common(e.into()))
    }

    /// First page plus the pages left for the loader
    pub fn split(self) -> (FeedPage, VecDeque<FeedPage>) {
        match self {
            SimFeed::Items(items) => (
                FeedPage {
                    items,
                    has_more: false,
                },
                VecDeque::new(),
            ),
            SimFeed::Pages { pages } => {
                let mut pages: VecDeque<FeedPage> = pages.into();
                let first = pages.pop_front().unwrap_or_default();
                (first, pages)
            }
        }
    }
}

/// Loader serving queued pages after a fixed latency
#[derive(Debug)]
pub struct QueuedFeedLoader {
    pages: Mutex<VecDeque<FeedPage>>,
    latency: Duration,
}

impl QueuedFeedLoader {
    pub fn new(pages: VecDeque<FeedPage>, latency: Duration) -> Self {
        Self {
            pages: Mutex::new(pages),
            latency,
        }
    }

    pub fn pending_pages(&self) -> usize {
        lock(&self.pages).len()
    }
}

#[async_trait]
impl FeedLoader for QueuedFeedLoader {
    async fn load_more(&self) -> Result<FeedPage> {
        time::sleep(self.latency).await;
        let page = lock(&self.pages).pop_front();
        match page {
            Some(page) => {
                info!("[sim] loader served {} items", page.items.len());
                Ok(page)
            }
            None => Err(Error::Loader("no more pages queued".to_string())),
        }
    }
}
