//! In-memory media elements

use async_trait::async_trait;
use reel_mc::media::{AudioBackend, AudioElement, PreloadHint, VideoElement};
use reel_mc::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time;

/// Audio backend that records every element it opens
#[derive(Default)]
pub struct MockAudioBackend {
    opened: Mutex<Vec<Arc<MockAudioElement>>>,
    delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashSet<String>>,
    unlock_fails: AtomicBool,
    unlock_calls: AtomicUsize,
}

impl MockAudioBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Delay every start of `locator`
    pub fn set_start_delay(&self, locator: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(locator.to_string(), delay);
    }

    /// Reject every start of `locator`
    pub fn set_failing(&self, locator: &str) {
        self.failing.lock().unwrap().insert(locator.to_string());
    }

    pub fn set_unlock_fails(&self, fails: bool) {
        self.unlock_fails.store(fails, Ordering::SeqCst);
    }

    pub fn unlock_calls(&self) -> usize {
        self.unlock_calls.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<Arc<MockAudioElement>> {
        self.opened.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    /// Most recent element opened for `locator`
    pub fn last(&self, locator: &str) -> Arc<MockAudioElement> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|e| e.locator == locator)
            .cloned()
            .unwrap_or_else(|| panic!("{} was never opened", locator))
    }

    /// Elements currently audible (started, not paused)
    pub fn playing_count(&self) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !AudioElement::is_paused(e.as_ref()))
            .count()
    }
}

#[async_trait]
impl AudioBackend for MockAudioBackend {
    async fn open(&self, locator: &str) -> Result<Arc<dyn AudioElement>> {
        let element = Arc::new(MockAudioElement {
            locator: locator.to_string(),
            start_delay: self.delays.lock().unwrap().get(locator).copied().unwrap_or_default(),
            fails: self.failing.lock().unwrap().contains(locator),
            state: Mutex::new(AudioState::default()),
        });
        self.opened.lock().unwrap().push(element.clone());
        Ok(element as Arc<dyn AudioElement>)
    }

    async fn unlock(&self) -> Result<()> {
        self.unlock_calls.fetch_add(1, Ordering::SeqCst);
        if self.unlock_fails.load(Ordering::SeqCst) {
            Err(Error::Autoplay("no user gesture".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug)]
struct AudioState {
    volume: f32,
    paused: bool,
    looping: bool,
    position: f64,
    released: bool,
    starts: usize,
}

impl Default for AudioState {
    fn default() -> Self {
        Self {
            volume: 1.0,
            paused: true,
            looping: false,
            position: 0.0,
            released: false,
            starts: 0,
        }
    }
}

pub struct MockAudioElement {
    pub locator: String,
    start_delay: Duration,
    fails: bool,
    state: Mutex<AudioState>,
}

impl MockAudioElement {
    pub fn released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub fn looping(&self) -> bool {
        self.state.lock().unwrap().looping
    }

    pub fn level(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    pub fn paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }
}

#[async_trait]
impl AudioElement for MockAudioElement {
    async fn start(&self) -> Result<()> {
        if !self.start_delay.is_zero() {
            time::sleep(self.start_delay).await;
        }
        if self.fails {
            return Err(Error::Media(format!("cannot decode {}", self.locator)));
        }
        let mut state = self.state.lock().unwrap();
        state.paused = false;
        state.starts += 1;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().unwrap().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().unwrap().looping = looping;
    }

    fn seek(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> Option<f64> {
        Some(60.0)
    }

    fn release(&self) {
        self.state.lock().unwrap().released = true;
    }
}

/// How a mock video element answers `play`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoBehavior {
    /// Every play succeeds
    #[default]
    AllowAll,
    /// Unmuted play is rejected, muted play succeeds
    MutedOnly,
    /// Every play is rejected
    BlockAll,
}

#[derive(Debug, Default)]
struct VideoState {
    playing: bool,
    muted: bool,
    preload: PreloadHint,
    play_calls: usize,
    pause_calls: usize,
    preload_history: Vec<PreloadHint>,
}

pub struct MockVideoElement {
    behavior: VideoBehavior,
    preload_fails: bool,
    play_delay: Duration,
    state: Mutex<VideoState>,
}

impl MockVideoElement {
    pub fn new(behavior: VideoBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            preload_fails: false,
            play_delay: Duration::ZERO,
            state: Mutex::new(VideoState::default()),
        })
    }

    pub fn allowing() -> Arc<Self> {
        Self::new(VideoBehavior::AllowAll)
    }

    /// Element whose preload hints are always rejected
    pub fn rejecting_hints() -> Arc<Self> {
        Arc::new(Self {
            behavior: VideoBehavior::AllowAll,
            preload_fails: true,
            play_delay: Duration::ZERO,
            state: Mutex::new(VideoState::default()),
        })
    }

    /// Element whose `play` takes `delay` to settle
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior: VideoBehavior::AllowAll,
            preload_fails: false,
            play_delay: delay,
            state: Mutex::new(VideoState::default()),
        })
    }

    pub fn playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn hint(&self) -> PreloadHint {
        self.state.lock().unwrap().preload
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().unwrap().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().unwrap().pause_calls
    }

    pub fn preload_history(&self) -> Vec<PreloadHint> {
        self.state.lock().unwrap().preload_history.clone()
    }
}

#[async_trait]
impl VideoElement for MockVideoElement {
    async fn play(&self) -> Result<()> {
        if !self.play_delay.is_zero() {
            time::sleep(self.play_delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.play_calls += 1;
        let allowed = match self.behavior {
            VideoBehavior::AllowAll => true,
            VideoBehavior::MutedOnly => state.muted,
            VideoBehavior::BlockAll => false,
        };
        if !allowed {
            return Err(Error::Autoplay("play() rejected".to_string()));
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        state.playing = false;
        state.pause_calls += 1;
    }

    fn is_paused(&self) -> bool {
        !self.state.lock().unwrap().playing
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    fn set_preload(&self, hint: PreloadHint) -> Result<()> {
        if self.preload_fails {
            return Err(Error::Media("element not attached".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.preload = hint;
        state.preload_history.push(hint);
        Ok(())
    }

    fn preload(&self) -> PreloadHint {
        self.state.lock().unwrap().preload
    }
}
