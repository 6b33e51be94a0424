//! Feed navigation
//!
//! Owns the active index of the feed and turns input (swipes, wheel, keys,
//! direct requests) into committed transitions. Each committed transition
//! runs three effects in order:
//!
//! 1. **Audio affinity switch**: items without audio stop the session at
//!    once; otherwise `play` is scheduled after a short settle delay and
//!    skipped if the user has already moved on
//! 2. **Focus window**: the active item and its neighbours are pushed to the
//!    resource manager as active/visible flags
//! 3. **Prefetch**: near the end of the loaded items the feed loader is
//!    asked for one more page
//!
//! A transition is rejected while another is being applied and for a short
//! debounce window after it.

mod gesture;
mod input;
mod prefetch;

pub use gesture::{classify_swipe, GestureTracker, PointerSample, SwipeDecision, SwipeMetrics, SwipeThresholds};
pub use input::{NavKey, NavStep, WheelAccumulator, WHEEL_RESET_GAP_MS, WHEEL_STEP_THRESHOLD};
pub use prefetch::{should_prefetch, FeedLoader};

use crate::resources::ResourceManager;
use crate::session::{PlayOptions, SessionController};
use crate::timer::TimerHandle;
use crate::Result;
use reel_common::config::EngineSettings;
use reel_common::events::{EventBus, MediaEvent};
use reel_common::{time::now, FeedItem, FeedPage, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Navigation tuning derived from `EngineSettings`
#[derive(Debug, Clone)]
pub struct NavigatorSettings {
    pub debounce: Duration,
    pub settle_delay: Duration,
    pub visibility_window: usize,
    pub prefetch_threshold: usize,
    pub swipe: SwipeThresholds,
}

impl From<&EngineSettings> for NavigatorSettings {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            debounce: settings.debounce(),
            settle_delay: settings.settle_delay(),
            visibility_window: settings.visibility_window,
            prefetch_threshold: settings.prefetch_threshold,
            swipe: SwipeThresholds::default(),
        }
    }
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

/// Navigation state as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    pub active_index: usize,
    pub item_count: usize,
    pub active_item: Option<ItemId>,
    pub has_more: bool,
    pub is_loading_more: bool,
}

struct NavState {
    items: Vec<FeedItem>,
    active_index: usize,
    has_more: bool,
    is_loading_more: bool,
    /// Effects of a committed transition are still being applied
    in_flight: bool,
    /// Debounce: transitions rejected until this instant
    locked_until: Option<Instant>,
    gesture: GestureTracker,
    wheel: WheelAccumulator,
    audio_switch: Option<TimerHandle>,
    load_task: Option<TimerHandle>,
}

struct Inner {
    state: Mutex<NavState>,
    session: Arc<SessionController>,
    resources: ResourceManager,
    loader: Arc<dyn FeedLoader>,
    settings: NavigatorSettings,
    events: EventBus,
}

/// Active-index owner for one feed
#[derive(Clone)]
pub struct FeedNavigator {
    inner: Arc<Inner>,
}

impl FeedNavigator {
    pub fn new(
        session: Arc<SessionController>,
        resources: ResourceManager,
        loader: Arc<dyn FeedLoader>,
        settings: NavigatorSettings,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(NavState {
                    items: Vec::new(),
                    active_index: 0,
                    has_more: true,
                    is_loading_more: false,
                    in_flight: false,
                    locked_until: None,
                    gesture: GestureTracker::new(),
                    wheel: WheelAccumulator::new(),
                    audio_switch: None,
                    load_task: None,
                }),
                session,
                resources,
                loader,
                settings,
                events,
            }),
        }
    }

    pub async fn active_index(&self) -> usize {
        self.inner.state.lock().await.active_index
    }

    pub async fn active_item(&self) -> Option<FeedItem> {
        let state = self.inner.state.lock().await;
        state.items.get(state.active_index).cloned()
    }

    pub async fn item(&self, index: usize) -> Option<FeedItem> {
        self.inner.state.lock().await.items.get(index).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.state.lock().await.items.is_empty()
    }

    pub async fn snapshot(&self) -> NavigationSnapshot {
        let state = self.inner.state.lock().await;
        NavigationSnapshot {
            active_index: state.active_index,
            item_count: state.items.len(),
            active_item: state.items.get(state.active_index).map(|i| i.id.clone()),
            has_more: state.has_more,
            is_loading_more: state.is_loading_more,
        }
    }

    /// Replace the loaded items; the first item becomes active
    ///
    /// Call `sync_active` afterwards to apply its effects.
    pub async fn set_items(&self, items: Vec<FeedItem>, has_more: bool) {
        let mut state = self.inner.state.lock().await;
        if let Some(mut timer) = state.audio_switch.take() {
            timer.cancel();
        }
        // A page requested for the previous items must not land on these
        if let Some(mut task) = state.load_task.take() {
            task.cancel();
        }
        state.is_loading_more = false;
        info!("Feed loaded with {} items (has_more={})", items.len(), has_more);
        state.items = items;
        state.active_index = 0;
        state.has_more = has_more;
        state.locked_until = None;
    }

    pub async fn append_items(&self, items: Vec<FeedItem>) -> usize {
        let mut state = self.inner.state.lock().await;
        let added = items.len();
        state.items.extend(items);
        added
    }

    /// Apply the effects of the current index without a transition
    pub async fn sync_active(&self) -> bool {
        let (index, item) = {
            let state = self.inner.state.lock().await;
            match state.items.get(state.active_index) {
                Some(item) => (state.active_index, item.clone()),
                None => return false,
            }
        };
        self.apply_effects(index, item).await;
        true
    }

    /// Commit a transition to `index`
    ///
    /// Returns `false` without side effects when a transition is in flight,
    /// inside the debounce window, out of bounds, or already active.
    pub async fn navigate_to(&self, index: usize) -> bool {
        let (old_index, item) = {
            let mut state = self.inner.state.lock().await;
            if state.in_flight {
                debug!("navigate_to({}) rejected: transition in flight", index);
                return false;
            }
            if state.locked_until.map(|until| Instant::now() < until).unwrap_or(false) {
                debug!("navigate_to({}) rejected: debounce window", index);
                return false;
            }
            let Some(item) = state.items.get(index).cloned() else {
                debug!("navigate_to({}) rejected: out of bounds ({} items)", index, state.items.len());
                return false;
            };
            if index == state.active_index {
                return false;
            }

            let old_index = state.active_index;
            state.active_index = index;
            state.in_flight = true;
            state.locked_until = Some(Instant::now() + self.inner.settings.debounce);
            (old_index, item)
        };

        info!("➡ Active item {} -> {} ({})", old_index, index, item.id);
        self.inner.events.emit_lossy(MediaEvent::ActiveIndexChanged {
            old_index,
            new_index: index,
            item_id: item.id.clone(),
            timestamp: now(),
        });

        // Effects run in their own task so a caller dropping this future
        // cannot leave the transition marked in flight
        let navigator = self.clone();
        let effects = tokio::spawn(async move {
            navigator.apply_effects(index, item).await;
            navigator.inner.state.lock().await.in_flight = false;
        });
        if let Err(e) = effects.await {
            warn!("Effects of transition to {} did not complete: {}", index, e);
            self.inner.state.lock().await.in_flight = false;
        }
        true
    }

    /// Move one step (or to either end)
    pub async fn step(&self, step: NavStep) -> bool {
        let target = {
            let state = self.inner.state.lock().await;
            let len = state.items.len();
            match step {
                NavStep::Forward => Some(state.active_index + 1).filter(|i| *i < len),
                NavStep::Backward => state.active_index.checked_sub(1),
                NavStep::First => Some(0).filter(|_| len > 0),
                NavStep::Last => len.checked_sub(1),
            }
        };
        match target {
            Some(index) => self.navigate_to(index).await,
            None => false,
        }
    }

    pub async fn on_gesture_start(&self, sample: PointerSample) {
        self.inner.state.lock().await.gesture.start(sample);
    }

    pub async fn on_gesture_move(&self, sample: PointerSample) {
        self.inner.state.lock().await.gesture.update(sample);
    }

    /// Finish a swipe; a positive classification navigates one step
    pub async fn on_gesture_end(&self, sample: PointerSample) -> SwipeDecision {
        let Some(metrics) = self.inner.state.lock().await.gesture.finish(sample) else {
            return SwipeDecision::None;
        };
        let decision = classify_swipe(metrics, &self.inner.settings.swipe);
        debug!(
            "Swipe: displacement={:.1}, duration={:.0}ms, velocity={:.2} -> {:?}",
            metrics.displacement, metrics.duration_ms, metrics.instantaneous_velocity, decision
        );

        match decision {
            SwipeDecision::Forward => {
                self.step(NavStep::Forward).await;
            }
            SwipeDecision::Backward => {
                self.step(NavStep::Backward).await;
            }
            SwipeDecision::None => {}
        }
        decision
    }

    /// Feed one wheel delta; navigates once enough delta accumulates
    pub async fn on_wheel(&self, delta: f64, timestamp_ms: f64) -> bool {
        let step = self.inner.state.lock().await.wheel.push(delta, timestamp_ms);
        match step {
            Some(step) => self.step(step).await,
            None => false,
        }
    }

    pub async fn on_key(&self, key: NavKey) -> bool {
        self.step(key.step()).await
    }

    /// Cancel pending audio switches and loads
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(mut timer) = state.audio_switch.take() {
            timer.cancel();
        }
        if let Some(mut task) = state.load_task.take() {
            task.cancel();
        }
        state.is_loading_more = false;
    }

    async fn apply_effects(&self, index: usize, item: FeedItem) {
        self.switch_audio(index, &item).await;
        self.apply_focus(index).await;
        self.maybe_prefetch().await;
    }

    async fn switch_audio(&self, index: usize, item: &FeedItem) {
        let Some(track) = item.audio.clone() else {
            self.cancel_audio_switch().await;
            self.inner.session.stop().await;
            return;
        };

        if self.inner.session.is_playing_affinity(&item.id).await {
            self.cancel_audio_switch().await;
            return;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let item_id = item.id.clone();
        let timer = TimerHandle::after(self.inner.settings.settle_delay, async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let still_active = {
                let state = inner.state.lock().await;
                state.active_index == index && state.items.get(index).map(|i| &i.id) == Some(&item_id)
            };
            if !still_active {
                debug!("Skipping audio switch to {}: active item moved on", item_id);
                return;
            }

            // Detached so a newer switch can cancel the wait without
            // aborting a start halfway through
            let session = inner.session.clone();
            tokio::spawn(async move {
                let options = PlayOptions::for_item(item_id).looping(track.looping);
                session.play(&track.url, options).await;
            });
        });

        if let Some(mut previous) = self.inner.state.lock().await.audio_switch.replace(timer) {
            previous.cancel();
        }
    }

    async fn cancel_audio_switch(&self) {
        if let Some(mut timer) = self.inner.state.lock().await.audio_switch.take() {
            timer.cancel();
        }
    }

    async fn apply_focus(&self, index: usize) {
        let focus: HashMap<ItemId, (bool, bool)> = {
            let state = self.inner.state.lock().await;
            let window = self.inner.settings.visibility_window;
            let last = state.items.len().saturating_sub(1);
            let first = index.saturating_sub(window);
            let end = index.saturating_add(window).min(last);
            state
                .items
                .iter()
                .enumerate()
                .take(end + 1)
                .skip(first)
                .map(|(i, item)| (item.id.clone(), (i == index, true)))
                .collect()
        };
        self.inner.resources.set_focus(&focus).await;
    }

    /// Ask the loader for another page when close to the end
    ///
    /// Returns `true` when a load was started.
    pub async fn maybe_prefetch(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        let remaining = state.items.len().saturating_sub(state.active_index + 1);
        if !should_prefetch(
            remaining,
            self.inner.settings.prefetch_threshold,
            state.has_more,
            state.is_loading_more,
        ) {
            return false;
        }

        state.is_loading_more = true;
        debug!("Prefetching: {} items remaining", remaining);
        self.inner.events.emit_lossy(MediaEvent::LoadMoreRequested {
            remaining,
            timestamp: now(),
        });

        // The task cannot settle before this lock is released
        let loader = self.inner.loader.clone();
        let weak = Arc::downgrade(&self.inner);
        state.load_task = Some(TimerHandle::spawn(async move {
            let result = loader.load_more().await;
            if let Some(inner) = weak.upgrade() {
                finish_load(&inner, result).await;
            }
        }));
        true
    }

    pub async fn has_more(&self) -> bool {
        self.inner.state.lock().await.has_more
    }

    pub async fn is_loading_more(&self) -> bool {
        self.inner.state.lock().await.is_loading_more
    }
}

async fn finish_load(inner: &Inner, result: Result<FeedPage>) {
    let mut state = inner.state.lock().await;
    state.is_loading_more = false;

    match result {
        Ok(page) => {
            let added = page.items.len();
            state.items.extend(page.items);
            state.has_more = page.has_more;
            info!("Loaded {} more items (has_more={})", added, page.has_more);
            inner.events.emit_lossy(MediaEvent::LoadMoreCompleted {
                added,
                has_more: page.has_more,
                success: true,
                timestamp: now(),
            });
        }
        Err(e) => {
            warn!("Feed loader failed: {}", e);
            inner.events.emit_lossy(MediaEvent::LoadMoreCompleted {
                added: 0,
                has_more: state.has_more,
                success: false,
                timestamp: now(),
            });
        }
    }
}
