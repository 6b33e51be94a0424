//! Resource lifecycle manager
//!
//! Tracks the heavyweight video elements the presentation layer registers,
//! decides which may autoplay under the current performance profile, and
//! bounds how many stay live.
//!
//! **Lifecycle:**
//! - `register` stores a descriptor keyed by (item, option) and applies the
//!   preload/autoplay policy straight away
//! - Visibility and focus changes re-run `activate`/`deactivate`
//! - `sweep` evicts idle descriptors, then enough of the least recently used
//!   ones to get back under the profile threshold
//! - Eviction and `unregister` pause the element but never clear its source,
//!   so a later re-register resumes without reload
//!
//! The descriptor map lock is never held across `VideoElement::play`.

mod handle;
mod profile;
mod visibility;

pub use handle::{LayoutKind, LoadState, Priority, RegisterOptions, ResourceInfo, ResourceKey};
pub use profile::{AutoplayPolicy, DeviceCapabilities, NetworkClass, PerformanceProfile};
pub use visibility::VisibilitySubscription;

use crate::media::{PreloadHint, VideoElement};
use handle::VideoHandle;
use reel_common::config::ProfileTier;
use reel_common::events::{EventBus, MediaEvent};
use reel_common::{time::now, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Removed for exceeding the idle window
    pub idle_evicted: usize,
    /// Removed to get back under the threshold
    pub overflow_evicted: usize,
    /// Live descriptors afterwards
    pub remaining: usize,
}

impl SweepReport {
    pub fn total_evicted(&self) -> usize {
        self.idle_evicted + self.overflow_evicted
    }
}

/// Descriptor counts by priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Pool statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub total: usize,
    pub registered: usize,
    pub active: usize,
    pub inactive: usize,
    pub visible: usize,
    pub autoplay_blocked: usize,
    pub by_priority: PriorityCounts,
    pub tier: ProfileTier,
    pub threshold: usize,
    /// Lifetime registrations (re-registers included)
    pub registered_total: u64,
    /// Lifetime evictions by sweeps
    pub evicted_total: u64,
}

/// How a playback attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AutoplayOutcome {
    Unmuted,
    Muted,
    Blocked,
}

/// State shared between the manager and its subscriptions
#[derive(Debug)]
pub(crate) struct Shared {
    handles: RwLock<HashMap<ResourceKey, VideoHandle>>,
    profile: RwLock<PerformanceProfile>,
    /// Configured pool bound that survives tier changes
    threshold_override: Option<usize>,
    idle_window: Duration,
    events: EventBus,
    registered_total: AtomicU64,
    evicted_total: AtomicU64,
}

/// Video resource pool
#[derive(Debug, Clone)]
pub struct ResourceManager {
    shared: Arc<Shared>,
}

impl ResourceManager {
    /// Create a manager for `profile`
    ///
    /// `threshold_override` replaces the tier default bound, now and after
    /// any later `set_performance_mode`.
    pub fn new(
        profile: PerformanceProfile,
        threshold_override: Option<usize>,
        idle_window: Duration,
        events: EventBus,
    ) -> Self {
        let profile = match threshold_override {
            Some(threshold) => profile.with_threshold(threshold),
            None => profile,
        };
        info!(
            "Resource manager ready: tier={}, threshold={}",
            profile.tier, profile.threshold
        );
        Self {
            shared: Arc::new(Shared {
                handles: RwLock::new(HashMap::new()),
                profile: RwLock::new(profile),
                threshold_override,
                idle_window,
                events,
                registered_total: AtomicU64::new(0),
                evicted_total: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Register a video element and apply the current policy to it
    pub async fn register(
        &self,
        element: Arc<dyn VideoElement>,
        options: RegisterOptions,
    ) -> VisibilitySubscription {
        let key = options.key();
        let profile = *self.shared.profile.read().await;
        let autoplay = profile.should_autoplay(options.priority, options.is_visible, options.is_active);

        let hint = if autoplay {
            PreloadHint::Metadata
        } else {
            conservative_hint(profile.tier, options.priority)
        };
        let optimized = match element.set_preload(hint) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not optimize {}: {}", key, e);
                false
            }
        };

        let connected = Arc::new(AtomicBool::new(true));
        let handle = VideoHandle {
            key: key.clone(),
            element,
            priority: options.priority,
            layout: options.layout,
            is_active: options.is_active,
            is_visible: options.is_visible,
            last_accessed_at: Instant::now(),
            state: LoadState::Registered,
            autoplay_blocked: false,
            optimized,
            connected: connected.clone(),
        };

        if let Some(previous) = self.shared.handles.write().await.insert(key.clone(), handle) {
            debug!("Re-registered {}; previous subscription disconnected", key);
            previous.connected.store(false, Ordering::SeqCst);
        }
        self.shared.registered_total.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Registered {} (priority={:?}, layout={:?}, autoplay={})",
            key, options.priority, options.layout, autoplay
        );

        if autoplay {
            self.activate(&key).await;
        }

        VisibilitySubscription::new(key, Arc::downgrade(&self.shared), connected)
    }

    /// Apply a visibility transition
    ///
    /// Returns `true` when the descriptor is playing afterwards.
    pub async fn on_visibility_change(&self, key: &ResourceKey, visible: bool) -> bool {
        let changed = {
            let mut handles = self.shared.handles.write().await;
            let Some(handle) = handles.get_mut(key) else {
                return false;
            };
            handle.last_accessed_at = Instant::now();
            let changed = handle.is_visible != visible;
            handle.is_visible = visible;
            changed
        };

        if !changed {
            return self.is_playing(key).await;
        }
        if visible {
            self.activate(key).await
        } else {
            self.deactivate(key).await;
            false
        }
    }

    /// Play the element if policy allows, else fall back to a conservative hint
    ///
    /// Rejected playback is retried once muted; a second rejection marks the
    /// descriptor `autoplay_blocked` and leaves it inert. Returns `true` when
    /// the element is playing.
    pub async fn activate(&self, key: &ResourceKey) -> bool {
        let profile = *self.shared.profile.read().await;

        let (element, token) = {
            let mut handles = self.shared.handles.write().await;
            let Some(handle) = handles.get_mut(key) else {
                return false;
            };
            handle.last_accessed_at = Instant::now();

            if handle.autoplay_blocked {
                return false;
            }

            if !profile.should_autoplay(handle.priority, handle.is_visible, handle.is_active) {
                let hint = conservative_hint(profile.tier, handle.priority);
                if let Err(e) = handle.element.set_preload(hint) {
                    debug!("Preload hint {:?} rejected for {}: {}", hint, key, e);
                }
                if handle.state == LoadState::Active {
                    handle.element.pause();
                    handle.state = LoadState::Inactive;
                    self.emit_deactivated(key);
                }
                return false;
            }

            (handle.element.clone(), handle.connected.clone())
        };

        if let Err(e) = element.set_preload(PreloadHint::Auto) {
            debug!("Preload hint auto rejected for {}: {}", key, e);
        }
        let outcome = try_autoplay(element.as_ref(), key).await;

        let mut handles = self.shared.handles.write().await;
        let Some(handle) = handles
            .get_mut(key)
            .filter(|h| Arc::ptr_eq(&h.connected, &token))
        else {
            // Unregistered or replaced while play() was pending
            element.pause();
            return false;
        };

        match outcome {
            AutoplayOutcome::Unmuted | AutoplayOutcome::Muted => {
                handle.state = LoadState::Active;
                let muted = outcome == AutoplayOutcome::Muted;
                debug!("▶ Activated {} (muted={})", key, muted);
                self.shared.events.emit_lossy(MediaEvent::ResourceActivated {
                    item_id: key.item_id.clone(),
                    option_id: key.option_id.clone(),
                    autoplay: true,
                    muted,
                    timestamp: now(),
                });
                true
            }
            AutoplayOutcome::Blocked => {
                handle.autoplay_blocked = true;
                warn!("Autoplay blocked for {}", key);
                self.shared.events.emit_lossy(MediaEvent::AutoplayBlocked {
                    item_id: key.item_id.clone(),
                    option_id: key.option_id.clone(),
                    timestamp: now(),
                });
                false
            }
        }
    }

    /// Pause the element; drops the preload hint for performance/low
    pub async fn deactivate(&self, key: &ResourceKey) -> bool {
        let tier = self.shared.profile.read().await.tier;
        let mut handles = self.shared.handles.write().await;
        let Some(handle) = handles.get_mut(key) else {
            return false;
        };

        handle.element.pause();
        if tier == ProfileTier::Performance && handle.priority == Priority::Low {
            if let Err(e) = handle.element.set_preload(PreloadHint::None) {
                debug!("Preload hint none rejected for {}: {}", key, e);
            }
        }
        if handle.state == LoadState::Active {
            handle.state = LoadState::Inactive;
            self.emit_deactivated(key);
        }
        true
    }

    /// Assign focus flags per item; items missing from `focus` lose both
    ///
    /// Descriptors whose flags changed are re-activated or deactivated.
    pub async fn set_focus(&self, focus: &HashMap<ItemId, (bool, bool)>) {
        let changed: Vec<(ResourceKey, bool)> = {
            let mut handles = self.shared.handles.write().await;
            let mut changed = Vec::new();
            for handle in handles.values_mut() {
                let (is_active, is_visible) =
                    focus.get(&handle.key.item_id).copied().unwrap_or((false, false));
                if handle.is_active != is_active || handle.is_visible != is_visible {
                    handle.is_active = is_active;
                    handle.is_visible = is_visible;
                    handle.last_accessed_at = Instant::now();
                    changed.push((handle.key.clone(), is_active || is_visible));
                }
            }
            changed
        };

        for (key, in_focus) in changed {
            if in_focus {
                self.activate(&key).await;
            } else {
                self.deactivate(&key).await;
            }
        }
    }

    /// Remove a descriptor, pausing its element without clearing the source
    pub async fn unregister(&self, key: &ResourceKey) -> bool {
        let Some(handle) = self.shared.handles.write().await.remove(key) else {
            return false;
        };
        handle.connected.store(false, Ordering::SeqCst);
        handle.element.pause();
        debug!("Unregistered {}", key);
        true
    }

    /// Evict idle descriptors, then enforce the pool bound
    pub async fn sweep(&self) -> SweepReport {
        let threshold = self.shared.profile.read().await.threshold;
        let idle_window = self.shared.idle_window;

        let (evicted, idle_evicted, remaining) = {
            let mut handles = self.shared.handles.write().await;
            let now = Instant::now();

            let idle_keys: Vec<ResourceKey> = handles
                .values()
                .filter(|h| h.is_idle_candidate() && now.duration_since(h.last_accessed_at) > idle_window)
                .map(|h| h.key.clone())
                .collect();
            let mut evicted: Vec<VideoHandle> = idle_keys
                .iter()
                .filter_map(|key| handles.remove(key))
                .collect();
            let idle_evicted = evicted.len();

            if handles.len() > threshold {
                // Out of focus first, then visible-inactive, then anything
                let mut order: Vec<(u8, Instant, ResourceKey)> = handles
                    .values()
                    .map(|h| (eviction_rank(h), h.last_accessed_at, h.key.clone()))
                    .collect();
                order.sort();

                let excess = handles.len() - threshold;
                for (_, _, key) in order.into_iter().take(excess) {
                    if let Some(handle) = handles.remove(&key) {
                        evicted.push(handle);
                    }
                }
            }

            (evicted, idle_evicted, handles.len())
        };

        for handle in &evicted {
            handle.connected.store(false, Ordering::SeqCst);
            handle.element.pause();
        }

        let report = SweepReport {
            idle_evicted,
            overflow_evicted: evicted.len() - idle_evicted,
            remaining,
        };

        if report.total_evicted() > 0 {
            self.shared
                .evicted_total
                .fetch_add(report.total_evicted() as u64, Ordering::Relaxed);
            info!(
                "🧹 Sweep evicted {} idle + {} overflow, {} remaining (threshold {})",
                report.idle_evicted, report.overflow_evicted, report.remaining, threshold
            );
            self.shared.events.emit_lossy(MediaEvent::ResourcesEvicted {
                idle: report.idle_evicted,
                overflow: report.overflow_evicted,
                remaining: report.remaining,
                timestamp: now(),
            });
        } else {
            debug!("Sweep: nothing to evict ({} live)", remaining);
        }
        report
    }

    /// Override the detected tier and re-apply policy to every descriptor
    pub async fn set_performance_mode(&self, tier: ProfileTier) {
        let profile = {
            let mut profile = PerformanceProfile::for_tier(tier);
            if let Some(threshold) = self.shared.threshold_override {
                profile = profile.with_threshold(threshold);
            }
            *self.shared.profile.write().await = profile;
            profile
        };
        info!("Performance mode set to {} (threshold {})", profile.tier, profile.threshold);
        self.shared.events.emit_lossy(MediaEvent::ProfileChanged {
            tier: profile.tier,
            threshold: profile.threshold,
            timestamp: now(),
        });

        let keys: Vec<(ResourceKey, bool)> = self
            .shared
            .handles
            .read()
            .await
            .values()
            .map(|h| (h.key.clone(), h.is_active || h.is_visible))
            .collect();

        for (key, in_focus) in keys {
            if in_focus {
                self.activate(&key).await;
            } else {
                self.deactivate(&key).await;
            }
        }
    }

    pub async fn profile(&self) -> PerformanceProfile {
        *self.shared.profile.read().await
    }

    pub async fn stats(&self) -> ResourceStats {
        let profile = *self.shared.profile.read().await;
        let handles = self.shared.handles.read().await;

        let mut stats = ResourceStats {
            total: handles.len(),
            registered: 0,
            active: 0,
            inactive: 0,
            visible: 0,
            autoplay_blocked: 0,
            by_priority: PriorityCounts::default(),
            tier: profile.tier,
            threshold: profile.threshold,
            registered_total: self.shared.registered_total.load(Ordering::Relaxed),
            evicted_total: self.shared.evicted_total.load(Ordering::Relaxed),
        };

        for handle in handles.values() {
            match handle.state {
                LoadState::Registered => stats.registered += 1,
                LoadState::Active => stats.active += 1,
                LoadState::Inactive => stats.inactive += 1,
            }
            match handle.priority {
                Priority::Low => stats.by_priority.low += 1,
                Priority::Medium => stats.by_priority.medium += 1,
                Priority::High => stats.by_priority.high += 1,
            }
            if handle.is_visible {
                stats.visible += 1;
            }
            if handle.autoplay_blocked {
                stats.autoplay_blocked += 1;
            }
        }
        stats
    }

    pub async fn get(&self, key: &ResourceKey) -> Option<ResourceInfo> {
        self.shared.handles.read().await.get(key).map(|h| h.info())
    }

    /// All descriptors, ordered by key
    pub async fn snapshot(&self) -> Vec<ResourceInfo> {
        let mut infos: Vec<ResourceInfo> =
            self.shared.handles.read().await.values().map(|h| h.info()).collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    pub async fn len(&self) -> usize {
        self.shared.handles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shared.handles.read().await.is_empty()
    }

    /// Drop every descriptor (coordinator shutdown)
    pub async fn clear(&self) -> usize {
        let drained: Vec<VideoHandle> = self.shared.handles.write().await.drain().map(|(_, h)| h).collect();
        for handle in &drained {
            handle.connected.store(false, Ordering::SeqCst);
            handle.element.pause();
        }
        drained.len()
    }

    async fn is_playing(&self, key: &ResourceKey) -> bool {
        self.shared
            .handles
            .read()
            .await
            .get(key)
            .map(|h| h.state == LoadState::Active && !h.element.is_paused())
            .unwrap_or(false)
    }

    fn emit_deactivated(&self, key: &ResourceKey) {
        debug!("⏸ Deactivated {}", key);
        self.shared.events.emit_lossy(MediaEvent::ResourceDeactivated {
            item_id: key.item_id.clone(),
            option_id: key.option_id.clone(),
            timestamp: now(),
        });
    }
}

/// Preload hint for a descriptor that may not autoplay
fn conservative_hint(tier: ProfileTier, priority: Priority) -> PreloadHint {
    if tier == ProfileTier::Performance && priority == Priority::Low {
        PreloadHint::None
    } else {
        PreloadHint::Metadata
    }
}

/// Eviction order: lower goes first
fn eviction_rank(handle: &VideoHandle) -> u8 {
    match (handle.is_active, handle.is_visible) {
        (false, false) => 0,
        (false, true) => 1,
        _ => 2,
    }
}

/// Attempt playback, retrying once muted
async fn try_autoplay(element: &dyn VideoElement, key: &ResourceKey) -> AutoplayOutcome {
    match element.play().await {
        Ok(()) => AutoplayOutcome::Unmuted,
        Err(e) => {
            debug!("Unmuted play rejected for {}: {}; retrying muted", key, e);
            element.set_muted(true);
            match element.play().await {
                Ok(()) => AutoplayOutcome::Muted,
                Err(e) => {
                    debug!("Muted play rejected for {}: {}", key, e);
                    AutoplayOutcome::Blocked
                }
            }
        }
    }
}
