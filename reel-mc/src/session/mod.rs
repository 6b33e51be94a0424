//! Playback session controller
//!
//! Owns the single audio session of a coordinator and its fade transitions.
//!
//! **Session rules:**
//! - At most one live session exists; `play` tears the previous one down
//!   (timers cancelled, paused, volume 0, rewound, source released) before
//!   opening the next.
//! - `play` and `resume` run under one operation lock. Every `play` and
//!   `stop` bumps an epoch; a start that completes after a newer request
//!   discards its element and reports `false`. `stop` never queues behind a
//!   pending start.
//! - Media failures never escape: operations answer `false` and emit
//!   `AudioFailed`, so one unplayable track cannot stall feed navigation.

mod fade;
mod state;

pub use fade::FadeRamp;
pub use state::{FadePhase, PlayOptions, SessionSnapshot};

use crate::error::Error;
use crate::media::{AudioBackend, AudioElement};
use crate::timer::TimerHandle;
use reel_common::config::EngineSettings;
use reel_common::events::{EventBus, MediaEvent, StopReason};
use reel_common::{time::now, FadeCurve, ItemId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session tuning derived from `EngineSettings`
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub fade_in: Duration,
    pub fade_out: Duration,
    pub fade_steps: u32,
    pub fade_curve: FadeCurve,
    pub auto_pause_window: Duration,
    pub start_timeout: Duration,
    pub default_volume: f32,
}

impl From<&EngineSettings> for SessionSettings {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            fade_in: settings.fade_in(),
            fade_out: settings.fade_out(),
            fade_steps: settings.fade_steps,
            fade_curve: settings.fade_curve,
            auto_pause_window: settings.auto_pause_window(),
            start_timeout: settings.start_timeout(),
            default_volume: settings.default_volume,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

/// What happens when a fade finishes
#[derive(Debug, Clone, Copy)]
enum FadeEnd {
    /// Fade-in done; keep playing
    Hold,
    /// Fade-out done; pause and keep position/affinity
    Pause { automatic: bool },
}

/// The live audio session
struct LiveSession {
    id: Uuid,
    element: Arc<dyn AudioElement>,
    locator: String,
    affinity: Option<ItemId>,
    looping: bool,
    target_volume: f32,
    playing: bool,
    fade: FadePhase,
    fade_timer: Option<TimerHandle>,
    auto_pause_timer: Option<TimerHandle>,
}

impl LiveSession {
    fn cancel_timers(&mut self) {
        if let Some(mut timer) = self.fade_timer.take() {
            timer.cancel();
        }
        if let Some(mut timer) = self.auto_pause_timer.take() {
            timer.cancel();
        }
    }
}

type SessionSlot = Arc<Mutex<Option<LiveSession>>>;

/// Single-session audio controller
pub struct SessionController {
    backend: Arc<dyn AudioBackend>,
    settings: SessionSettings,
    events: EventBus,
    /// Serializes play/resume
    op_lock: Mutex<()>,
    /// Bumped by every play/stop request
    epoch: AtomicU64,
    live: SessionSlot,
    audio_unlocked: AtomicBool,
}

impl SessionController {
    pub fn new(backend: Arc<dyn AudioBackend>, settings: SessionSettings, events: EventBus) -> Self {
        Self {
            backend,
            settings,
            events,
            op_lock: Mutex::new(()),
            epoch: AtomicU64::new(0),
            live: Arc::new(Mutex::new(None)),
            audio_unlocked: AtomicBool::new(false),
        }
    }

    /// Start `locator` as the only audio session
    ///
    /// Returns `false` (with no session left behind) when the track cannot be
    /// opened or started, when the start times out, or when a newer
    /// `play`/`stop` superseded this call.
    pub async fn play(&self, locator: &str, options: PlayOptions) -> bool {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let _op = self.op_lock.lock().await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("play({}) superseded before it started", locator);
            return false;
        }

        self.teardown(StopReason::Superseded).await;

        let element = match self.backend.open(locator).await {
            Ok(element) => element,
            Err(e) => {
                self.report_failure(locator, &options, &e);
                return false;
            }
        };

        element.set_volume(0.0);
        element.set_looping(options.looping);
        if let Some(offset) = options.start_time.filter(|t| *t > 0.0) {
            element.seek(offset);
        }

        let started = match time::timeout(self.settings.start_timeout, element.start()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "start of {} exceeded {:?}",
                locator, self.settings.start_timeout
            ))),
        };

        if let Err(e) = started {
            discard(element.as_ref());
            self.report_failure(locator, &options, &e);
            return false;
        }

        let target = options
            .volume
            .unwrap_or(self.settings.default_volume)
            .clamp(0.0, 1.0);
        let id = Uuid::new_v4();

        // `stop` bumps the epoch before taking this lock, so checking under it
        // never installs a session a stop has already passed over
        let mut live = self.live.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Discarding superseded start of {}", locator);
            drop(live);
            discard(element.as_ref());
            return false;
        }
        let mut session = LiveSession {
            id,
            element: element.clone(),
            locator: locator.to_string(),
            affinity: options.affinity.clone(),
            looping: options.looping,
            target_volume: target,
            playing: true,
            fade: FadePhase::FadingIn,
            fade_timer: None,
            auto_pause_timer: None,
        };
        session.fade_timer = Some(self.spawn_fade(
            id,
            element,
            FadeRamp::new(0.0, target, self.settings.fade_in, self.settings.fade_steps, self.settings.fade_curve),
            FadeEnd::Hold,
        ));
        if !options.looping {
            session.auto_pause_timer = Some(self.spawn_auto_pause(id));
        }

        *live = Some(session);
        drop(live);

        info!(
            "🔊 Audio started: {} (affinity={:?}, loop={}, volume={:.2})",
            locator, options.affinity, options.looping, target
        );
        self.events.emit_lossy(MediaEvent::AudioStarted {
            locator: locator.to_string(),
            affinity: options.affinity,
            looping: options.looping,
            timestamp: now(),
        });
        true
    }

    /// Fade out and pause, keeping position and affinity
    ///
    /// Returns `false` when nothing is playing.
    pub async fn pause(&self) -> bool {
        let mut live = self.live.lock().await;
        let Some(session) = live.as_mut() else {
            return false;
        };
        if !session.playing || session.fade == FadePhase::FadingOut {
            return false;
        }

        if let Some(mut timer) = session.auto_pause_timer.take() {
            timer.cancel();
        }
        let from = session.element.volume();
        session.fade = FadePhase::FadingOut;
        session.fade_timer = Some(self.spawn_fade(
            session.id,
            session.element.clone(),
            FadeRamp::new(from, 0.0, self.settings.fade_out, self.settings.fade_steps, self.settings.fade_curve),
            FadeEnd::Pause { automatic: false },
        ));
        debug!("Pausing audio session {}", session.id);
        true
    }

    /// Resume a paused session (or abort an in-progress fade-out)
    pub async fn resume(&self) -> bool {
        let _op = self.op_lock.lock().await;

        let (id, element) = {
            let mut live = self.live.lock().await;
            let Some(session) = live.as_mut() else {
                return false;
            };

            if session.playing {
                if session.fade == FadePhase::FadingOut {
                    // Pause still fading; turn it around
                    let from = session.element.volume();
                    session.fade = FadePhase::FadingIn;
                    session.fade_timer = Some(self.spawn_fade(
                        session.id,
                        session.element.clone(),
                        FadeRamp::new(from, session.target_volume, self.settings.fade_in, self.settings.fade_steps, self.settings.fade_curve),
                        FadeEnd::Hold,
                    ));
                    if !session.looping {
                        session.auto_pause_timer = Some(self.spawn_auto_pause(session.id));
                    }
                }
                return true;
            }
            (session.id, session.element.clone())
        };

        let started = match time::timeout(self.settings.start_timeout, element.start()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("resume start".to_string())),
        };
        if let Err(e) = started {
            warn!("Failed to resume audio session {}: {}", id, e);
            return false;
        }

        let mut live = self.live.lock().await;
        let Some(session) = live.as_mut().filter(|s| s.id == id) else {
            element.pause();
            return false;
        };
        session.playing = true;
        session.fade = FadePhase::FadingIn;
        session.fade_timer = Some(self.spawn_fade(
            id,
            element.clone(),
            FadeRamp::new(element.volume(), session.target_volume, self.settings.fade_in, self.settings.fade_steps, self.settings.fade_curve),
            FadeEnd::Hold,
        ));
        if !session.looping {
            session.auto_pause_timer = Some(self.spawn_auto_pause(id));
        }

        self.events.emit_lossy(MediaEvent::AudioStarted {
            locator: session.locator.clone(),
            affinity: session.affinity.clone(),
            looping: session.looping,
            timestamp: now(),
        });
        true
    }

    /// Tear the session down completely; safe with no session active
    pub async fn stop(&self) {
        self.stop_with(StopReason::Stopped).await;
    }

    /// Does not wait for a pending start: the epoch bump makes that start
    /// discard its own element when it completes.
    pub(crate) async fn stop_with(&self, reason: StopReason) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.teardown(reason).await;
    }

    /// Set the session volume (clamped to 0.0..=1.0)
    ///
    /// An in-progress fade-in is cut short; during a fade-out only the target
    /// used by a later resume changes.
    pub async fn set_volume(&self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);

        let mut live = self.live.lock().await;
        let Some(session) = live.as_mut() else {
            return;
        };
        session.target_volume = volume;

        match session.fade {
            FadePhase::FadingIn => {
                if let Some(mut timer) = session.fade_timer.take() {
                    timer.cancel();
                }
                session.fade = FadePhase::Idle;
                session.element.set_volume(volume);
            }
            FadePhase::Idle if session.playing => session.element.set_volume(volume),
            _ => {}
        }
    }

    /// Unlock autoplay after a user gesture; success is cached
    pub async fn activate_audio_context(&self) -> bool {
        if self.audio_unlocked.load(Ordering::SeqCst) {
            return true;
        }
        match self.backend.unlock().await {
            Ok(()) => {
                self.audio_unlocked.store(true, Ordering::SeqCst);
                info!("Audio context unlocked");
                true
            }
            Err(e) => {
                warn!("Audio context unlock failed: {}", e);
                false
            }
        }
    }

    pub fn is_audio_unlocked(&self) -> bool {
        self.audio_unlocked.load(Ordering::SeqCst)
    }

    pub async fn current_affinity(&self) -> Option<ItemId> {
        self.live.lock().await.as_ref().and_then(|s| s.affinity.clone())
    }

    pub async fn is_playing_affinity(&self, affinity: &ItemId) -> bool {
        self.live
            .lock()
            .await
            .as_ref()
            .map(|s| s.playing && s.affinity.as_ref() == Some(affinity))
            .unwrap_or(false)
    }

    pub async fn is_playing_locator(&self, locator: &str) -> bool {
        self.live
            .lock()
            .await
            .as_ref()
            .map(|s| s.playing && s.locator == locator)
            .unwrap_or(false)
    }

    pub async fn state(&self) -> SessionSnapshot {
        match self.live.lock().await.as_ref() {
            Some(s) => SessionSnapshot {
                is_playing: s.playing,
                is_looping: s.looping,
                current_time: s.element.position(),
                duration: s.element.duration(),
                volume: s.element.volume(),
                affinity: s.affinity.clone(),
                locator: Some(s.locator.clone()),
                fade: s.fade,
            },
            None => SessionSnapshot::empty(),
        }
    }

    /// Remove the live session
    async fn teardown(&self, reason: StopReason) -> bool {
        let Some(mut session) = self.live.lock().await.take() else {
            return false;
        };

        session.cancel_timers();
        discard(session.element.as_ref());

        debug!("Audio session {} torn down ({:?})", session.id, reason);
        self.events.emit_lossy(MediaEvent::AudioStopped {
            affinity: session.affinity,
            reason,
            timestamp: now(),
        });
        true
    }

    fn report_failure(&self, locator: &str, options: &PlayOptions, error: &Error) {
        warn!("Audio playback failed for {}: {}", locator, error);
        self.events.emit_lossy(MediaEvent::AudioFailed {
            locator: locator.to_string(),
            affinity: options.affinity.clone(),
            error: error.to_string(),
            timestamp: now(),
        });
    }

    fn spawn_fade(
        &self,
        id: Uuid,
        element: Arc<dyn AudioElement>,
        ramp: FadeRamp,
        end: FadeEnd,
    ) -> TimerHandle {
        let live = self.live.clone();
        let events = self.events.clone();
        TimerHandle::spawn(async move {
            ramp.run(element.as_ref()).await;
            finish_fade(&live, &events, id, end).await;
        })
    }

    fn spawn_auto_pause(&self, id: Uuid) -> TimerHandle {
        let live = self.live.clone();
        let events = self.events.clone();
        let settings = self.settings.clone();
        TimerHandle::after(self.settings.auto_pause_window, async move {
            let mut guard = live.lock().await;
            let Some(session) = guard.as_mut().filter(|s| s.id == id) else {
                return;
            };
            if !session.playing || session.fade == FadePhase::FadingOut {
                return;
            }

            debug!("Auto-pause window elapsed for session {}", id);
            let ramp = FadeRamp::new(
                session.element.volume(),
                0.0,
                settings.fade_out,
                settings.fade_steps,
                settings.fade_curve,
            );
            let element = session.element.clone();
            let fade_live = live.clone();
            session.fade = FadePhase::FadingOut;
            session.fade_timer = Some(TimerHandle::spawn(async move {
                ramp.run(element.as_ref()).await;
                finish_fade(&fade_live, &events, id, FadeEnd::Pause { automatic: true }).await;
            }));
        })
    }
}

/// Settle the session state once a fade has run to completion
async fn finish_fade(live: &SessionSlot, events: &EventBus, id: Uuid, end: FadeEnd) {
    let mut guard = live.lock().await;
    let Some(session) = guard.as_mut().filter(|s| s.id == id) else {
        return;
    };
    session.fade = FadePhase::Idle;

    if let FadeEnd::Pause { automatic } = end {
        session.element.pause();
        session.playing = false;
        let position = session.element.position();
        debug!("Audio session {} paused at {:.2}s (automatic={})", id, position, automatic);
        events.emit_lossy(MediaEvent::AudioPaused {
            affinity: session.affinity.clone(),
            position,
            automatic,
            timestamp: now(),
        });
    }
}

/// Silence and release an element that is leaving service
fn discard(element: &dyn AudioElement) {
    element.pause();
    element.set_volume(0.0);
    element.seek(0.0);
    element.release();
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Timers hold their own handles to the slot; release the element here
        if let Ok(mut live) = self.live.try_lock() {
            if let Some(mut session) = live.take() {
                session.cancel_timers();
                discard(session.element.as_ref());
            }
        }
    }
}
