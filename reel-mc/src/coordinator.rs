//! Media coordinator
//!
//! Builds one session controller, resource manager and feed navigator that
//! share an event bus, and owns the periodic resource sweep. Each
//! coordinator is self-contained; several can run in one process.

use crate::media::AudioBackend;
use crate::navigation::{FeedLoader, FeedNavigator, NavigatorSettings};
use crate::resources::{DeviceCapabilities, PerformanceProfile, ResourceManager};
use crate::session::{SessionController, SessionSettings};
use crate::timer::TimerHandle;
use crate::Result;
use reel_common::config::EngineSettings;
use reel_common::events::{EventBus, MediaEvent, StopReason};
use reel_common::{time::now, FeedPage};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

/// One feed's media coordination engine
pub struct MediaCoordinator {
    settings: EngineSettings,
    events: EventBus,
    session: Arc<SessionController>,
    resources: ResourceManager,
    navigator: FeedNavigator,
    sweeper: Mutex<Option<TimerHandle>>,
}

impl MediaCoordinator {
    /// Build a coordinator; the tier comes from `settings` when forced,
    /// otherwise from `capabilities`
    pub fn new(
        settings: EngineSettings,
        audio: Arc<dyn AudioBackend>,
        loader: Arc<dyn FeedLoader>,
        capabilities: DeviceCapabilities,
    ) -> Result<Self> {
        settings.validate()?;

        let events = EventBus::new(settings.event_capacity);
        let profile = match settings.profile_tier {
            Some(tier) => PerformanceProfile::for_tier(tier),
            None => PerformanceProfile::from_capabilities(&capabilities),
        };

        let session = Arc::new(SessionController::new(
            audio,
            SessionSettings::from(&settings),
            events.clone(),
        ));
        let resources = ResourceManager::new(
            profile,
            settings.memory_threshold,
            settings.idle_eviction(),
            events.clone(),
        );
        let navigator = FeedNavigator::new(
            session.clone(),
            resources.clone(),
            loader,
            NavigatorSettings::from(&settings),
            events.clone(),
        );

        Ok(Self {
            settings,
            events,
            session,
            resources,
            navigator,
            sweeper: Mutex::new(None),
        })
    }

    /// Start the periodic sweep and announce the profile
    pub async fn start(&self) {
        let profile = self.resources.profile().await;
        info!(
            "Media coordinator started: tier={}, threshold={}, sweep every {:?}",
            profile.tier,
            profile.threshold,
            self.settings.sweep_interval()
        );
        self.events.emit_lossy(MediaEvent::ProfileChanged {
            tier: profile.tier,
            threshold: profile.threshold,
            timestamp: now(),
        });

        let resources = self.resources.clone();
        let timer = TimerHandle::every(self.settings.sweep_interval(), move || {
            let resources = resources.clone();
            async move {
                resources.sweep().await;
            }
        });
        if let Some(mut previous) = self.sweeper.lock().await.replace(timer) {
            previous.cancel();
        }
    }

    /// Load a first page and focus its first item
    pub async fn load_feed(&self, page: FeedPage) -> bool {
        self.navigator.set_items(page.items, page.has_more).await;
        self.navigator.sync_active().await
    }

    /// Stop audio, cancel timers and release every descriptor
    pub async fn shutdown(&self) {
        if let Some(mut timer) = self.sweeper.lock().await.take() {
            timer.cancel();
        }
        self.navigator.shutdown().await;
        self.session.stop_with(StopReason::Shutdown).await;
        let released = self.resources.clear().await;
        info!("Media coordinator shut down ({} descriptors released)", released);
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn navigator(&self) -> &FeedNavigator {
        &self.navigator
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }

    pub async fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .await
            .as_ref()
            .map(|t| t.is_pending())
            .unwrap_or(false)
    }
}
