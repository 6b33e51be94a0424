//! Reel Media Coordinator (reel-mc) - Main entry point
//!
//! Drives a `MediaCoordinator` over a feed file with simulated media
//! backends, replaying a script of user input and printing JSON snapshots
//! of the session, navigation and resource pool.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reel_common::config::{resolve_settings, ProfileTier, SettingsOverrides};
use reel_common::{FadeCurve, ItemId};
use reel_mc::navigation::{NavKey, NavigationSnapshot, PointerSample};
use reel_mc::resources::{
    DeviceCapabilities, LayoutKind, NetworkClass, Priority, RegisterOptions, ResourceInfo,
    ResourceStats, VisibilitySubscription,
};
use reel_mc::session::{PlayOptions, SessionSnapshot};
use reel_mc::sim::{QueuedFeedLoader, SimAudioBackend, SimFeed, SimVideoElement};
use reel_mc::MediaCoordinator;
use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for reel-mc
#[derive(Parser, Debug)]
#[command(name = "reel-mc")]
#[command(about = "Feed media coordination engine driven by simulated backends")]
#[command(version)]
struct Args {
    /// Feed JSON: an item array or {"pages": [...]}
    feed: PathBuf,

    /// Input script (JSON array of steps); a short default walk otherwise
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Settings file (TOML); <config dir>/reel/config.toml when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force a performance tier (performance, balanced, quality)
    #[arg(long)]
    profile_tier: Option<String>,

    /// Resource pool bound
    #[arg(long)]
    memory_threshold: Option<usize>,

    /// Remaining-item count that triggers a prefetch
    #[arg(long)]
    prefetch_threshold: Option<usize>,

    /// Auto-pause window for non-looping audio (ms)
    #[arg(long)]
    auto_pause_window_ms: Option<u64>,

    /// Volume ramp shape (linear, exponential, logarithmic, s_curve, equal_power)
    #[arg(long)]
    fade_curve: Option<String>,

    /// Network class reported to profile detection
    #[arg(long, default_value = "unknown")]
    network: String,

    /// Allow unmuted video autoplay (as after a user gesture)
    #[arg(long)]
    allow_unmuted: bool,

    /// Simulated audio start latency (ms)
    #[arg(long, default_value = "40")]
    start_delay_ms: u64,

    /// Simulated loader latency (ms)
    #[arg(long, default_value = "300")]
    loader_latency_ms: u64,
}

/// One scripted input step
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Navigate { index: usize },
    /// Key name as a browser reports it (`ArrowDown`, `j`, `End`, ...)
    Key { key: String },
    Wheel { delta: f64, at_ms: f64 },
    Swipe { from: f64, to: f64, duration_ms: f64 },
    Wait { ms: u64 },
    Play {
        locator: String,
        item: Option<ItemId>,
        #[serde(default)]
        looping: bool,
    },
    Pause,
    Resume,
    Stop,
    Volume { level: f32 },
    Unlock,
    Tier { tier: ProfileTier },
    Sweep,
    Snapshot,
}

fn default_script() -> Vec<Step> {
    vec![
        Step::Snapshot,
        Step::Key { key: "ArrowDown".to_string() },
        Step::Wait { ms: 400 },
        Step::Swipe { from: 0.0, to: 90.0, duration_ms: 250.0 },
        Step::Wait { ms: 400 },
        Step::Snapshot,
        Step::Key { key: "ArrowUp".to_string() },
        Step::Wait { ms: 1000 },
        Step::Sweep,
        Step::Snapshot,
    ]
}

#[derive(Debug, Serialize)]
struct Snapshot {
    navigation: NavigationSnapshot,
    session: SessionSnapshot,
    resources: ResourceStats,
    descriptors: Vec<ResourceInfo>,
}

/// Registers simulated video elements for every loaded item
struct VideoRegistry {
    allow_unmuted: bool,
    registered: HashSet<ItemId>,
    subscriptions: Vec<VisibilitySubscription>,
}

impl VideoRegistry {
    async fn sync(&mut self, coordinator: &MediaCoordinator) {
        let navigator = coordinator.navigator();
        let active = navigator.active_index().await;
        let count = navigator.len().await;

        for index in 0..count {
            let Some(item) = navigator.item(index).await else {
                continue;
            };
            if !self.registered.insert(item.id.clone()) {
                continue;
            }
            for (n, video) in item.videos().enumerate() {
                let element = Arc::new(SimVideoElement::new(
                    format!("{}:{}", item.id, video.id),
                    self.allow_unmuted,
                ));
                let distance = index.abs_diff(active);
                let options = RegisterOptions::new(item.id.clone(), video.id.clone())
                    .priority(if n == 0 { Priority::High } else { Priority::Low })
                    .layout(LayoutKind::Feed)
                    .active(distance == 0)
                    .visible(distance <= coordinator.settings().visibility_window);
                let subscription = coordinator.resources().register(element, options).await;
                self.subscriptions.push(subscription);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let overrides = SettingsOverrides {
        profile_tier: match args.profile_tier.as_deref() {
            Some(raw) => Some(
                ProfileTier::parse(raw).with_context(|| format!("Unknown profile tier: {}", raw))?,
            ),
            None => None,
        },
        memory_threshold: args.memory_threshold,
        prefetch_threshold: args.prefetch_threshold,
        auto_pause_window_ms: args.auto_pause_window_ms,
    };
    let mut settings = resolve_settings(args.config.as_deref(), &overrides)
        .context("Failed to resolve settings")?;
    if let Some(raw) = args.fade_curve.as_deref() {
        settings.fade_curve =
            FadeCurve::parse(raw).with_context(|| format!("Unknown fade curve: {}", raw))?;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_directive(&settings.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reel-mc with feed {}", args.feed.display());

    let feed_json = std::fs::read_to_string(&args.feed)
        .with_context(|| format!("Failed to read feed {}", args.feed.display()))?;
    let (first_page, later_pages) = SimFeed::from_json(&feed_json)
        .context("Failed to parse feed")?
        .split();

    let steps: Vec<Step> = match &args.script {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            serde_json::from_str(&raw).context("Failed to parse script")?
        }
        None => default_script(),
    };

    let audio = Arc::new(SimAudioBackend::new(Duration::from_millis(args.start_delay_ms)));
    let loader = Arc::new(QueuedFeedLoader::new(
        later_pages,
        Duration::from_millis(args.loader_latency_ms),
    ));
    let capabilities = DeviceCapabilities::detect().with_network(NetworkClass::parse(&args.network));

    let coordinator = MediaCoordinator::new(settings, audio, loader, capabilities)
        .context("Failed to initialize media coordinator")?;
    coordinator.start().await;

    let mut registry = VideoRegistry {
        allow_unmuted: args.allow_unmuted,
        registered: HashSet::new(),
        subscriptions: Vec::new(),
    };
    // Register before focusing so the first item autoplays
    coordinator.navigator().set_items(first_page.items, first_page.has_more).await;
    registry.sync(&coordinator).await;
    coordinator.navigator().sync_active().await;

    tokio::select! {
        result = run_script(&coordinator, &mut registry, steps) => result?,
        _ = shutdown_signal() => {}
    }

    coordinator.shutdown().await;
    drop(registry);
    info!("reel-mc finished");
    Ok(())
}

/// Build an EnvFilter directive from a configured level
fn log_directive(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("reel_mc={level},reel_common={level}")
    }
}

async fn run_script(
    coordinator: &MediaCoordinator,
    registry: &mut VideoRegistry,
    steps: Vec<Step>,
) -> Result<()> {
    let navigator = coordinator.navigator();
    let session = coordinator.session();
    let mut pointer_clock = 0.0;

    for step in steps {
        match step {
            Step::Navigate { index } => {
                navigator.navigate_to(index).await;
            }
            Step::Key { key } => match NavKey::parse(&key) {
                Some(key) => {
                    navigator.on_key(key).await;
                }
                None => warn!("Ignoring unknown key {:?}", key),
            },
            Step::Wheel { delta, at_ms } => {
                navigator.on_wheel(delta, at_ms).await;
            }
            Step::Swipe { from, to, duration_ms } => {
                pointer_clock += 1000.0;
                let mid = from + (to - from) / 2.0;
                navigator.on_gesture_start(PointerSample::new(from, pointer_clock)).await;
                navigator
                    .on_gesture_move(PointerSample::new(mid, pointer_clock + duration_ms / 2.0))
                    .await;
                pointer_clock += duration_ms;
                navigator.on_gesture_end(PointerSample::new(to, pointer_clock)).await;
            }
            Step::Wait { ms } => {
                time::sleep(Duration::from_millis(ms)).await;
            }
            Step::Play { locator, item, looping } => {
                let options = PlayOptions {
                    affinity: item,
                    looping,
                    ..PlayOptions::default()
                };
                if !session.play(&locator, options).await {
                    warn!("Scripted play of {} did not start", locator);
                }
            }
            Step::Pause => {
                session.pause().await;
            }
            Step::Resume => {
                session.resume().await;
            }
            Step::Stop => session.stop().await,
            Step::Volume { level } => session.set_volume(level).await,
            Step::Unlock => {
                session.activate_audio_context().await;
            }
            Step::Tier { tier } => coordinator.resources().set_performance_mode(tier).await,
            Step::Sweep => {
                coordinator.resources().sweep().await;
            }
            Step::Snapshot => {
                let snapshot = Snapshot {
                    navigation: navigator.snapshot().await,
                    session: session.state().await,
                    resources: coordinator.resources().stats().await,
                    descriptors: coordinator.resources().snapshot().await,
                };
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        }
        // Pages appended by the loader get elements too
        registry.sync(coordinator).await;
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
