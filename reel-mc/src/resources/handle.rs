//! Video resource descriptors

use crate::media::{PreloadHint, VideoElement};
use reel_common::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::time::Instant;

/// Composite descriptor key: (feed item, media option)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub item_id: ItemId,
    pub option_id: String,
}

impl ResourceKey {
    pub fn new(item_id: impl Into<ItemId>, option_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            option_id: option_id.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.item_id, self.option_id)
    }
}

/// Resource priority tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Row in the autoplay table
    pub fn rank(&self) -> usize {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }
}

/// Where the resource is laid out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Full-height feed card
    #[default]
    Feed,
    /// Thumbnail grid cell
    Grid,
    /// Expanded overlay
    Modal,
}

/// Descriptor lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// Registered, never activated
    #[default]
    Registered,
    /// Playback attempted (possibly muted)
    Active,
    /// Paused after having been active
    Inactive,
}

/// Options supplied with `ResourceManager::register`
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    pub item_id: ItemId,
    pub option_id: String,
    pub priority: Priority,
    pub layout: LayoutKind,
    pub is_active: bool,
    pub is_visible: bool,
}

impl RegisterOptions {
    pub fn new(item_id: impl Into<ItemId>, option_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            option_id: option_id.into(),
            priority: Priority::default(),
            layout: LayoutKind::default(),
            is_active: false,
            is_visible: false,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn layout(mut self, layout: LayoutKind) -> Self {
        self.layout = layout;
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn visible(mut self, is_visible: bool) -> Self {
        self.is_visible = is_visible;
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.item_id.clone(), self.option_id.clone())
    }
}

/// Live descriptor held by the manager
pub(crate) struct VideoHandle {
    pub key: ResourceKey,
    pub element: Arc<dyn VideoElement>,
    pub priority: Priority,
    pub layout: LayoutKind,
    pub is_active: bool,
    pub is_visible: bool,
    pub last_accessed_at: Instant,
    pub state: LoadState,
    /// Both unmuted and muted autoplay were rejected
    pub autoplay_blocked: bool,
    /// Registration-time policy applied successfully
    pub optimized: bool,
    /// Shared with the subscription handed to the presentation layer
    pub connected: Arc<AtomicBool>,
}

impl VideoHandle {
    pub fn info(&self) -> ResourceInfo {
        ResourceInfo {
            key: self.key.clone(),
            priority: self.priority,
            layout: self.layout,
            is_active: self.is_active,
            is_visible: self.is_visible,
            state: self.state,
            preload: self.element.preload(),
            autoplay_blocked: self.autoplay_blocked,
            optimized: self.optimized,
            idle_ms: self.last_accessed_at.elapsed().as_millis() as u64,
        }
    }

    /// Eligible for eviction before anything in focus
    pub fn is_idle_candidate(&self) -> bool {
        !self.is_active && !self.is_visible
    }
}

impl fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoHandle")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("is_active", &self.is_active)
            .field("is_visible", &self.is_visible)
            .finish()
    }
}

/// Read-only view of one descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub key: ResourceKey,
    pub priority: Priority,
    pub layout: LayoutKind,
    pub is_active: bool,
    pub is_visible: bool,
    pub state: LoadState,
    pub preload: PreloadHint,
    pub autoplay_blocked: bool,
    pub optimized: bool,
    /// Milliseconds since last access
    pub idle_ms: u64,
}
