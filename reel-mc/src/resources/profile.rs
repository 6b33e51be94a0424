//! Device performance profile
//!
//! **Purpose:** Derive a pool bound and an autoplay policy from what the
//! device can afford. Capabilities are read once at startup; the resulting
//! tier can later be overridden manually.
//!
//! **Platform support:**
//! - Linux: memory from /proc/meminfo
//! - Other platforms: memory unknown (treated as mid-range)
//! - Logical cores via std on every platform

use super::handle::Priority;
use reel_common::config::ProfileTier;
use serde::{Deserialize, Serialize};

/// Network class as reported by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkClass {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[default]
    Unknown,
}

impl NetworkClass {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "slow-2g" => NetworkClass::Slow2g,
            "2g" => NetworkClass::TwoG,
            "3g" => NetworkClass::ThreeG,
            "4g" | "wifi" | "ethernet" => NetworkClass::FourG,
            _ => NetworkClass::Unknown,
        }
    }

    pub fn is_slow(&self) -> bool {
        matches!(self, NetworkClass::Slow2g | NetworkClass::TwoG)
    }
}

/// Read-only device capability signals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Approximate memory in GiB
    pub memory_gb: Option<f32>,
    /// Logical core count
    pub cpu_cores: Option<usize>,
    pub network: NetworkClass,
    /// User asked for reduced data usage
    pub save_data: bool,
}

impl DeviceCapabilities {
    /// Detect capabilities of the host
    pub fn detect() -> Self {
        Self {
            memory_gb: Self::detect_memory_gb(),
            cpu_cores: std::thread::available_parallelism().ok().map(|n| n.get()),
            network: NetworkClass::Unknown,
            save_data: false,
        }
    }

    pub fn with_network(mut self, network: NetworkClass) -> Self {
        self.network = network;
        self
    }

    pub fn with_save_data(mut self, save_data: bool) -> Self {
        self.save_data = save_data;
        self
    }

    fn detect_memory_gb() -> Option<f32> {
        #[cfg(target_os = "linux")]
        {
            if let Ok(content) = std::fs::read_to_string("/proc/meminfo") {
                return parse_meminfo_gb(&content);
            }
        }
        None
    }
}

/// Extract `MemTotal` from /proc/meminfo in GiB
fn parse_meminfo_gb(content: &str) -> Option<f32> {
    content
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb as f32 / (1024.0 * 1024.0))
}

/// Autoplay aggressiveness table
///
/// Indexed by priority and active-ness; invisible resources never autoplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoplayPolicy {
    /// `[priority][is_active]`
    table: [[bool; 2]; 3],
}

impl AutoplayPolicy {
    pub fn for_tier(tier: ProfileTier) -> Self {
        let table = match tier {
            // rows: low, medium, high; columns: inactive, active
            ProfileTier::Performance => [[false, false], [false, true], [false, true]],
            ProfileTier::Balanced => [[false, true], [false, true], [true, true]],
            ProfileTier::Quality => [[false, true], [true, true], [true, true]],
        };
        Self { table }
    }

    pub fn should_autoplay(&self, priority: Priority, is_visible: bool, is_active: bool) -> bool {
        is_visible && self.table[priority.rank()][usize::from(is_active)]
    }
}

/// Pool bound plus autoplay policy for one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub tier: ProfileTier,
    /// Maximum live descriptors after a sweep
    pub threshold: usize,
    pub policy: AutoplayPolicy,
}

impl PerformanceProfile {
    pub fn for_tier(tier: ProfileTier) -> Self {
        Self {
            tier,
            threshold: Self::default_threshold(tier),
            policy: AutoplayPolicy::for_tier(tier),
        }
    }

    pub fn default_threshold(tier: ProfileTier) -> usize {
        match tier {
            ProfileTier::Performance => 3,
            ProfileTier::Balanced => 6,
            ProfileTier::Quality => 10,
        }
    }

    /// Map device signals to a tier
    pub fn from_capabilities(caps: &DeviceCapabilities) -> Self {
        Self::for_tier(Self::classify(caps))
    }

    pub fn classify(caps: &DeviceCapabilities) -> ProfileTier {
        let low_memory = caps.memory_gb.map(|gb| gb <= 2.0).unwrap_or(false);
        let few_cores = caps.cpu_cores.map(|n| n <= 2).unwrap_or(false);

        if low_memory || few_cores || caps.network.is_slow() || caps.save_data {
            return ProfileTier::Performance;
        }

        let high_memory = caps.memory_gb.map(|gb| gb >= 8.0).unwrap_or(false);
        let many_cores = caps.cpu_cores.map(|n| n >= 8).unwrap_or(false);
        let fast_network = matches!(caps.network, NetworkClass::FourG | NetworkClass::Unknown);

        if high_memory && many_cores && fast_network {
            ProfileTier::Quality
        } else {
            ProfileTier::Balanced
        }
    }

    /// Replace the tier default bound
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    pub fn should_autoplay(&self, priority: Priority, is_visible: bool, is_active: bool) -> bool {
        self.policy.should_autoplay(priority, is_visible, is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(memory_gb: f32, cores: usize, network: NetworkClass) -> DeviceCapabilities {
        DeviceCapabilities {
            memory_gb: Some(memory_gb),
            cpu_cores: Some(cores),
            network,
            save_data: false,
        }
    }

    #[test]
    fn test_performance_low_visible_inactive_never_autoplays() {
        let profile = PerformanceProfile::for_tier(ProfileTier::Performance);
        assert!(!profile.should_autoplay(Priority::Low, true, false));
    }

    #[test]
    fn test_invisible_never_autoplays() {
        for tier in [ProfileTier::Performance, ProfileTier::Balanced, ProfileTier::Quality] {
            let profile = PerformanceProfile::for_tier(tier);
            for priority in [Priority::Low, Priority::Medium, Priority::High] {
                assert!(!profile.should_autoplay(priority, false, true));
                assert!(!profile.should_autoplay(priority, false, false));
            }
        }
    }

    #[test]
    fn test_policy_table_rows() {
        let perf = AutoplayPolicy::for_tier(ProfileTier::Performance);
        assert!(!perf.should_autoplay(Priority::Low, true, true));
        assert!(perf.should_autoplay(Priority::Medium, true, true));
        assert!(!perf.should_autoplay(Priority::High, true, false));

        let balanced = AutoplayPolicy::for_tier(ProfileTier::Balanced);
        assert!(balanced.should_autoplay(Priority::Low, true, true));
        assert!(!balanced.should_autoplay(Priority::Medium, true, false));
        assert!(balanced.should_autoplay(Priority::High, true, false));

        let quality = AutoplayPolicy::for_tier(ProfileTier::Quality);
        assert!(!quality.should_autoplay(Priority::Low, true, false));
        assert!(quality.should_autoplay(Priority::Medium, true, false));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            PerformanceProfile::classify(&caps(1.5, 8, NetworkClass::FourG)),
            ProfileTier::Performance
        );
        assert_eq!(
            PerformanceProfile::classify(&caps(16.0, 2, NetworkClass::FourG)),
            ProfileTier::Performance
        );
        assert_eq!(
            PerformanceProfile::classify(&caps(16.0, 12, NetworkClass::TwoG)),
            ProfileTier::Performance
        );
        assert_eq!(
            PerformanceProfile::classify(&caps(4.0, 4, NetworkClass::ThreeG)),
            ProfileTier::Balanced
        );
        assert_eq!(
            PerformanceProfile::classify(&caps(16.0, 8, NetworkClass::ThreeG)),
            ProfileTier::Balanced
        );
        assert_eq!(
            PerformanceProfile::classify(&caps(16.0, 8, NetworkClass::Unknown)),
            ProfileTier::Quality
        );
        assert_eq!(
            PerformanceProfile::classify(&caps(16.0, 8, NetworkClass::FourG).with_save_data(true)),
            ProfileTier::Performance
        );
    }

    #[test]
    fn test_unknown_capabilities_are_balanced() {
        assert_eq!(
            PerformanceProfile::classify(&DeviceCapabilities::default()),
            ProfileTier::Balanced
        );
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(PerformanceProfile::for_tier(ProfileTier::Performance).threshold, 3);
        assert_eq!(PerformanceProfile::for_tier(ProfileTier::Balanced).threshold, 6);
        assert_eq!(PerformanceProfile::for_tier(ProfileTier::Quality).threshold, 10);
        assert_eq!(
            PerformanceProfile::for_tier(ProfileTier::Quality).with_threshold(0).threshold,
            1
        );
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "MemTotal:        8388608 kB\nMemFree:         1024 kB\n";
        assert_eq!(parse_meminfo_gb(content), Some(8.0));
        assert_eq!(parse_meminfo_gb("garbage"), None);
    }

    #[test]
    fn test_network_parse() {
        assert_eq!(NetworkClass::parse("slow-2g"), NetworkClass::Slow2g);
        assert_eq!(NetworkClass::parse("4G"), NetworkClass::FourG);
        assert_eq!(NetworkClass::parse("satellite"), NetworkClass::Unknown);
        assert!(NetworkClass::TwoG.is_slow());
        assert!(!NetworkClass::ThreeG.is_slow());
    }

    #[test]
    fn test_detect_reports_cores() {
        let caps = DeviceCapabilities::detect();
        assert!(caps.cpu_cores.unwrap_or(1) >= 1);
        assert_eq!(caps.network, NetworkClass::Unknown);
    }
}
