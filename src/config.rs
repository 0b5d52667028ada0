use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Gossip transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipConfig {
    /// Multicast group the ring exchanges state on
    #[serde(default = "default_group")]
    pub group: Ipv4Addr,
    /// Well-known port every participant binds with address reuse
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_group() -> Ipv4Addr {
    Ipv4Addr::new(239, 0, 0, 118)
}

fn default_port() -> u16 {
    1993
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            group: default_group(),
            port: default_port(),
        }
    }
}

/// Main configuration for a ring participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of ring positions
    #[serde(default = "default_ring_size")]
    pub ring_size: u16,
    /// Count at which the owner stops the ring
    #[serde(default = "default_target_count")]
    pub target_count: u32,
    /// Milliseconds between owner ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u32,
    /// Supervisor poll interval floor, doubled while the child stays alive
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Supervisor poll interval ceiling
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// The owner never sleeps longer than this, so it cannot miss a tick
    /// deadline by more than the cap
    #[serde(default = "default_owner_poll_cap_ms")]
    pub owner_poll_cap_ms: u64,
    /// Gossip transport settings
    #[serde(default)]
    pub gossip: GossipConfig,
    /// File the owner writes the final count to
    #[serde(default = "default_result_file")]
    pub result_file: PathBuf,
    /// Executable to relaunch children with (defaults to the current binary)
    #[serde(default)]
    pub child_exe: Option<PathBuf>,
}

fn default_ring_size() -> u16 {
    5
}

fn default_target_count() -> u32 {
    100
}

fn default_tick_interval_ms() -> u32 {
    1000
}

fn default_initial_backoff_ms() -> u64 {
    5
}

fn default_max_backoff_ms() -> u64 {
    2000
}

fn default_owner_poll_cap_ms() -> u64 {
    100
}

fn default_result_file() -> PathBuf {
    PathBuf::from("final_count.txt")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_size: default_ring_size(),
            target_count: default_target_count(),
            tick_interval_ms: default_tick_interval_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            owner_poll_cap_ms: default_owner_poll_cap_ms(),
            gossip: GossipConfig::default(),
            result_file: default_result_file(),
            child_exe: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::RingError::ConfigError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| crate::error::RingError::ConfigError(e.to_string()))
    }

    /// Ring position of the counter owner
    pub fn owner_index(&self) -> u16 {
        self.ring_size.saturating_sub(1)
    }
}
