use serde::Deserialize;
use serde::Serialize;

use crate::{Error, Result};

/// Hint delivery knobs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HandoffConfig {
    /// Delivery worker pool ceiling; one worker runs one full delivery
    /// session for one target
    #[serde(default = "default_max_hint_threads")]
    pub max_hint_threads: usize,

    /// Global ceiling on the per-hint TTL. The effective TTL is the minimum
    /// of this and each touched column family's grace period.
    #[serde(default = "default_max_hint_ttl")]
    pub max_hint_ttl_in_secs: u32,

    /// Delivery byte-rate cap for the whole cluster, in KB/s. The per-target
    /// rate divides this by (cluster size - 1). 0 disables throttling.
    #[serde(default = "default_throttle_kb")]
    pub throttle_in_kb: u64,

    /// Drives adaptive page sizing: pages hold roughly this many bytes of
    /// hint payload
    #[serde(default = "default_compaction_limit")]
    pub in_memory_compaction_limit_in_bytes: u64,

    /// A finished session that replayed more rows than this triggers a
    /// flush + compaction of the hint store
    #[serde(default = "default_tombstone_warn_threshold")]
    pub tombstone_warn_threshold: u64,

    /// Interval of the periodic sweep that schedules delivery for every
    /// target currently holding hints
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_in_secs: u64,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            max_hint_threads: default_max_hint_threads(),
            max_hint_ttl_in_secs: default_max_hint_ttl(),
            throttle_in_kb: default_throttle_kb(),
            in_memory_compaction_limit_in_bytes: default_compaction_limit(),
            tombstone_warn_threshold: default_tombstone_warn_threshold(),
            sweep_interval_in_secs: default_sweep_interval(),
        }
    }
}

impl HandoffConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_hint_threads == 0 {
            return Err(Error::InvalidConfig("max_hint_threads must be greater than 0".into()));
        }

        if self.max_hint_ttl_in_secs == 0 {
            return Err(Error::InvalidConfig("max_hint_ttl_in_secs must be greater than 0".into()));
        }

        if self.in_memory_compaction_limit_in_bytes == 0 {
            return Err(Error::InvalidConfig(
                "in_memory_compaction_limit_in_bytes must be greater than 0".into(),
            ));
        }

        if self.sweep_interval_in_secs == 0 {
            return Err(Error::InvalidConfig("sweep_interval_in_secs must be greater than 0".into()));
        }

        Ok(())
    }
}

fn default_max_hint_threads() -> usize {
    2
}

fn default_max_hint_ttl() -> u32 {
    u32::MAX
}

fn default_throttle_kb() -> u64 {
    1024
}

fn default_compaction_limit() -> u64 {
    64 * 1024 * 1024
}

fn default_tombstone_warn_threshold() -> u64 {
    1000
}

// in seconds
fn default_sweep_interval() -> u64 {
    600
}
