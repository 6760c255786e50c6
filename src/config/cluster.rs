use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::{Error, Result};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Root directory for the hint store database
    #[serde(default = "default_db_root_dir")]
    pub db_root_dir: PathBuf,

    /// Cluster-wide bound used to size gossip-convergence waits.
    /// Schema-agreement waits are bounded at `2 x ring_delay`.
    #[serde(default = "default_ring_delay")]
    pub ring_delay_in_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            db_root_dir: default_db_root_dir(),
            ring_delay_in_ms: default_ring_delay(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ring_delay_in_ms == 0 {
            return Err(Error::InvalidConfig("ring_delay_in_ms cannot be 0".into()));
        }
        Ok(())
    }
}

fn default_db_root_dir() -> PathBuf {
    PathBuf::from("./db")
}

// in ms
fn default_ring_delay() -> u64 {
    30_000
}
