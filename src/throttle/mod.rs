//! Token-bucket delivery throttle, in bytes per second.
//!
//! One instance is created per delivery session so the per-target budget
//! reflects the cluster size at that moment: the configured global rate is
//! divided across the other nodes, so a larger cluster delivers slower to
//! each peer.


use std::time::Duration;

use tokio::time::sleep;
use tokio::time::Instant;
use tracing::debug;

pub struct DeliveryThrottle {
    bucket: Option<TokenBucket>,
}

impl DeliveryThrottle {
    /// Builds the per-target throttle from the cluster-wide cap.
    ///
    /// `throttle_kb == 0` disables throttling, and so does a single-node
    /// cluster: with no other peers there is nothing to divide the budget
    /// across.
    pub fn per_target(
        throttle_kb: u64,
        cluster_size: usize,
    ) -> Self {
        if throttle_kb == 0 || cluster_size <= 1 {
            return Self { bucket: None };
        }

        let rate = throttle_kb * 1024 / (cluster_size as u64 - 1).max(1);
        debug!("Delivery throttle set to {} bytes/s across {} peers", rate, cluster_size - 1);
        Self {
            bucket: Some(TokenBucket::new(rate.max(1))),
        }
    }

    /// Effective rate in bytes per second; `None` when unlimited.
    pub fn rate_bytes_per_sec(&self) -> Option<u64> {
        self.bucket.as_ref().map(|b| b.rate_bytes_per_sec)
    }

    /// Blocks the session long enough to respect the configured rate.
    /// Called before dispatch, sized by the mutation's wire size.
    pub async fn acquire(
        &mut self,
        bytes: u64,
    ) {
        let Some(bucket) = self.bucket.as_mut() else {
            return;
        };
        let wait = bucket.reserve_at(bytes, Instant::now());
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

/// Plain token bucket; `reserve_at` is separated from the sleep so the
/// arithmetic is testable without a clock.
pub(crate) struct TokenBucket {
    rate_bytes_per_sec: u64,
    burst_bytes: u64,
    available: u64,
    last_refill: Instant,
}

impl TokenBucket {
    pub(crate) fn new(rate_bytes_per_sec: u64) -> Self {
        let burst_bytes = rate_bytes_per_sec.max(1);
        Self {
            rate_bytes_per_sec,
            burst_bytes,
            available: burst_bytes,
            last_refill: Instant::now(),
        }
    }

    pub(crate) fn reserve_at(
        &mut self,
        bytes: u64,
        now: Instant,
    ) -> Duration {
        if bytes == 0 {
            return Duration::ZERO;
        }

        if now > self.last_refill {
            let elapsed_ms = now.duration_since(self.last_refill).as_millis() as u64;
            if elapsed_ms > 0 {
                let added = self.rate_bytes_per_sec.saturating_mul(elapsed_ms) / 1000;
                self.available = self.available.saturating_add(added).min(self.burst_bytes);
            }
            self.last_refill = now;
        }

        if bytes <= self.available {
            self.available -= bytes;
            return Duration::ZERO;
        }

        let deficit = bytes - self.available;
        self.available = 0;
        let wait_ms = ((deficit as u128) * 1000 + (self.rate_bytes_per_sec as u128 - 1))
            / self.rate_bytes_per_sec as u128;
        let wait = Duration::from_millis(wait_ms.min(u64::MAX as u128) as u64);
        self.last_refill = now + wait;
        wait
    }
}
