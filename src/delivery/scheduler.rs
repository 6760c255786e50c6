//! Background loops feeding the delivery pipeline.
//!
//! Two triggers schedule a session: a periodic sweep over every target
//! currently holding hints (hints can exist even for peers that were never
//! officially marked down), and an event-driven hook fired when the failure
//! detector reports a peer alive again. Neither loop ever fails upward; they
//! log and move on, and the next tick retries.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::interval_at;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::metrics;
use crate::HintedHandoffManager;

pub(crate) async fn run_sweep_loop(
    manager: HintedHandoffManager,
    mut shutdown: watch::Receiver<()>,
) {
    let period = Duration::from_secs(manager.config().handoff.sweep_interval_in_secs);
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!("Started hint delivery sweep");
                if let Err(e) = manager.schedule_all_deliveries() {
                    warn!("Hint delivery sweep failed: {:?}", e);
                }
                metrics::log_counters();
                debug!("Finished hint delivery sweep");
            }
            _ = shutdown.changed() => {
                info!("Hint sweep loop stopping");
                break;
            }
        }
    }
}

pub(crate) async fn run_peer_event_loop(
    manager: HintedHandoffManager,
    mut events: mpsc::UnboundedReceiver<SocketAddr>,
    mut shutdown: watch::Receiver<()>,
) {
    loop {
        tokio::select! {
            maybe_endpoint = events.recv() => {
                match maybe_endpoint {
                    Some(endpoint) => {
                        debug!("Peer {} reported alive, scheduling hint delivery", endpoint);
                        manager.schedule_delivery(endpoint);
                    }
                    None => {
                        info!("Failure detector event stream closed");
                        break;
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("Peer event loop stopping");
                break;
            }
        }
    }
}
