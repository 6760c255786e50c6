//! Injected capability interfaces onto the surrounding cluster: membership,
//! failure detection, and schema gossip. The engine never reaches for process
//! globals; every collaborator arrives through one of these seams so tests
//! can substitute deterministic fakes.

mod failure_detector;
mod gossip;
mod membership;

pub use failure_detector::*;
pub use gossip::*;
pub use membership::*;
