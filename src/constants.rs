use std::time::Duration;

// -
// Database namespaces

/// Sled tree holding every hint record
pub(crate) const HINTS_TREE: &str = "_hints_tree";

// -
// Paging

/// Upper bound and default for the adaptive page size
pub(crate) const MAX_PAGE_SIZE: usize = 128;

/// Page size of 1 does not allow actual paging because the scan restarts
/// strictly after the cursor key
pub(crate) const MIN_PAGE_SIZE: usize = 2;

// -
// Schema agreement

/// Poll interval while waiting for a peer's gossiped schema to converge
pub(crate) const SCHEMA_POLL_INTERVAL: Duration = Duration::from_secs(1);
