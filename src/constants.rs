// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role.

// ---------------------------------------------------------------------------
// Category tree
// ---------------------------------------------------------------------------

/// Id of the synthetic root node every category tree hangs from.
pub const ROOT_SENTINEL_ID: &str = "0";

/// Nesting level of the root sentinel; top-level categories sit at level 0.
pub const ROOT_SENTINEL_LEVEL: i32 = -1;

/// Display name of the root sentinel.
pub const ROOT_SENTINEL_NAME: &str = "root";

/// Name used for listing entries that carry no title.
pub const UNTITLED_CATEGORY_NAME: &str = "Untitled";

// ---------------------------------------------------------------------------
// Worker pool boundaries
// ---------------------------------------------------------------------------

/// Lower bound for the auto-detected worker count.
///
/// Workers spend their time waiting on the network, so a small machine
/// still benefits from a few of them.
pub const AUTO_WORKERS_MIN: usize = 4;

/// Upper bound for the auto-detected worker count.
pub const AUTO_WORKERS_MAX: usize = 24;

/// Hard cap for any configured worker count. Scraped sites rate limit well
/// before this.
pub const MAX_WORKERS_LIMIT: usize = 32;

// ---------------------------------------------------------------------------
// Retry defaults
// ---------------------------------------------------------------------------

/// Attempts per task, counting the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base of the exponential backoff, in seconds (`base^attempt`).
pub const DEFAULT_BASE_DELAY_SECONDS: f64 = 2.0;

/// Jitter added on top of the exponential delay, in seconds.
pub const DEFAULT_JITTER_SECONDS: (f64, f64) = (0.0, 1.0);

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// File name of the log written to the temp directory.
pub const LOG_FILE_NAME: &str = "category_harvest.log";
