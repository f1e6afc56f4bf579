// Provisioning configuration: capacity hints and the bounded backoff used
// while waiting for a table to become active.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Provisioned throughput hints passed to table creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    #[serde(default = "default_capacity")]
    pub read_units: i64,
    #[serde(default = "default_capacity")]
    pub write_units: i64,
}

fn default_capacity() -> i64 {
    5
}

impl Default for Throughput {
    fn default() -> Self {
        Self {
            read_units: default_capacity(),
            write_units: default_capacity(),
        }
    }
}

/// Backoff settings for waiting on a table to report active.
///
/// Provisioning is the only intentionally blocking sequence in the system,
/// and it runs once at startup, not on the request path.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Delay before the first status poll.
    pub initial_delay: Duration,
    /// Ceiling for the doubling delay.
    pub max_delay: Duration,
    /// Give up and report the store unavailable after this many polls.
    pub max_attempts: u32,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}
