//! Queue configuration.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Wait before a lone entry is matched with a bot. Entries may
    /// override it with `max_wait_secs`.
    pub bot_timeout: Duration,

    /// Period of the pairing pass. Zero pairs on every join instead.
    pub match_interval: Duration,

    /// Maximum number of waiting entries.
    pub capacity: usize,

    /// How long a caller waits for the coordinator to answer.
    pub request_timeout: Duration,

    /// Largest skill difference two entries may have and still be paired.
    pub skill_tolerance: u8,

    /// Global switch for bot escalation.
    pub enable_bots: bool,

    /// Size of the coordinator's command channel.
    pub channel_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            bot_timeout: Duration::from_secs(10),
            match_interval: Duration::from_secs(1),
            capacity: 1000,
            request_timeout: Duration::from_secs(5),
            skill_tolerance: 2,
            enable_bots: true,
            channel_size: 100,
        }
    }
}
