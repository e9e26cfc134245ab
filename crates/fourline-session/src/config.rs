//! Registry configuration.

use std::time::Duration;

/// Timing knobs for the session registry.
///
/// ```
/// use std::time::Duration;
/// use fourline_session::RegistryConfig;
///
/// let config = RegistryConfig {
///     grace_period: Duration::from_secs(10),
///     ..RegistryConfig::default()
/// };
/// assert_eq!(config.sweep_interval, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// How long a player may stay disconnected from a game in play before
    /// the sweep declares a forfeit. Strictly exceeded, not reached.
    pub grace_period: Duration,

    /// How often the disconnect sweep runs. Zero disables it.
    pub sweep_interval: Duration,

    /// How long a finished session stays readable (snapshots, reconnect
    /// attempts get a clean "not active") before the sweep drops it.
    pub retain_finished: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(30),
            retain_finished: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config_default() {
        let config = RegistryConfig::default();
        assert_eq!(config.grace_period, Duration::from_secs(30));
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.retain_finished, Duration::from_secs(300));
    }
}
