//! Server configuration.
//!
//! [`ServerConfig`] gathers the per-layer configs. Every field has a
//! default; [`ServerConfig::from_env`] overrides them from `FOURLINE_*`
//! environment variables.
//!
//! | variable | field | unit |
//! |---|---|---|
//! | `FOURLINE_GRACE_SECS` | `registry.grace_period` | s |
//! | `FOURLINE_SWEEP_SECS` | `registry.sweep_interval` | s |
//! | `FOURLINE_RETAIN_SECS` | `registry.retain_finished` | s |
//! | `FOURLINE_BOT_TIMEOUT_SECS` | `queue.bot_timeout` | s |
//! | `FOURLINE_MATCH_INTERVAL_MS` | `queue.match_interval` | ms |
//! | `FOURLINE_QUEUE_CAPACITY` | `queue.capacity` | entries |
//! | `FOURLINE_REQUEST_TIMEOUT_SECS` | `queue.request_timeout` | s |
//! | `FOURLINE_SKILL_TOLERANCE` | `queue.skill_tolerance` | levels |
//! | `FOURLINE_ENABLE_BOTS` | `queue.enable_bots` | bool |
//! | `FOURLINE_BOT_POLL_MS` | `bot.poll_interval` | ms, at least 1 |
//! | `FOURLINE_BOT_THINK_MS` | `bot.think_delay` | ms |

use std::str::FromStr;
use std::time::Duration;

use fourline_bot::BotConfig;
use fourline_matchmaking::QueueConfig;
use fourline_session::RegistryConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: expected {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub registry: RegistryConfig,
    pub queue: QueueConfig,
    pub bot: BotConfig,
}

impl ServerConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);
        let mut config = Self::default();

        if let Some(v) = env.secs("FOURLINE_GRACE_SECS")? {
            config.registry.grace_period = v;
        }
        if let Some(v) = env.secs("FOURLINE_SWEEP_SECS")? {
            config.registry.sweep_interval = v;
        }
        if let Some(v) = env.secs("FOURLINE_RETAIN_SECS")? {
            config.registry.retain_finished = v;
        }
        if let Some(v) = env.secs("FOURLINE_BOT_TIMEOUT_SECS")? {
            config.queue.bot_timeout = v;
        }
        if let Some(v) = env.millis("FOURLINE_MATCH_INTERVAL_MS")? {
            config.queue.match_interval = v;
        }
        if let Some(v) = env.parse("FOURLINE_QUEUE_CAPACITY", "a whole number")? {
            config.queue.capacity = v;
        }
        if let Some(v) = env.secs("FOURLINE_REQUEST_TIMEOUT_SECS")? {
            config.queue.request_timeout = v;
        }
        if let Some(v) = env.parse("FOURLINE_SKILL_TOLERANCE", "a number from 0 to 255")? {
            config.queue.skill_tolerance = v;
        }
        if let Some(v) = env.flag("FOURLINE_ENABLE_BOTS")? {
            config.queue.enable_bots = v;
        }
        // Zero switches a ticker off. The sweep and the matching pass
        // accept that; a bot driver would never move again.
        if let Some(v) = env.positive_millis("FOURLINE_BOT_POLL_MS")? {
            config.bot.poll_interval = v;
        }
        if let Some(v) = env.millis("FOURLINE_BOT_THINK_MS")? {
            config.bot.think_delay = v;
        }
        Ok(config)
    }
}

struct Lookup<F>(F);

impl<F: Fn(&str) -> Option<String>> Lookup<F> {
    fn parse<T: FromStr>(
        &self,
        key: &'static str,
        expected: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        let Some(raw) = (self.0)(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key,
                value: raw,
                expected,
            })
    }

    fn secs(&self, key: &'static str) -> Result<Option<Duration>, ConfigError> {
        Ok(self
            .parse(key, "whole seconds")?
            .map(Duration::from_secs))
    }

    fn millis(&self, key: &'static str) -> Result<Option<Duration>, ConfigError> {
        Ok(self
            .parse(key, "whole milliseconds")?
            .map(Duration::from_millis))
    }

    fn positive_millis(&self, key: &'static str) -> Result<Option<Duration>, ConfigError> {
        match self.parse::<u64>(key, "a positive number of milliseconds")? {
            Some(0) => Err(ConfigError::Invalid {
                key,
                value: "0".into(),
                expected: "a positive number of milliseconds",
            }),
            ms => Ok(ms.map(Duration::from_millis)),
        }
    }

    fn flag(&self, key: &'static str) -> Result<Option<bool>, ConfigError> {
        let Some(raw) = (self.0)(key) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid {
                key,
                value: raw,
                expected: "true or false",
            }),
        }
    }
}
