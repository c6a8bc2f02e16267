//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for the supervisory loop.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `SupervisorBuilder::new(config, link)`
//! 2. **Messaging bounds**: every `send`/`query` is wrapped in a timeout taken from here
//!
//! ## TOML form
//! Durations are written in milliseconds; every key is optional.
//! ```toml
//! poll_interval_ms = 5000
//! send_timeout_ms = 2000
//! query_timeout_ms = 2000
//! grace_ms = 5000
//! bus_capacity = 1024
//! request_capacity = 64
//! handle_signals = true
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Smallest accepted poll interval (`tokio::time::interval` rejects zero).
const MIN_POLL: Duration = Duration::from_millis(1);

/// Global configuration for the supervisor.
///
/// ## Field semantics
/// - `poll_interval`: period of the reconciliation tick
/// - `send_timeout`: bound of one `Link::send`
/// - `query_timeout`: bound of one `Link::query`
/// - `grace`: how long shutdown waits for subscribers to drain
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `request_capacity`: queue size of the [`SupervisorHandle`](crate::SupervisorHandle) channel
/// - `handle_signals`: whether `run` also stops on SIGINT/SIGTERM/SIGQUIT
///
/// ## Notes
/// All fields are public for flexibility. Prefer using the accessors; they
/// clamp values the runtime cannot use.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Period of the reconciliation tick (poll of every enabled node).
    #[serde(rename = "poll_interval_ms", deserialize_with = "millis")]
    pub poll_interval: Duration,

    /// Maximum wait for one command acknowledgement.
    ///
    /// An elapsed bound counts as a send failure for that node.
    #[serde(rename = "send_timeout_ms", deserialize_with = "millis")]
    pub send_timeout: Duration,

    /// Maximum wait for one live-state query.
    #[serde(rename = "query_timeout_ms", deserialize_with = "millis")]
    pub query_timeout: Duration,

    /// Maximum time shutdown waits for subscribers to process queued events.
    #[serde(rename = "grace_ms", deserialize_with = "millis")]
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Listeners that lag behind more than `bus_capacity` messages skip older
    /// items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Capacity of the operator request queue.
    pub request_capacity: usize,

    /// Listen for OS termination signals in `Supervisor::run`.
    pub handle_signals: bool,
}

fn millis<'de, D>(de: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(de).map(Duration::from_millis)
}

impl Config {
    /// Returns the poll interval clamped to a minimum of 1ms.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL)
    }

    #[inline]
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    #[inline]
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a request queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn request_capacity(&self) -> usize {
        self.request_capacity.max(1)
    }

    /// Parses a configuration document. Missing keys keep their defaults.
    #[cfg(feature = "toml-store")]
    pub fn from_toml_str(text: &str) -> Result<Self, crate::store::ConfigError> {
        toml::from_str(text).map_err(|e| crate::store::ConfigError::Parse {
            path: "<config>".to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `poll_interval = 5s`
    /// - `send_timeout = 2s`, `query_timeout = 2s`
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`, `request_capacity = 64`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            send_timeout: Duration::from_secs(2),
            query_timeout: Duration::from_secs(2),
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            request_capacity: 64,
            handle_signals: true,
        }
    }
}
