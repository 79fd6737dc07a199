//! Call graph and worker pool configuration.

use crate::api::error::InitError;

/// Environment variable holding [`GraphConfig::frame_limit`].
pub const ENV_FRAME_LIMIT: &str = "OPGRAPH_FRAME_LIMIT";

/// Environment variable holding [`GraphConfig::events`].
pub const ENV_EVENTS: &str = "OPGRAPH_EVENTS";

/// Configuration applied by [`startup`](crate::startup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Maximum number of live non-root frames (0 = unlimited).
    ///
    /// Minting a frame past this limit fails with
    /// [`AllocError::LimitReached`](crate::AllocError).
    pub frame_limit: usize,

    /// Dispatch [`FrameEvent`](crate::diagnostics::FrameEvent)s to
    /// registered listeners.
    pub events: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            frame_limit: 0,
            events: true,
        }
    }
}

impl GraphConfig {
    /// No frame limit, events on.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// At most `limit` live frames.
    pub fn bounded(limit: usize) -> Self {
        Self::default().with_frame_limit(limit)
    }

    /// Builder pattern: set the frame limit.
    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Builder pattern: enable or disable event dispatch.
    pub fn with_events(mut self, enable: bool) -> Self {
        self.events = enable;
        self
    }

    /// Read `OPGRAPH_FRAME_LIMIT` and `OPGRAPH_EVENTS` over the defaults.
    pub fn from_env() -> Result<Self, InitError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup(ENV_FRAME_LIMIT) {
            config.frame_limit = val.trim().parse().map_err(|_| InitError::InvalidConfig {
                key: ENV_FRAME_LIMIT,
                value: val.clone(),
            })?;
        }

        if let Some(val) = lookup(ENV_EVENTS) {
            let flag = val.trim().to_lowercase();
            config.events = match flag.as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => {
                    return Err(InitError::InvalidConfig {
                        key: ENV_EVENTS,
                        value: val,
                    })
                }
            };
        }

        Ok(config)
    }
}

/// Configuration for [`WorkerPool`](crate::pool::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads (at least one is always spawned).
    pub workers: usize,

    /// Worker thread name prefix; workers are named `{prefix}-{index}`.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
            thread_name: "opgraph-worker".to_string(),
        }
    }
}

impl PoolConfig {
    /// Builder pattern: set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder pattern: set the thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
