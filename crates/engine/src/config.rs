//! Engine configuration.

use std::time::Duration;

use crate::alarm::RESOLVING_INTERVAL;

/// Tunables for one engine instance.
///
/// The defaults reproduce the design constants; `fast()` tightens them for
/// tests that wait on real timers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Period of the alarm tick that flushes eligible buffered messages.
    pub resolving_interval: Duration,

    /// How long an out-of-phase message may sit in the buffer before the
    /// alarm sweep evicts it. `None` keeps entries indefinitely.
    pub buffer_ttl: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolving_interval: RESOLVING_INTERVAL,
            buffer_ttl: Some(Duration::from_secs(60)),
        }
    }
}

impl EngineConfig {
    /// A configuration with short timers, for tests.
    pub fn fast() -> Self {
        Self {
            resolving_interval: Duration::from_millis(20),
            buffer_ttl: Some(Duration::from_secs(5)),
        }
    }
}
