//! Configuration for the streaming stack

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for scanning, buffering, and the sampling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadsetConfig {
    /// Capacity of each per-channel ring buffer, in samples.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// How long a scan waits for hardware before falling back to the
    /// synthetic source.
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
    /// Period of the sample emission loop.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_buffer_capacity() -> usize {
    256
}

fn default_scan_timeout_ms() -> u64 {
    10_000
}

fn default_tick_interval_ms() -> u64 {
    50
}

impl Default for HeadsetConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            scan_timeout_ms: default_scan_timeout_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl HeadsetConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
