//! Registry configuration

use std::time::Duration;

/// Configuration for the session registry and its iteration loop
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Cadence of the background iteration task
    pub tick_interval: Duration,

    /// How long the iteration loop yields when the pause signal is raised,
    /// instead of contending on the lock during control-path bursts
    pub pause_backoff: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(30),
            pause_backoff: Duration::from_micros(10),
        }
    }
}

impl RegistryConfig {
    /// Set the iteration tick interval
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the pause backoff duration
    pub fn pause_backoff(mut self, backoff: Duration) -> Self {
        self.pause_backoff = backoff;
        self
    }
}
