//! Injectable latency providers

use rand::Rng;
use std::time::Duration;

/// Source of simulated delays
pub trait Latency: Send + Sync {
    /// Delay before a message reaches its destination
    fn network_delay(&self) -> Duration;

    /// Delay a node spends handling received data
    fn processing_delay(&self) -> Duration;
}

/// Uniformly distributed delay in `[0, max)` milliseconds
#[derive(Debug, Clone, Copy)]
pub struct UniformLatency {
    max: Duration,
}

impl UniformLatency {
    pub fn new(max: Duration) -> Self {
        Self { max }
    }

    pub fn from_millis(max_ms: u64) -> Self {
        Self::new(Duration::from_millis(max_ms))
    }

    fn sample(&self) -> Duration {
        let max_ms = self.max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

impl Default for UniformLatency {
    fn default() -> Self {
        Self::from_millis(100)
    }
}

impl Latency for UniformLatency {
    fn network_delay(&self) -> Duration {
        self.sample()
    }

    fn processing_delay(&self) -> Duration {
        self.sample()
    }
}

/// Zero delay everywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLatency;

impl Latency for NoLatency {
    fn network_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn processing_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// Suspend the current task for `delay`, skipping the timer for zero delays
pub async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
