//! Time utilities for the room simulation

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(std::time::Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default simulation rate
pub const DEFAULT_TICK_RATE: u32 = 60;
/// Tick rate the per-tick tuning constants were balanced at
pub const NOMINAL_TICK_RATE: u32 = 60;
/// Upper bound on a single simulation step (seconds)
pub const MAX_TICK_DELTA: f32 = 0.1;

/// Duration of one nominal tick in seconds
pub fn nominal_tick_secs() -> f32 {
    1.0 / NOMINAL_TICK_RATE as f32
}

/// Interval between ticks for a given rate
pub fn tick_interval(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / tick_rate.max(1) as u64)
}

/// Measures wall-clock time between ticks, clamped to [`MAX_TICK_DELTA`].
///
/// Uses tokio's clock so paused-time tests advance it deterministically.
#[derive(Debug, Clone)]
pub struct TickClock {
    last: Instant,
}

impl TickClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Seconds since the previous call, clamped
    pub fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        elapsed.min(MAX_TICK_DELTA)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tick_clock_clamps_stalls() {
        let mut clock = TickClock::new();
        tokio::time::advance(Duration::from_millis(16)).await;
        let dt = clock.delta();
        assert!((dt - 0.016).abs() < 1e-4);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(clock.delta(), MAX_TICK_DELTA);
    }

    #[test]
    fn test_tick_interval() {
        assert_eq!(tick_interval(50), Duration::from_millis(20));
        assert_eq!(tick_interval(0), Duration::from_secs(1));
    }
}
