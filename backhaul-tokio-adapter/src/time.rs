//! Tokio-backed tick source
//!
//! Implements the core's [`TickSource`] over `tokio::time::Instant`, turning
//! wall-clock elapsed time into the logical tick counter the relay ages
//! records with. Using Tokio's instant (rather than `std::time::Instant`)
//! means `tokio::time::pause()` / `advance()` drive this clock too, which
//! keeps backoff-schedule tests deterministic.

use backhaul_core::{Tick, TickSource};
use tokio::time::Instant;

/// Logical ticks derived from elapsed Tokio time
///
/// Tick zero is the moment of construction; the counter advances at the
/// configured rate and wraps modulo `u32` like the device loop counters the
/// core is designed around.
#[derive(Debug, Clone)]
pub struct TokioTickSource {
    started: Instant,
    ticks_per_second: u32,
}

impl TokioTickSource {
    /// Creates a tick source counting from now at the given rate
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            started: Instant::now(),
            ticks_per_second,
        }
    }
}

impl TickSource for TokioTickSource {
    fn now(&self) -> Tick {
        let millis = self.started.elapsed().as_millis();
        // Truncating cast = modular wrap, matching the core's age arithmetic
        ((millis * u128::from(self.ticks_per_second)) / 1000) as Tick
    }

    fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn ticks_advance_with_tokio_time() {
        let clock = TokioTickSource::new(10);
        assert_eq!(clock.now(), 0);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.now(), 30);

        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(clock.now(), 32);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_is_reported() {
        let clock = TokioTickSource::new(100);
        assert_eq!(clock.ticks_per_second(), 100);
    }
}
