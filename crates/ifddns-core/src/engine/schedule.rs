//! Tick sources for the reconciliation loop
//!
//! The loop waits on a [`Ticker`] rather than sleeping directly, so tests can
//! drive it with tokio's paused clock (`start_paused = true` plus
//! `tokio::time::advance`) or with a hand-fed ticker.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;

/// A source of reconciliation ticks
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick
    async fn tick(&mut self);
}

/// Fixed-period ticker backed by `tokio::time::interval_at`
///
/// The first tick fires one full period after construction, not
/// immediately. A tick that runs long delays the following ones instead of
/// bursting to catch up.
#[derive(Debug)]
pub struct IntervalTicker {
    period: Duration,
    ticks: IntervalStream,
}

impl IntervalTicker {
    /// Create a ticker firing every `period`
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            period,
            ticks: IntervalStream::new(interval),
        }
    }

    /// The configured period
    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        // IntervalStream never terminates
        let _ = self.ticks.next().await;
    }
}
