// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Time sources: wall clock and repeating tickers.
//!
//! The processor never touches `tokio::time` directly for its poll timing.
//! It asks a [`TimeSource`] for a [`Ticker`], so tests can swap in
//! [`MockedTimeSource`] and drive cycles with [`MockedTimeSource::advance`]
//! instead of sleeping.
//!
//! ```rust
//! # async fn example() {
//! use domain_replicator::clock::{MockedTimeSource, TimeSource};
//! use std::time::Duration;
//!
//! let clock = MockedTimeSource::new();
//! let mut ticker = clock.new_ticker(Duration::from_secs(1));
//! clock.advance(Duration::from_secs(1));
//! ticker.tick().await; // returns immediately, the deadline has passed
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

/// Future returned by [`Ticker::tick`].
pub type TickFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A repeating timer.
///
/// `tick()` must be cancel-safe: dropping the future before it resolves
/// must not lose or consume a tick.
pub trait Ticker: Send {
    fn tick(&mut self) -> TickFuture<'_>;
}

/// Source of the current time and of tickers.
pub trait TimeSource: Send + Sync + 'static {
    fn now(&self) -> SystemTime;

    /// A ticker whose first tick fires one `period` from now.
    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker>;

    /// Resolves once `duration` has passed on this clock.
    fn sleep(&self, duration: Duration) -> TickFuture<'static>;
}

// =============================================================================
// Real time
// =============================================================================

/// Wall clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker> {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        // A slow cycle delays the next one instead of bursting to catch up
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Box::new(IntervalTicker { interval })
    }

    fn sleep(&self, duration: Duration) -> TickFuture<'static> {
        Box::pin(tokio::time::sleep(duration))
    }
}

struct IntervalTicker {
    interval: Interval,
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> TickFuture<'_> {
        Box::pin(async move {
            self.interval.tick().await;
        })
    }
}

// =============================================================================
// Mocked time
// =============================================================================

/// Deterministic clock for tests.
///
/// Time only moves when [`advance`](Self::advance) is called. Each advance
/// fires every ticker whose deadline has passed exactly once; missed
/// periods are skipped.
#[derive(Debug)]
pub struct MockedTimeSource {
    base: SystemTime,
    elapsed: watch::Sender<Duration>,
}

impl Default for MockedTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockedTimeSource {
    /// Mocked clock starting at the Unix epoch.
    pub fn new() -> Self {
        Self::starting_at(SystemTime::UNIX_EPOCH)
    }

    pub fn starting_at(base: SystemTime) -> Self {
        let (elapsed, _) = watch::channel(Duration::ZERO);
        Self { base, elapsed }
    }

    /// Move time forward by `d`, waking due tickers.
    pub fn advance(&self, d: Duration) {
        self.elapsed.send_modify(|elapsed| *elapsed += d);
    }

    /// Total time advanced so far.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.borrow()
    }
}

impl TimeSource for MockedTimeSource {
    fn now(&self) -> SystemTime {
        self.base + self.elapsed()
    }

    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker> {
        let rx = self.elapsed.subscribe();
        let next = *rx.borrow() + period;
        Box::new(MockedTicker { rx, period, next })
    }

    fn sleep(&self, duration: Duration) -> TickFuture<'static> {
        let mut rx = self.elapsed.subscribe();
        let deadline = *rx.borrow() + duration;
        Box::pin(async move {
            while *rx.borrow_and_update() < deadline {
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        })
    }
}

struct MockedTicker {
    rx: watch::Receiver<Duration>,
    period: Duration,
    next: Duration,
}

impl Ticker for MockedTicker {
    fn tick(&mut self) -> TickFuture<'_> {
        Box::pin(async move {
            loop {
                let now = *self.rx.borrow_and_update();
                if now >= self.next {
                    self.next = now + self.period;
                    return;
                }
                if self.rx.changed().await.is_err() {
                    // Clock dropped: time never moves again
                    std::future::pending::<()>().await;
                }
            }
        })
    }
}
