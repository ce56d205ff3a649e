//! Keepalive and reconnect timers for camchat.
//!
//! Two pieces of timing drive a client connection:
//!
//! - [`KeepaliveTimer`] fires at a fixed interval while a connection is
//!   up, so the client can send a no-op before the server idles it out.
//! - [`ReconnectPolicy`] says how long to wait after a disconnect before
//!   starting over.
//!
//! # Integration
//!
//! Both are meant to sit inside the connection actor's `tokio::select!`
//! loop. Dropping the future cancels the wait, so tearing the loop down
//! cancels every pending timer with it.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = keepalive.wait_for_tick() => { /* send keepalive */ }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Interval between keepalives unless configured otherwise.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(120);

/// Delay before a reconnect attempt unless configured otherwise.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// KeepaliveTimer
// ---------------------------------------------------------------------------

/// Fixed-interval timer for keepalive sends.
///
/// The first tick fires one interval after [`start`](Self::start). If a
/// tick is serviced late, the next one is scheduled a full interval from
/// the late wake-up, so a stalled task never produces a burst of
/// keepalives.
#[derive(Debug)]
pub struct KeepaliveTimer {
    interval: Duration,
    next_tick: Option<Instant>,
    ticks: u64,
}

impl KeepaliveTimer {
    /// Creates a stopped timer. A zero interval is raised to 1 ms.
    pub fn new(interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!("keepalive interval of zero, using 1ms");
            Duration::from_millis(1)
        } else {
            interval
        };
        Self {
            interval,
            next_tick: None,
            ticks: 0,
        }
    }

    /// Creates a timer and starts it immediately.
    pub fn started(interval: Duration) -> Self {
        let mut timer = Self::new(interval);
        timer.start();
        timer
    }

    /// Schedules the first tick one interval from now. Restarting a
    /// running timer pushes its next tick out.
    pub fn start(&mut self) {
        self.next_tick = Some(Instant::now() + self.interval);
        debug!(interval_ms = self.interval.as_millis() as u64, "keepalive started");
    }

    /// Stops the timer. [`wait_for_tick`](Self::wait_for_tick) pends
    /// until the next [`start`](Self::start).
    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(ticks = self.ticks, "keepalive stopped");
        }
    }

    /// Waits until the next tick is due and returns the tick number
    /// (starting at 1).
    ///
    /// While stopped this future never resolves, which lets it sit in a
    /// `select!` next to other branches.
    pub async fn wait_for_tick(&mut self) -> u64 {
        let Some(next) = self.next_tick else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        if late_by > self.interval {
            warn!(
                late_ms = late_by.as_millis() as u64,
                "keepalive serviced late"
            );
        }

        self.ticks += 1;
        self.next_tick = Some(now + self.interval);
        trace!(tick = self.ticks, "keepalive tick");
        self.ticks
    }

    /// Whether a tick is scheduled.
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

// ---------------------------------------------------------------------------
// ReconnectPolicy
// ---------------------------------------------------------------------------

/// How long to wait between a disconnect and the next connect attempt.
///
/// The delay is fixed and retries are unlimited: after any disconnect the
/// client always comes back after the same pause. The attempt counter is
/// for logging and observation only.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay: Duration,
    attempts: u64,
}

impl ReconnectPolicy {
    /// A policy that always waits `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self { delay, attempts: 0 }
    }

    /// Records a new reconnect attempt and returns how long to wait
    /// before it.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts += 1;
        debug!(
            attempt = self.attempts,
            delay_ms = self.delay.as_millis() as u64,
            "reconnect scheduled"
        );
        self.delay
    }

    /// Clears the attempt counter after a connection succeeds.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Reconnect attempts since the last [`reset`](Self::reset).
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}
