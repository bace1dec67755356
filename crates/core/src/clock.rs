// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time sources for tick decisions.
//!
//! Stage timeouts are judged against wall-clock timestamps recorded in the
//! event store, so the orchestrator reads time through this trait and tests
//! substitute a scripted source instead of sleeping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of the current time.
pub trait Clock: Clone + Send + Sync {
    /// Monotonic instant for in-process deadlines.
    fn now(&self) -> Instant;

    /// Milliseconds since the Unix epoch, comparable to stored event
    /// timestamps.
    fn epoch_ms(&self) -> u64;
}

/// The real wall clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Scripted clock for tests. Time moves only when the test says so.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeNow>>,
}

struct FakeNow {
    instant: Instant,
    epoch_ms: u64,
}

impl FakeClock {
    /// Starts at an arbitrary fixed epoch so tests get stable timestamps.
    pub fn new() -> Self {
        Self::starting_at(1_000_000)
    }

    /// Starts at the given epoch milliseconds.
    pub fn starting_at(epoch_ms: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeNow {
                instant: Instant::now(),
                epoch_ms,
            })),
        }
    }

    /// Move the instant and the epoch forward together.
    pub fn advance(&self, by: Duration) {
        let mut now = self.inner.lock();
        now.instant += by;
        now.epoch_ms += by.as_millis() as u64;
    }

    /// Jump the epoch to an absolute value, e.g. to line the clock up with
    /// timestamps already written into the event store.
    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        self.inner.lock().epoch_ms = epoch_ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
