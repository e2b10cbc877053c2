//! Real-time clock for host drivers.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::constants::*;

/// Clock frequency, in hertz (per second)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hz(pub u64);

impl Default for Hz {
    fn default() -> Self {
        Hz(DEFAULT_CLOCK_FREQUENCY)
    }
}

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Timer to synchronize a driver loop with a software clock.
///
/// It is designed to work with the yielding cooperative pattern
/// of the interpreter. The VM never waits on its own; the driver
/// asks the clock whether a cycle has elapsed, and steps the VM or
/// counts down its timers accordingly.
///
/// Instruction execution and the 60Hz timers are two separate clocks.
#[derive(Debug)]
pub struct Clock {
    interval: Duration,
    last: Instant,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    pub fn from_hz(freq: Hz) -> Self {
        Self::new(freq.into())
    }

    /// Clock that drives the delay and sound timers.
    pub fn timers() -> Self {
        Self::from_hz(Hz(DELAY_FREQUENCY))
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.last = Instant::now()
    }

    /// Check whether a cycle has elapsed, without blocking.
    ///
    /// Elapsed cycles are consumed one per call, so a driver that
    /// fell behind catches up over the next few calls.
    pub fn tick(&mut self) -> bool {
        if self.last.elapsed() >= self.interval {
            self.last += self.interval;
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        loop {
            if self.last.elapsed() < self.interval {
                // Sleep does not have enough resolution, and causes
                // the clock to run at 30 FPS.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                // Reset back to zero, rather than trying to catch up.
                //
                // If the VM was paused for debugging, and a large
                // amount of time has elapsed until it is resumed,
                // it should simply continue at the next cycle running
                // at its usual speed.
                self.reset();
                return;
            }
        }
    }
}
