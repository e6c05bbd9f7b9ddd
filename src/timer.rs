//! Fixed-period pacing for producers.

use std::thread;
use std::time::{Duration, Instant, SystemTime};

/// A timer whose ticks stay aligned to a fixed grid.
///
/// Each `wait` sleeps until the next multiple of the period past the first
/// call, regardless of how long the work between calls took, so the average
/// rate holds steady. If a tick is already overdue the wait returns
/// immediately; overdue ticks are skipped rather than replayed in a burst.
#[derive(Debug)]
pub struct MonotonousTimer {
    period: Duration,
    next: Option<Instant>,
}

impl MonotonousTimer {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Blocks until the next grid point and returns the wall-clock instant
    /// of that tick, suitable as a packet consumption deadline.
    ///
    /// A zero period disables pacing: every `wait` returns immediately.
    pub fn wait(&mut self) -> SystemTime {
        if self.period.is_zero() {
            return SystemTime::now();
        }
        let now = Instant::now();
        let target = match self.next {
            None => now,
            Some(mut t) => {
                // Skip past any ticks missed while the caller was busy,
                // firing on the most recent grid point instead.
                if t <= now {
                    while t <= now {
                        t += self.period;
                    }
                    t -= self.period;
                }
                t
            }
        };
        if target > now {
            thread::sleep(target - now);
        }
        self.next = Some(target + self.period);
        SystemTime::now()
    }

    /// Forgets the grid; the next `wait` returns immediately and starts a
    /// fresh one.
    pub fn reset(&mut self) {
        self.next = None;
    }
}
