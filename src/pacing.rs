use std::time::{Duration, Instant};

/// Fixed-rate frame limiter for the sampling loop.
///
/// Deadlines advance by a whole period each tick. If a tick overran, the
/// schedule restarts from now instead of bursting to catch up.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    /// Time left until the next deadline, or `None` if it already passed.
    pub fn sleep_for(&self, now: Instant) -> Option<Duration> {
        self.next.checked_duration_since(now).filter(|d| !d.is_zero())
    }

    /// Block until the next tick is due.
    pub fn wait(&mut self) {
        let now = Instant::now();
        match self.sleep_for(now) {
            Some(sleep) => {
                std::thread::sleep(sleep);
                self.next += self.period;
            }
            None => self.next = now + self.period,
        }
    }
}
