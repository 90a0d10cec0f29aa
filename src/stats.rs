use log::info;
use std::time::Instant;

/// Receiver-side counters, printed periodically.
#[derive(Debug, Clone)]
pub struct Stats {
    pub received: u64,
    pub unknown: u64,
    pub timeouts: u64,
    pub bytes: u64,
    window_start: u64,
    t0: Instant,
    last: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            received: 0,
            unknown: 0,
            timeouts: 0,
            bytes: 0,
            window_start: 0,
            t0: Instant::now(),
            last: Instant::now(),
        }
    }
    pub fn add_bytes(&mut self, n: usize) {
        self.bytes += n as u64;
    }
    pub fn inc_received(&mut self) {
        self.received += 1;
    }
    pub fn inc_unknown(&mut self) {
        self.unknown += 1;
    }
    pub fn inc_timeouts(&mut self) {
        self.timeouts += 1;
    }

    /// Datagrams per second since the last report.
    pub fn rate(&self) -> f64 {
        let dur = self.t0.elapsed().as_secs_f64().max(1e-3);
        (self.received - self.window_start) as f64 / dur
    }

    pub fn maybe_print(&mut self, stats_int: f64) {
        if self.last.elapsed().as_secs_f64() >= stats_int {
            info!(
                "[rx] received={} unknown={} timeouts={} bytes={} => {:.1} cmd/s",
                self.received,
                self.unknown,
                self.timeouts,
                self.bytes,
                self.rate(),
            );
            self.window_start = self.received;
            self.last = Instant::now();
            self.t0 = Instant::now();
        }
    }
}
