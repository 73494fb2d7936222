use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Wire-level measurements for exactly one HTTP attempt.
///
/// All fields describe a single request/response cycle, never cumulative
/// session totals. Durations left at zero mean the attempt never reached the
/// corresponding phase (e.g. a connect failure leaves the send phase at zero).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketStatistics {
    /// Raw bytes written to the socket (request head and body).
    pub bytes_sent: u64,
    /// Raw bytes read from the socket (status line, headers and body).
    pub bytes_received: u64,
    /// Time spent resolving the target host.
    pub dns_lookup_time: Duration,
    /// Time spent establishing the TCP connection.
    pub connect_time: Duration,
    /// Time spent writing the request.
    pub send_time: Duration,
    /// Time between the end of the request and the first response byte.
    pub server_busy_time: Duration,
    /// Time between the first and the last response byte.
    pub receive_time: Duration,
    /// Time from the start of the attempt to the first response byte.
    pub time_to_first_byte: Duration,
    /// Time from the start of the attempt to the last response byte.
    pub time_to_last_byte: Duration,
}

struct MonitorInner {
    started: Instant,
    stats: SocketStatistics,
}

/// Per-attempt collector the transport layer records into while a request is
/// in flight.
///
/// The monitor is reset by the interceptor before every attempt and read once
/// via [`snapshot`] after the attempt completes. One monitor instance belongs
/// to one session's client; a session issues one request at a time, so an
/// attempt never observes another attempt's counters.
///
/// [`snapshot`]: SocketMonitor::snapshot
pub struct SocketMonitor {
    inner: Mutex<MonitorInner>,
}

impl SocketMonitor {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MonitorInner {
                started: Instant::now(),
                stats: SocketStatistics::default(),
            }),
        }
    }

    /// Clears all counters and restarts the attempt clock.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.started = Instant::now();
        inner.stats = SocketStatistics::default();
    }

    pub fn record_dns_lookup(&self, elapsed: Duration) {
        self.inner.lock().unwrap().stats.dns_lookup_time = elapsed;
    }

    pub fn record_connect(&self, elapsed: Duration) {
        self.inner.lock().unwrap().stats.connect_time = elapsed;
    }

    pub fn record_send(&self, elapsed: Duration) {
        self.inner.lock().unwrap().stats.send_time = elapsed;
    }

    pub fn record_server_busy(&self, elapsed: Duration) {
        self.inner.lock().unwrap().stats.server_busy_time = elapsed;
    }

    pub fn record_receive(&self, elapsed: Duration) {
        self.inner.lock().unwrap().stats.receive_time = elapsed;
    }

    pub fn add_bytes_sent(&self, n: u64) {
        self.inner.lock().unwrap().stats.bytes_sent += n;
    }

    pub fn add_bytes_received(&self, n: u64) {
        self.inner.lock().unwrap().stats.bytes_received += n;
    }

    /// Stamps the time-to-first-byte relative to the attempt start. Only the
    /// first call after a reset takes effect.
    pub fn mark_first_byte(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.stats.time_to_first_byte == Duration::ZERO {
            inner.stats.time_to_first_byte = inner.started.elapsed();
        }
    }

    /// Stamps the time-to-last-byte relative to the attempt start.
    pub fn mark_last_byte(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.stats.time_to_last_byte = inner.started.elapsed();
    }

    /// Returns a copy of the current counters.
    pub fn snapshot(&self) -> SocketStatistics {
        self.inner.lock().unwrap().stats.clone()
    }
}

impl Default for SocketMonitor {
    fn default() -> Self {
        Self::new()
    }
}
