//! Delivery of finished performance records to the results pipeline.
//!
//! The sink is fire-and-forget from the interceptor's point of view: a sink
//! implementation must never propagate a delivery failure back into the
//! request path. Failures are logged and the record is dropped.

use std::sync::Mutex;

use log::warn;
use tokio::sync::mpsc;

use super::request_data::RequestData;

/// Consumer of performance records and named exception events.
///
/// Implementations are injected as `Arc<dyn DataSink>` and must be safe to
/// call from many session tasks in parallel.
pub trait DataSink: Send + Sync {
    /// Accepts one finalized record. Must not fail into the caller.
    fn log_request(&self, record: RequestData);

    /// Accepts a named event, e.g. ("Exception", error message).
    fn log_event(&self, name: &str, message: &str);
}

/// In-memory sink backed by mutex-guarded vectors. Used by tests and local
/// runs that inspect results after the scenario finishes.
pub struct MemorySink {
    records: Mutex<Vec<RequestData>>,
    events: Mutex<Vec<(String, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<RequestData> {
        self.records.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().unwrap().clone()
    }

    /// Exports all collected records as a JSON array.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.records.lock().unwrap())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSink for MemorySink {
    fn log_request(&self, record: RequestData) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(e) => warn!("memory sink poisoned; dropping record: {}", e),
        }
    }

    fn log_event(&self, name: &str, message: &str) {
        match self.events.lock() {
            Ok(mut events) => events.push((name.to_string(), message.to_string())),
            Err(e) => warn!("memory sink poisoned; dropping event: {}", e),
        }
    }
}

/// Message forwarded to the engine's results pipeline by [`ChannelSink`].
#[derive(Debug, Clone)]
pub enum SinkMessage {
    Request(RequestData),
    Event { name: String, message: String },
}

/// Sink that hands records to a tokio channel consumed by the surrounding
/// load-testing engine. A closed channel is logged at warn and the record is
/// dropped; the user's request is never failed because telemetry failed.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<SinkMessage>) -> Self {
        Self { tx }
    }
}

impl DataSink for ChannelSink {
    fn log_request(&self, record: RequestData) {
        if self.tx.send(SinkMessage::Request(record)).is_err() {
            warn!("data sink channel closed; dropping record");
        }
    }

    fn log_event(&self, name: &str, message: &str) {
        let message = SinkMessage::Event {
            name: name.to_string(),
            message: message.to_string(),
        };
        if self.tx.send(message).is_err() {
            warn!("data sink channel closed; dropping event");
        }
    }
}
