//! The performance record emitted for every HTTP attempt.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::socket_monitor::SocketStatistics;

/// One row of request/response measurements, produced exactly once per
/// attempted HTTP call and handed to the data sink.
///
/// `failed` is true iff an error propagated out of the attempt or the server
/// answered with a status of 500 or above. A 4xx answer is not a failure at
/// this layer; the operation's own post-checks decide what to make of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestData {
    /// Unique record identifier.
    pub id: Uuid,
    /// Wall-clock time the attempt was started.
    pub timestamp: DateTime<Utc>,
    /// Timer name of the operation this attempt belongs to.
    pub name: String,
    /// Session the operation was issued from.
    pub session_id: String,
    /// HTTP method of the request.
    pub method: String,
    /// Full request URL.
    pub url: String,
    /// Response status code; `None` when no response was received.
    pub status_code: Option<u16>,
    /// Response content type, if the server sent one.
    pub content_type: Option<String>,
    /// Whether this attempt counts as failed.
    pub failed: bool,
    /// Total time from dispatch to completion of the attempt.
    pub run_time: Duration,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub dns_lookup_time: Duration,
    pub connect_time: Duration,
    pub send_time: Duration,
    pub server_busy_time: Duration,
    pub receive_time: Duration,
    pub time_to_first_byte: Duration,
    pub time_to_last_byte: Duration,
}

impl RequestData {
    /// Builds the finalized record from the attempt outcome and the socket
    /// statistics snapshot taken after the attempt.
    #[allow(clippy::too_many_arguments)]
    pub fn from_attempt(
        name: &str,
        session_id: &str,
        method: &str,
        url: &str,
        status_code: Option<u16>,
        content_type: Option<String>,
        failed: bool,
        run_time: Duration,
        stats: &SocketStatistics,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            name: name.to_string(),
            session_id: session_id.to_string(),
            method: method.to_string(),
            url: url.to_string(),
            status_code,
            content_type,
            failed,
            run_time,
            bytes_sent: stats.bytes_sent,
            bytes_received: stats.bytes_received,
            dns_lookup_time: stats.dns_lookup_time,
            connect_time: stats.connect_time,
            send_time: stats.send_time,
            server_busy_time: stats.server_busy_time,
            receive_time: stats.receive_time,
            time_to_first_byte: stats.time_to_first_byte,
            time_to_last_byte: stats.time_to_last_byte,
        }
    }
}
