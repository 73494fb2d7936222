//! The HTTP execution interceptor.
//!
//! `InstrumentedExecutor` decorates the injected [`RequestExecutor`] so that
//! every attempt produces exactly one performance record, on every exit path.
//! The wrapped call's result is passed through untouched: a network error
//! reaches the caller with its original kind and message, and a server error
//! status is returned as a normal response.

use std::sync::Arc;
use std::time::Instant;

use log::trace;

use crate::actions::action::ActionState;
use crate::error_handling::types::TransportError;
use crate::instrumentation::request_data::RequestData;
use crate::instrumentation::sink::DataSink;
use crate::instrumentation::socket_monitor::SocketMonitor;

use super::executor::RequestExecutor;
use super::types::{HttpRequest, HttpResponse};

/// Decorator around the low-level request executor that measures each attempt
/// and hands the finished record to the data sink.
///
/// One instance belongs to one session's client. The attempt-scoped
/// [`SocketMonitor`] is reset before the inner call and read exactly once
/// after it, so two attempts never see each other's counters (a session runs
/// one operation at a time).
pub struct InstrumentedExecutor {
    inner: Box<dyn RequestExecutor>,
    monitor: SocketMonitor,
    sink: Arc<dyn DataSink>,
}

impl InstrumentedExecutor {
    pub fn new(inner: Box<dyn RequestExecutor>, sink: Arc<dyn DataSink>) -> Self {
        Self {
            inner,
            monitor: SocketMonitor::new(),
            sink,
        }
    }

    /// Executes the request on behalf of `action`.
    ///
    /// Always, exactly once per call and in this order: resets the monitor,
    /// invokes the inner executor, updates the action's last-response state,
    /// builds one [`RequestData`] from one monitor snapshot and delivers it to
    /// the sink. On failure an additional "Exception" event is emitted and the
    /// original error is returned unchanged.
    pub async fn execute(
        &self,
        request: &HttpRequest,
        action: &ActionState,
    ) -> Result<HttpResponse, TransportError> {
        self.monitor.reset();
        let started = Instant::now();
        trace!(
            "[{}] dispatching {} {}",
            action.session_id(),
            request.method,
            request.url()
        );

        let result = self.inner.execute(request, &self.monitor).await;

        let (status_code, content_type, failed) = match &result {
            Ok(response) => {
                let content_type = response.content_type();
                action.record_response(response.status, content_type.clone());
                (Some(response.status), content_type, response.is_server_error())
            }
            Err(e) => {
                action.record_error(&e.to_string());
                (None, None, true)
            }
        };

        let stats = self.monitor.snapshot();
        let record = RequestData::from_attempt(
            action.timer_name(),
            action.session_id(),
            request.method.as_str(),
            &request.url(),
            status_code,
            content_type,
            failed,
            started.elapsed(),
            &stats,
        );
        self.sink.log_request(record);
        if let Err(e) = &result {
            self.sink.log_event("Exception", &e.to_string());
        }

        result
    }
}
