//! Wire-level performance measurement for WebDAV load tests.
//!
//! The crate sits between a load-test script and the network: every simulated
//! user ("session") runs a chain of WebDAV actions, each action executes its
//! HTTP request through an instrumented executor, and every attempt yields
//! exactly one [`RequestData`] record delivered to a pluggable [`DataSink`],
//! independent of whether the attempt succeeded, returned a server error, or
//! failed on the wire.
//!
//! [`RequestData`]: instrumentation::RequestData
//! [`DataSink`]: instrumentation::DataSink

pub mod actions;
pub mod configuration;
pub mod error_handling;
pub mod instrumentation;
pub mod session_context;
pub mod transport;

pub use actions::{ActionState, WebDavClient};
pub use configuration::{Credentials, WebDavConfig};
pub use instrumentation::{ChannelSink, DataSink, MemorySink, RequestData, SocketStatistics};
pub use session_context::WebDavContext;
pub use transport::{HttpRequest, HttpResponse, Method};
