pub mod request_data;
pub mod sink;
pub mod socket_monitor;

pub use request_data::RequestData;
pub use sink::{ChannelSink, DataSink, MemorySink, SinkMessage};
pub use socket_monitor::{SocketMonitor, SocketStatistics};
