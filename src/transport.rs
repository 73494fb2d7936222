pub mod executor;
pub mod interceptor;
pub mod types;

pub use executor::{DnsResolver, RequestExecutor, SystemResolver, TcpRequestExecutor};
pub use interceptor::InstrumentedExecutor;
pub use types::{HttpRequest, HttpResponse, Method};
