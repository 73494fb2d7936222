pub mod config;
pub mod types;

pub use config::WebDavConfig;
pub use types::Credentials;
