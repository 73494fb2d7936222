pub mod action;
pub mod operations;
pub mod path_builder;


pub use action::{ActionState, ResponseInfo};
pub use operations::WebDavClient;
