pub mod handlers;
pub mod routes;
pub mod tools;

pub use handlers::*;
pub use routes::*;
pub use tools::{call_tool as dispatch_tool, catalogue, ToolDescriptor};
