pub mod branch;
pub mod common;
pub mod migration;
pub mod project;

pub use branch::*;
pub use common::*;
pub use migration::*;
pub use project::*;
