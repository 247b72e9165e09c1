pub mod branch_ops;
pub mod project_ops;
pub mod replay;

pub use branch_ops::*;
pub use project_ops::*;
pub use replay::*;
