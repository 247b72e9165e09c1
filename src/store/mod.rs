pub mod branches;
pub mod executor;
pub mod ledger;
pub mod platform;
pub mod postgres;
pub mod projects;
pub mod sqlite;
pub mod tasks;

pub use branches::*;
pub use executor::*;
pub use ledger::*;
pub use platform::*;
pub use postgres::*;
pub use projects::*;
pub use sqlite::*;
pub use tasks::*;
