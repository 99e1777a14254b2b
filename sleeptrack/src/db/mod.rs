//! Database module for `SQLite` operations.

mod connection;
mod queries;

pub use connection::Database;
pub use queries::NightQueries;
