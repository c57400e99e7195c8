pub mod config;
pub mod connection;
pub mod db;
pub mod parameters;
pub mod query;
pub mod result;
pub mod runner;
#[cfg(feature = "postgresql")]
pub mod runner_postgresql;
pub mod runner_sqlite;
pub mod str_utils;

// Re-export types for convenience
pub use config::{Backend, DbConfig};
pub use connection::DatabaseConnection;
pub use db::{Db, Statement};
pub use parameters::{BindTag, ColumnMap, ParameterValue, bind_types};
pub use query::{BuiltQuery, Dialect, Glue};
pub use result::{DbError, Result};
pub use runner::{Driver, Executed, Row};
pub use runner_sqlite::SqliteDriver;

#[cfg(feature = "postgresql")]
pub use runner_postgresql::PostgresDriver;

// Re-export third-party types used in the public API to provide fallback for dependency conflicts
pub use serde_json::Value as JsonValue;

// Re-export third-party types used in the public API to provide fallback for dependency conflicts
pub use rusqlite::Connection as SqliteConnection;
