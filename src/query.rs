pub mod builder;
pub mod dialect;

pub use builder::{BuiltQuery, Glue, build_delete, build_insert, build_select, build_update, where_clause};
pub use dialect::Dialect;
