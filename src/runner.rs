use crate::{parameters::ParameterValue, query::Dialect, result::Result};

/// A result row keyed by column name, in column order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Outcome of a single prepared-statement execution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Executed {
    /// Rows changed by a mutation, or rows produced by a row-returning statement
    pub affected_rows: u64,
    /// Identifier generated by the most recent successful INSERT on the connection
    pub last_insert_id: i64,
    /// Materialized rows when the statement returns a result set
    pub rows: Option<Vec<Row>>,
}

/// Trait for executing parameterized SQL against a database backend.
///
/// Every call blocks until the underlying client returns. Implementations
/// hold exactly one connection.
pub trait Driver {
    /// SQL dialect the generated CRUD statements must follow
    fn dialect(&self) -> Dialect;

    /// Prepare `sql`, bind `params` positionally and execute it
    fn execute(&mut self, sql: &str, params: &[ParameterValue]) -> Result<Executed>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}
