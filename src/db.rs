//! The CRUD helper: builds parameterized statements, runs them through a
//! [`Driver`] and keeps the last executed statement for the result accessors.
//!
//! A `Db` supports one in-flight statement. Every query call replaces the
//! previous [`Statement`] together with its unread rows.

use crate::{
    config::DbConfig,
    connection::DatabaseConnection,
    parameters::{ColumnMap, ParameterValue, bind_types},
    query::{BuiltQuery, Glue, build_delete, build_insert, build_select, build_update},
    result::Result,
    runner::{Driver, Executed, Row},
};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;

/// An executed statement and its unread result rows
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<ParameterValue>,
    affected_rows: u64,
    last_insert_id: i64,
    result_set: Option<VecDeque<Row>>,
}

impl Statement {
    fn new(sql: String, params: Vec<ParameterValue>, executed: Executed) -> Self {
        Self {
            sql,
            params,
            affected_rows: executed.affected_rows,
            last_insert_id: executed.last_insert_id,
            result_set: executed.rows.map(VecDeque::from),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[ParameterValue] {
        &self.params
    }

    /// Bind-type string of the parameters, e.g. `"si"`
    pub fn bind_types(&self) -> String {
        bind_types(&self.params)
    }

    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    pub fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    /// Whether the statement produced a result set (even an empty one)
    pub fn has_result_set(&self) -> bool {
        self.result_set.is_some()
    }

    /// Fetch the next row as a column map, advancing the cursor
    pub fn one(&mut self) -> Option<Row> {
        self.result_set.as_mut().and_then(VecDeque::pop_front)
    }

    /// Fetch the next row deserialized into `T`, advancing the cursor
    pub fn one_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.one() {
            Some(row) => Ok(Some(serde_json::from_value(serde_json::Value::Object(row))?)),
            None => Ok(None),
        }
    }

    /// Fetch every remaining row
    pub fn all(&mut self) -> Vec<Row> {
        self.result_set
            .as_mut()
            .map(|rows| rows.drain(..).collect())
            .unwrap_or_default()
    }
}

/// Parameterized CRUD and transaction helper over a single connection
pub struct Db<D: Driver = DatabaseConnection> {
    driver: D,
    debug: bool,
    statement: Option<Statement>,
}

impl Db<DatabaseConnection> {
    /// Check the backend driver is available, then open the configured connection
    pub fn connect(config: &DbConfig) -> Result<Self> {
        let driver = DatabaseConnection::open(config)?;
        Ok(Self::with_driver(driver, config.debug))
    }

    /// In-memory SQLite database with default settings
    pub fn open_in_memory() -> Result<Self> {
        Self::connect(&DbConfig::default())
    }
}

impl<D: Driver> Db<D> {
    pub fn with_driver(driver: D, debug: bool) -> Self {
        Self {
            driver,
            debug,
            statement: None,
        }
    }

    /// Toggle strict reporting; when on, statements and failures are logged
    pub fn set_debug_mode(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Insert one row and return the identifier generated for it.
    ///
    /// Columns are written in the order of `data`; an empty map is rejected.
    pub fn insert(&mut self, table: &str, data: &ColumnMap) -> Result<i64> {
        let built = build_insert(self.driver.dialect(), table, data)?;
        Ok(self.execute(built)?.last_insert_id())
    }

    /// Update matching rows and return how many were affected.
    ///
    /// An empty `conditions` map produces the dialect's always-true literal
    /// (`WHERE 1`, `WHERE TRUE` on PostgreSQL) and updates every row of the
    /// table.
    pub fn update(
        &mut self,
        table: &str,
        data: &ColumnMap,
        conditions: &ColumnMap,
        glue: Glue,
    ) -> Result<u64> {
        let built = build_update(self.driver.dialect(), table, data, conditions, glue)?;
        if conditions.is_empty() {
            tracing::warn!(table, "update without conditions affects every row");
        }
        Ok(self.execute(built)?.affected_rows())
    }

    /// Delete matching rows and return how many were affected.
    ///
    /// An empty `conditions` map produces the dialect's always-true literal
    /// and empties the table.
    pub fn delete(&mut self, table: &str, conditions: &ColumnMap, glue: Glue) -> Result<u64> {
        let built = build_delete(self.driver.dialect(), table, conditions, glue)?;
        if conditions.is_empty() {
            tracing::warn!(table, "delete without conditions affects every row");
        }
        Ok(self.execute(built)?.affected_rows())
    }

    pub fn delete_using_and(&mut self, table: &str, conditions: &ColumnMap) -> Result<u64> {
        self.delete(table, conditions, Glue::And)
    }

    pub fn delete_using_or(&mut self, table: &str, conditions: &ColumnMap) -> Result<u64> {
        self.delete(table, conditions, Glue::Or)
    }

    /// First matching row as a column map, or `None` when nothing matches.
    ///
    /// The select carries no LIMIT: every matching row is materialized and
    /// the ones after the first stay readable through [`Db::one`] and
    /// [`Db::all`] until the next statement replaces them.
    pub fn find_one(
        &mut self,
        table: &str,
        conditions: &ColumnMap,
        glue: Glue,
    ) -> Result<Option<Row>> {
        let built = build_select(self.driver.dialect(), table, conditions, glue)?;
        Ok(self.execute(built)?.one())
    }

    /// First matching row deserialized into `T`, or `None` when nothing matches.
    ///
    /// Remaining rows are kept as in [`Db::find_one`].
    pub fn find_one_as<T: DeserializeOwned>(
        &mut self,
        table: &str,
        conditions: &ColumnMap,
        glue: Glue,
    ) -> Result<Option<T>> {
        let built = build_select(self.driver.dialect(), table, conditions, glue)?;
        self.execute(built)?.one_as()
    }

    pub fn find_all(&mut self, table: &str, conditions: &ColumnMap, glue: Glue) -> Result<Vec<Row>> {
        let built = build_select(self.driver.dialect(), table, conditions, glue)?;
        Ok(self.execute(built)?.all())
    }

    /// Run arbitrary parameterized SQL; placeholders follow the backend's dialect
    pub fn query(&mut self, sql: &str, params: &[ParameterValue]) -> Result<&mut Statement> {
        self.execute(BuiltQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        })
    }

    /// Execute an already built query and make it the current statement.
    ///
    /// On failure the current statement is cleared.
    pub fn execute(&mut self, built: BuiltQuery) -> Result<&mut Statement> {
        let BuiltQuery { sql, params } = built;
        self.statement = None;

        tracing::trace!(sql = %sql, "executing statement");
        if self.debug {
            tracing::debug!(sql = %sql, types = %bind_types(&params), "executing statement");
        }

        match self.driver.execute(&sql, &params) {
            Ok(executed) => Ok(self.statement.insert(Statement::new(sql, params, executed))),
            Err(err) => {
                if self.debug {
                    tracing::error!(sql = %sql, error = %err, "statement failed");
                }
                Err(err)
            }
        }
    }

    /// Affected-row count of the current statement, 0 when none has run
    pub fn affected_rows(&self) -> u64 {
        self.statement
            .as_ref()
            .map_or(0, Statement::affected_rows)
    }

    pub fn last_statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    /// Next row of the current statement's result set
    pub fn one(&mut self) -> Option<Row> {
        self.statement.as_mut().and_then(Statement::one)
    }

    pub fn one_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.statement.as_mut() {
            Some(statement) => statement.one_as(),
            None => Ok(None),
        }
    }

    /// Remaining rows of the current statement's result set
    pub fn all(&mut self) -> Vec<Row> {
        self.statement
            .as_mut()
            .map(Statement::all)
            .unwrap_or_default()
    }

    pub fn start_transaction(&mut self) -> Result<()> {
        if self.debug {
            tracing::debug!("starting transaction");
        }
        self.driver.begin()
    }

    /// Commit the open transaction.
    ///
    /// If the commit fails the transaction is rolled back and the commit
    /// error is returned. A failing rollback is only logged.
    pub fn end_transaction(&mut self) -> Result<()> {
        let Err(err) = self.driver.commit() else {
            return Ok(());
        };

        if let Err(rollback_err) = self.driver.rollback() {
            tracing::warn!(error = %rollback_err, "rollback after failed commit failed");
        }
        if self.debug {
            tracing::error!(error = %err, "commit failed, transaction rolled back");
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{query::Dialect, result::DbError};
    use serde_json::json;

    /// Records every driver call and replays canned results
    #[derive(Default)]
    struct RecordingDriver {
        calls: Vec<String>,
        executed: Vec<(String, Vec<ParameterValue>)>,
        next_result: Option<Executed>,
        fail_execute: bool,
        fail_commit: bool,
        fail_rollback: bool,
    }

    impl Driver for RecordingDriver {
        fn dialect(&self) -> Dialect {
            Dialect::MySql
        }

        fn execute(&mut self, sql: &str, params: &[ParameterValue]) -> Result<Executed> {
            self.calls.push("execute".to_string());
            self.executed.push((sql.to_string(), params.to_vec()));
            if self.fail_execute {
                return Err(DbError::new_query("Table 'shop.missing' doesn't exist"));
            }
            Ok(self.next_result.take().unwrap_or_default())
        }

        fn begin(&mut self) -> Result<()> {
            self.calls.push("begin".to_string());
            Ok(())
        }

        fn commit(&mut self) -> Result<()> {
            self.calls.push("commit".to_string());
            if self.fail_commit {
                return Err(DbError::new_query("Deadlock found when trying to get lock"));
            }
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            self.calls.push("rollback".to_string());
            if self.fail_rollback {
                return Err(DbError::new_query("Lost connection"));
            }
            Ok(())
        }
    }

    fn db_with(driver: RecordingDriver) -> Db<RecordingDriver> {
        Db::with_driver(driver, true)
    }

    #[test]
    fn test_insert_sends_sql_and_params_in_map_order() {
        let mut db = db_with(RecordingDriver {
            next_result: Some(Executed {
                affected_rows: 1,
                last_insert_id: 17,
                rows: None,
            }),
            ..Default::default()
        });

        let data = ColumnMap::new().with("name", "Ann").with("age", 30);
        let id = db.insert("users", &data).unwrap();

        assert_eq!(id, 17);
        let (sql, params) = &db.driver().executed[0];
        assert_eq!(sql, "INSERT INTO users (`name`,`age`) VALUES (?,?)");
        assert_eq!(params, &vec![ParameterValue::from("Ann"), ParameterValue::from(30)]);
        assert_eq!(db.last_statement().unwrap().bind_types(), "si");
    }

    #[test]
    fn test_update_params_are_data_then_conditions() {
        let mut db = db_with(RecordingDriver {
            next_result: Some(Executed {
                affected_rows: 1,
                ..Default::default()
            }),
            ..Default::default()
        });

        let affected = db
            .update(
                "users",
                &ColumnMap::new().with("age", 31),
                &ColumnMap::new().with("name", "Ann"),
                Glue::And,
            )
            .unwrap();

        assert_eq!(affected, 1);
        let (sql, params) = &db.driver().executed[0];
        assert_eq!(sql, "UPDATE users SET `age`=? WHERE `name`=?");
        assert_eq!(params, &vec![ParameterValue::from(31), ParameterValue::from("Ann")]);
    }

    #[test]
    fn test_empty_insert_never_reaches_driver() {
        let mut db = db_with(RecordingDriver::default());
        let err = db.insert("users", &ColumnMap::new()).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput(_)));
        assert!(db.driver().calls.is_empty());
    }

    #[test]
    fn test_invalid_table_never_reaches_driver() {
        let mut db = db_with(RecordingDriver::default());
        let err = db
            .delete("users; DROP TABLE users", &ColumnMap::new(), Glue::And)
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier(_)));
        assert!(db.driver().calls.is_empty());
    }

    #[test]
    fn test_affected_rows_is_zero_before_any_statement() {
        let db = db_with(RecordingDriver::default());
        assert_eq!(db.affected_rows(), 0);
        assert!(db.last_statement().is_none());
    }

    #[test]
    fn test_failed_execute_clears_current_statement() {
        let mut db = db_with(RecordingDriver {
            next_result: Some(Executed {
                affected_rows: 4,
                ..Default::default()
            }),
            ..Default::default()
        });
        db.delete_using_or("users", &ColumnMap::new()).unwrap();
        assert_eq!(db.affected_rows(), 4);

        db.driver.fail_execute = true;
        let err = db.query("SELECT * FROM missing", &[]).unwrap_err();
        assert!(matches!(err, DbError::Query(_)));
        assert_eq!(db.affected_rows(), 0);
        assert!(db.one().is_none());
    }

    #[test]
    fn test_one_advances_and_all_drains_remaining() {
        let rows: Vec<Row> = (1..=3)
            .map(|id| json!({"id": id}).as_object().unwrap().clone())
            .collect();
        let mut db = db_with(RecordingDriver {
            next_result: Some(Executed {
                affected_rows: 3,
                last_insert_id: 0,
                rows: Some(rows),
            }),
            ..Default::default()
        });

        db.query("SELECT id FROM t", &[]).unwrap();
        assert_eq!(db.one().unwrap()["id"], json!(1));
        let rest = db.all();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0]["id"], json!(2));
        assert!(db.one().is_none());
        assert!(db.all().is_empty());
    }

    #[test]
    fn test_one_on_statement_without_result_set() {
        let mut db = db_with(RecordingDriver::default());
        db.query("UPDATE t SET a = ?", &[ParameterValue::from(1)])
            .unwrap();
        assert!(!db.last_statement().unwrap().has_result_set());
        assert!(db.one().is_none());
        assert_eq!(db.one_as::<serde_json::Value>().unwrap(), None);
    }

    #[test]
    fn test_end_transaction_commits() {
        let mut db = db_with(RecordingDriver::default());
        db.start_transaction().unwrap();
        db.end_transaction().unwrap();
        assert_eq!(db.driver().calls, vec!["begin", "commit"]);
    }

    #[test]
    fn test_commit_failure_rolls_back_before_error() {
        let mut db = db_with(RecordingDriver {
            fail_commit: true,
            ..Default::default()
        });
        db.start_transaction().unwrap();
        let err = db.end_transaction().unwrap_err();

        assert_eq!(db.driver().calls, vec!["begin", "commit", "rollback"]);
        match err {
            DbError::Query(message) => assert!(message.contains("Deadlock")),
            other => panic!("Expected Query error, got {other:?}"),
        }
    }

    #[test]
    fn test_rollback_failure_still_reports_commit_error() {
        let mut db = db_with(RecordingDriver {
            fail_commit: true,
            fail_rollback: true,
            ..Default::default()
        });
        let err = db.end_transaction().unwrap_err();
        match err {
            DbError::Query(message) => assert!(message.contains("Deadlock")),
            other => panic!("Expected Query error, got {other:?}"),
        }
    }

    #[test]
    fn test_set_debug_mode() {
        let mut db = Db::with_driver(RecordingDriver::default(), false);
        assert!(!db.is_debug());
        db.set_debug_mode(true);
        assert!(db.is_debug());
    }
}
