use crate::{
    parameters::ParameterValue,
    query::Dialect,
    result::{DbError, Result},
    runner::{Driver, Executed, Row},
};
use rusqlite::{
    Connection,
    types::{ToSqlOutput, ValueRef},
};
use std::path::Path;

// Bind tags map one-to-one onto SQLite storage classes
impl rusqlite::ToSql for ParameterValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            ParameterValue::Integer(i) => ValueRef::Integer(*i),
            ParameterValue::Float(f) => ValueRef::Real(*f),
            ParameterValue::Text(s) => ValueRef::Text(s.as_bytes()),
            ParameterValue::Blob(bytes) => ValueRef::Blob(bytes),
            ParameterValue::Null => ValueRef::Null,
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// Convert a single SQLite column value to JSON
fn sqlite_value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(r) => serde_json::Value::from(r),
        ValueRef::Text(s) => serde_json::Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => serde_json::Value::Array(
            b.iter()
                .map(|&byte| serde_json::Value::Number(byte.into()))
                .collect(),
        ),
        ValueRef::Null => serde_json::Value::Null,
    }
}

/// SQLite backend on a single rusqlite connection
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::new_connection(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::new_connection(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Wrap a connection the caller already configured
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, sql: &str, params: &[ParameterValue]) -> Result<Executed> {
        let mut stmt = self.conn.prepare(sql)?;
        let bound = rusqlite::params_from_iter(params.iter());

        if stmt.column_count() == 0 {
            let changed = stmt.execute(bound)?;
            return Ok(Executed {
                affected_rows: changed as u64,
                last_insert_id: self.conn.last_insert_rowid(),
                rows: None,
            });
        }

        // Get column names before stepping so rows can be keyed by name
        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let rows = stmt.query_map(bound, |row| {
            let mut obj = Row::new();
            for (idx, name) in column_names.iter().enumerate() {
                obj.insert(name.clone(), sqlite_value_to_json(row.get_ref(idx)?));
            }
            Ok(obj)
        })?;
        let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Executed {
            affected_rows: rows.len() as u64,
            last_insert_id: self.conn.last_insert_rowid(),
            rows: Some(rows),
        })
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_driver() -> SqliteDriver {
        let driver = SqliteDriver::open_in_memory().unwrap();
        driver
            .connection()
            .execute(
                "CREATE TABLE source (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, score REAL, data BLOB)",
                [],
            )
            .unwrap();
        driver
    }

    #[test]
    fn test_execute_mutation_reports_changes_and_rowid() {
        let mut driver = setup_driver();
        let executed = driver
            .execute(
                "INSERT INTO source (name, score) VALUES (?, ?)",
                &[ParameterValue::from("a"), ParameterValue::from(1.5)],
            )
            .unwrap();
        assert_eq!(executed.affected_rows, 1);
        assert_eq!(executed.last_insert_id, 1);
        assert!(executed.rows.is_none());
    }

    #[test]
    fn test_execute_select_materializes_rows_in_column_order() {
        let mut driver = setup_driver();
        driver
            .execute(
                "INSERT INTO source (name, score, data) VALUES (?, ?, ?)",
                &[
                    ParameterValue::from("a"),
                    ParameterValue::Null,
                    ParameterValue::from(vec![1u8, 2]),
                ],
            )
            .unwrap();

        let executed = driver.execute("SELECT * FROM source", &[]).unwrap();
        let rows = executed.rows.unwrap();
        assert_eq!(executed.affected_rows, 1);
        assert_eq!(rows.len(), 1);

        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["id", "name", "score", "data"]);
        assert_eq!(rows[0]["name"], serde_json::json!("a"));
        assert_eq!(rows[0]["score"], serde_json::Value::Null);
        assert_eq!(rows[0]["data"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_select_with_no_rows_still_has_result_set() {
        let mut driver = setup_driver();
        let executed = driver
            .execute("SELECT * FROM source WHERE id = ?", &[ParameterValue::from(42)])
            .unwrap();
        assert_eq!(executed.rows, Some(vec![]));
        assert_eq!(executed.affected_rows, 0);
    }

    #[test]
    fn test_prepare_failure_is_query_error() {
        let mut driver = setup_driver();
        let err = driver.execute("INVALID SQL SYNTAX", &[]).unwrap_err();
        assert!(matches!(err, DbError::Query(_)));
    }

    #[test]
    fn test_open_bad_path_is_connection_error() {
        let err = SqliteDriver::open("/nonexistent-dir/for/sure/db.sqlite").unwrap_err();
        assert!(matches!(err, DbError::Connection(_)));
    }
}
