//! Pure SQL assembly for the CRUD helpers.
//!
//! Table and column names are interpolated into the SQL text after passing the
//! identifier allow-list; only values travel through the parameter list.

use super::dialect::Dialect;
use crate::{
    parameters::{ColumnMap, ParameterValue},
    result::{DbError, Result},
    str_utils::{quote_identifier, validate_column_name, validate_table_name},
};

/// Boolean operator joining the comparisons of a WHERE clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Glue {
    #[default]
    And,
    Or,
}

impl Glue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Glue::And => "AND",
            Glue::Or => "OR",
        }
    }
}

impl std::fmt::Display for Glue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL text plus the positional parameters for its placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<ParameterValue>,
}

/// Render `col=<placeholder>` pairs, numbering placeholders from `first_idx`
fn assignments(dialect: Dialect, columns: &ColumnMap, first_idx: usize) -> Result<Vec<String>> {
    columns
        .columns()
        .enumerate()
        .map(|(offset, column)| {
            validate_column_name(column)?;
            Ok(format!(
                "{}={}",
                quote_identifier(column, dialect.identifier_quote()),
                dialect.placeholder(first_idx + offset)
            ))
        })
        .collect()
}

/// Build the body of a WHERE clause.
///
/// Each condition becomes an equality comparison joined by `glue`. An empty
/// condition map yields the dialect's always-true literal, so the statement
/// applies to every row of the table.
pub fn where_clause(
    dialect: Dialect,
    conditions: &ColumnMap,
    glue: Glue,
    first_idx: usize,
) -> Result<String> {
    if conditions.is_empty() {
        return Ok(dialect.always_true().to_string());
    }
    let comparisons = assignments(dialect, conditions, first_idx)?;
    Ok(comparisons.join(&format!(" {glue} ")))
}

pub fn build_insert(dialect: Dialect, table: &str, data: &ColumnMap) -> Result<BuiltQuery> {
    validate_table_name(table)?;
    if data.is_empty() {
        return Err(DbError::new_invalid_input(format!(
            "no columns given for insert into {table}"
        )));
    }

    let mut columns = Vec::with_capacity(data.len());
    let mut placeholders = Vec::with_capacity(data.len());
    for (idx, column) in data.columns().enumerate() {
        validate_column_name(column)?;
        columns.push(quote_identifier(column, dialect.identifier_quote()));
        placeholders.push(dialect.placeholder(idx + 1));
    }

    Ok(BuiltQuery {
        sql: format!(
            "INSERT INTO {table} ({}) VALUES ({}){}",
            columns.join(","),
            placeholders.join(","),
            dialect.insert_suffix()
        ),
        params: data.values().cloned().collect(),
    })
}

/// Build an UPDATE; an empty `conditions` map updates every row
pub fn build_update(
    dialect: Dialect,
    table: &str,
    data: &ColumnMap,
    conditions: &ColumnMap,
    glue: Glue,
) -> Result<BuiltQuery> {
    validate_table_name(table)?;
    if data.is_empty() {
        return Err(DbError::new_invalid_input(format!(
            "no columns given for update of {table}"
        )));
    }

    let set_clause = assignments(dialect, data, 1)?.join(",");
    let where_sql = where_clause(dialect, conditions, glue, data.len() + 1)?;

    Ok(BuiltQuery {
        sql: format!("UPDATE {table} SET {set_clause} WHERE {where_sql}"),
        params: data.values().chain(conditions.values()).cloned().collect(),
    })
}

/// Build a DELETE; an empty `conditions` map deletes every row
pub fn build_delete(
    dialect: Dialect,
    table: &str,
    conditions: &ColumnMap,
    glue: Glue,
) -> Result<BuiltQuery> {
    validate_table_name(table)?;
    let where_sql = where_clause(dialect, conditions, glue, 1)?;

    Ok(BuiltQuery {
        sql: format!("DELETE FROM {table} WHERE {where_sql}"),
        params: conditions.values().cloned().collect(),
    })
}

pub fn build_select(
    dialect: Dialect,
    table: &str,
    conditions: &ColumnMap,
    glue: Glue,
) -> Result<BuiltQuery> {
    validate_table_name(table)?;
    let where_sql = where_clause(dialect, conditions, glue, 1)?;

    Ok(BuiltQuery {
        sql: format!("SELECT * FROM {table} WHERE {where_sql}"),
        params: conditions.values().cloned().collect(),
    })
}
