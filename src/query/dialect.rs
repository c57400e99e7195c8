/// SQL dialect differences that matter when assembling CRUD statements.
///
/// `MySql` has no driver here; it is available for assembling statements
/// that are executed elsewhere. The default follows the default backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    MySql,
    #[default]
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Quote character wrapped around column names
    pub fn identifier_quote(&self) -> char {
        match self {
            Dialect::MySql | Dialect::Sqlite => '`',
            Dialect::Postgres => '"',
        }
    }

    /// Placeholder for the 1-based parameter position `idx`
    pub fn placeholder(&self, idx: usize) -> String {
        match self {
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${idx}"),
        }
    }

    /// WHERE clause used when no condition is given; matches every row
    pub fn always_true(&self) -> &'static str {
        match self {
            Dialect::MySql | Dialect::Sqlite => "1",
            Dialect::Postgres => "TRUE",
        }
    }

    /// Suffix appended to generated INSERT statements so the driver can report the new key
    pub fn insert_suffix(&self) -> &'static str {
        match self {
            Dialect::MySql | Dialect::Sqlite => "",
            Dialect::Postgres => " RETURNING *",
        }
    }
}
