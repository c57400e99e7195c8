use thiserror::Error;

/// Main error type for the sqlcrud library
#[derive(Error, Debug)]
pub enum DbError {
    #[error("DB connection error :: {0}")]
    Connection(String),
    #[error("DB error :: {0}")]
    Query(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    pub fn new_connection(message: impl Into<String>) -> Self {
        DbError::Connection(message.into())
    }

    pub fn new_query(message: impl Into<String>) -> Self {
        DbError::Query(message.into())
    }

    pub fn new_configuration(message: impl Into<String>) -> Self {
        DbError::Configuration(message.into())
    }

    pub fn new_invalid_identifier(identifier: impl Into<String>) -> Self {
        DbError::InvalidIdentifier(identifier.into())
    }

    pub fn new_invalid_input(message: impl Into<String>) -> Self {
        DbError::InvalidInput(message.into())
    }
}

// Driver failures during prepare/bind/execute are all reported as query errors;
// connection paths map to `DbError::Connection` explicitly.
impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Query(err.to_string())
    }
}

#[cfg(feature = "postgresql")]
impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Display of a server error is just "db error"; the source carries the message
        let message = match err.as_db_error() {
            Some(db_err) => db_err.message().to_string(),
            None => err.to_string(),
        };
        DbError::Query(message)
    }
}

/// Type alias for Results using DbError
pub type Result<T> = std::result::Result<T, DbError>;
