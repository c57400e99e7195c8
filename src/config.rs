use crate::result::{DbError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Database backend a configuration connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Postgresql,
}

impl Backend {
    /// Whether the driver for this backend is compiled into the current build
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Sqlite => true,
            Backend::Postgresql => cfg!(feature = "postgresql"),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgresql => "postgresql",
        };
        write!(f, "{s}")
    }
}

/// Construction parameters for a [`crate::Db`].
///
/// For SQLite `db_name` is the database file path; an empty name or
/// `:memory:` opens an in-memory database and the network fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: Backend,
    pub db_name: String,
    pub db_host: String,
    pub db_user: String,
    pub db_password: String,
    pub port: Option<u16>,
    /// Strict reporting: log statements and failures through `tracing`
    pub debug: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            db_name: String::new(),
            db_host: "localhost".to_string(),
            db_user: "root".to_string(),
            db_password: String::new(),
            port: None,
            debug: false,
        }
    }
}

impl DbConfig {
    pub fn new(db_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            ..Self::default()
        }
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.db_host = host.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.db_user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.db_password = password.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Self::from_json(json)
    }

    /// Load a configuration from a serde_json::Value object; missing fields take their defaults
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        if !json.is_object() {
            return Err(DbError::new_invalid_input(format!(
                "expected a configuration object, got {json}"
            )));
        }
        Ok(serde_json::from_value(json)?)
    }

    /// Fail with a configuration error when the backend's driver is not compiled in
    pub fn check_driver_available(&self) -> Result<()> {
        if self.backend.is_available() {
            Ok(())
        } else {
            Err(DbError::new_configuration(format!(
                "{} driver is not enabled in this build",
                self.backend
            )))
        }
    }

    pub(crate) fn is_in_memory(&self) -> bool {
        self.db_name.is_empty() || self.db_name == ":memory:"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.db_host, "localhost");
        assert_eq!(config.db_user, "root");
        assert_eq!(config.db_password, "");
        assert_eq!(config.port, None);
        assert!(!config.debug);
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_from_json_partial() {
        let config = DbConfig::from_json(json!({
            "backend": "postgresql",
            "db_name": "shop",
            "port": 5433
        }))
        .unwrap();
        assert_eq!(config.backend, Backend::Postgresql);
        assert_eq!(config.db_name, "shop");
        assert_eq!(config.port, Some(5433));
        assert_eq!(config.db_host, "localhost");
    }

    #[test]
    fn test_from_json_unknown_backend_is_json_error() {
        let err = DbConfig::from_json(json!({"backend": "oracle"})).unwrap_err();
        assert!(matches!(err, DbError::Json(_)));
    }

    #[test]
    fn test_from_json_non_object() {
        let err = DbConfig::from_json(json!("sqlite")).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput(_)));
    }

    #[test]
    fn test_builder_setters() {
        let config = DbConfig::new("app.db")
            .host("db.internal")
            .user("app")
            .password("secret")
            .port(3307)
            .debug(true);
        assert_eq!(config.db_name, "app.db");
        assert_eq!(config.db_host, "db.internal");
        assert_eq!(config.db_user, "app");
        assert_eq!(config.db_password, "secret");
        assert_eq!(config.port, Some(3307));
        assert!(config.debug);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_sqlite_is_always_available() {
        assert!(DbConfig::default().check_driver_available().is_ok());
    }

    #[cfg(not(feature = "postgresql"))]
    #[test]
    fn test_missing_postgresql_driver_is_configuration_error() {
        let config = DbConfig::default().backend(Backend::Postgresql);
        let err = config.check_driver_available().unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));
    }
}
