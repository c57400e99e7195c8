use crate::{
    config::{Backend, DbConfig},
    parameters::ParameterValue,
    query::Dialect,
    result::Result,
    runner::{Driver, Executed},
    runner_sqlite::SqliteDriver,
};

#[cfg(feature = "postgresql")]
use crate::runner_postgresql::PostgresDriver;

/// Database connection enum that holds different database backends
pub enum DatabaseConnection {
    /// SQLite connection
    SQLite(SqliteDriver),
    /// PostgreSQL connection
    #[cfg(feature = "postgresql")]
    PostgreSQL(PostgresDriver),
}

impl DatabaseConnection {
    /// Open the connection described by `config`.
    ///
    /// Fails with a configuration error when the backend is not compiled in,
    /// before any connection attempt is made.
    pub fn open(config: &DbConfig) -> Result<Self> {
        config.check_driver_available()?;

        match config.backend {
            Backend::Sqlite if config.is_in_memory() => {
                Ok(DatabaseConnection::SQLite(SqliteDriver::open_in_memory()?))
            }
            Backend::Sqlite => Ok(DatabaseConnection::SQLite(SqliteDriver::open(
                &config.db_name,
            )?)),
            #[cfg(feature = "postgresql")]
            Backend::Postgresql => Ok(DatabaseConnection::PostgreSQL(PostgresDriver::connect(
                config,
            )?)),
            #[cfg(not(feature = "postgresql"))]
            Backend::Postgresql => Err(crate::result::DbError::new_configuration(
                "postgresql driver is not enabled in this build",
            )),
        }
    }
}

impl Driver for DatabaseConnection {
    fn dialect(&self) -> Dialect {
        match self {
            DatabaseConnection::SQLite(driver) => driver.dialect(),
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(driver) => driver.dialect(),
        }
    }

    fn execute(&mut self, sql: &str, params: &[ParameterValue]) -> Result<Executed> {
        match self {
            DatabaseConnection::SQLite(driver) => driver.execute(sql, params),
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(driver) => driver.execute(sql, params),
        }
    }

    fn begin(&mut self) -> Result<()> {
        match self {
            DatabaseConnection::SQLite(driver) => driver.begin(),
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(driver) => driver.begin(),
        }
    }

    fn commit(&mut self) -> Result<()> {
        match self {
            DatabaseConnection::SQLite(driver) => driver.commit(),
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(driver) => driver.commit(),
        }
    }

    fn rollback(&mut self) -> Result<()> {
        match self {
            DatabaseConnection::SQLite(driver) => driver.rollback(),
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(driver) => driver.rollback(),
        }
    }
}

impl From<SqliteDriver> for DatabaseConnection {
    fn from(driver: SqliteDriver) -> Self {
        DatabaseConnection::SQLite(driver)
    }
}

#[cfg(feature = "postgresql")]
impl From<PostgresDriver> for DatabaseConnection {
    fn from(driver: PostgresDriver) -> Self {
        DatabaseConnection::PostgreSQL(driver)
    }
}
