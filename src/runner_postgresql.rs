use crate::{
    config::DbConfig,
    parameters::ParameterValue,
    query::Dialect,
    result::{DbError, Result},
    runner::{Driver, Executed, Row},
};
use bytes::BytesMut;
use tokio::runtime::Runtime;
use tokio_postgres::{
    Client, NoTls,
    types::{IsNull, ToSql, Type, to_sql_checked},
};

// PostgreSQL type OIDs for all column types
const POSTGRES_TYPE_OID_BOOL: u32 = 16;
const POSTGRES_TYPE_OID_BYTEA: u32 = 17;
const POSTGRES_TYPE_OID_INT2: u32 = 21;
const POSTGRES_TYPE_OID_INT4: u32 = 23;
const POSTGRES_TYPE_OID_INT8: u32 = 20;
const POSTGRES_TYPE_OID_FLOAT4: u32 = 700;
const POSTGRES_TYPE_OID_FLOAT8: u32 = 701;
const POSTGRES_TYPE_OID_TEXT: u32 = 25;
const POSTGRES_TYPE_OID_VARCHAR: u32 = 1043;
const POSTGRES_TYPE_OID_BPCHAR: u32 = 1042;
const POSTGRES_TYPE_OID_NAME: u32 = 19;
const POSTGRES_TYPE_OID_JSON: u32 = 114;
const POSTGRES_TYPE_OID_JSONB: u32 = 3802;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

// PostgreSQL is strictly typed, so each bind tag is encoded in the width the
// server inferred for its placeholder. Types a tag cannot represent fail with
// `WrongType` instead of sending mis-encoded bytes.
impl ToSql for ParameterValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self {
            ParameterValue::Null => Ok(IsNull::Yes),
            ParameterValue::Integer(i) => match ty.oid() {
                POSTGRES_TYPE_OID_INT2 => i16::try_from(*i)?.to_sql_checked(ty, out),
                POSTGRES_TYPE_OID_INT4 => i32::try_from(*i)?.to_sql_checked(ty, out),
                POSTGRES_TYPE_OID_FLOAT4 => (*i as f32).to_sql_checked(ty, out),
                POSTGRES_TYPE_OID_FLOAT8 => (*i as f64).to_sql_checked(ty, out),
                POSTGRES_TYPE_OID_BOOL => (*i != 0).to_sql_checked(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            ParameterValue::Float(f) => match ty.oid() {
                POSTGRES_TYPE_OID_FLOAT4 => (*f as f32).to_sql_checked(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            ParameterValue::Text(s) => match ty.oid() {
                POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql_checked(ty, out)
                }
                _ => s.to_sql_checked(ty, out),
            },
            ParameterValue::Blob(bytes) => bytes.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn to_json_value<T: serde::Serialize>(value: Option<T>) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Convert a PostgreSQL column value to JSON using OID-based detection
pub fn postgres_type_to_json_conversion(
    column_type: &Type,
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<serde_json::Value> {
    let oid = column_type.oid();
    match oid {
        POSTGRES_TYPE_OID_BOOL => to_json_value(row.try_get::<_, Option<bool>>(idx)?),
        POSTGRES_TYPE_OID_INT2 => to_json_value(row.try_get::<_, Option<i16>>(idx)?),
        POSTGRES_TYPE_OID_INT4 => to_json_value(row.try_get::<_, Option<i32>>(idx)?),
        POSTGRES_TYPE_OID_INT8 => to_json_value(row.try_get::<_, Option<i64>>(idx)?),
        POSTGRES_TYPE_OID_FLOAT4 => to_json_value(row.try_get::<_, Option<f32>>(idx)?),
        POSTGRES_TYPE_OID_FLOAT8 => to_json_value(row.try_get::<_, Option<f64>>(idx)?),
        POSTGRES_TYPE_OID_TEXT
        | POSTGRES_TYPE_OID_VARCHAR
        | POSTGRES_TYPE_OID_BPCHAR
        | POSTGRES_TYPE_OID_NAME => {
            to_json_value(row.try_get::<_, Option<String>>(idx)?)
        }
        POSTGRES_TYPE_OID_BYTEA => to_json_value(row.try_get::<_, Option<Vec<u8>>>(idx)?),
        POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
            to_json_value(row.try_get::<_, Option<serde_json::Value>>(idx)?)
        }
        _ => Err(DbError::new_query(format!(
            "Unsupported PostgreSQL column type {column_type} (OID {oid}); cast it to text in the query"
        ))),
    }
}

fn row_to_json_object(row: &tokio_postgres::Row) -> Result<Row> {
    let mut obj = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = postgres_type_to_json_conversion(column.type_(), row, idx)?;
        obj.insert(column.name().to_string(), value);
    }
    Ok(obj)
}

/// Prepare, bind and run one statement on the async client
async fn execute_statement(
    client: &Client,
    sql: &str,
    params: &[ParameterValue],
) -> Result<Executed> {
    let positional_params: Vec<&(dyn ToSql + Sync)> =
        params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
    let statement = client.prepare(sql).await?;

    if statement.columns().is_empty() {
        let affected_rows = client.execute(&statement, &positional_params).await?;
        return Ok(Executed {
            affected_rows,
            last_insert_id: 0,
            rows: None,
        });
    }

    let pg_rows = client.query(&statement, &positional_params).await?;
    let rows = pg_rows
        .iter()
        .map(row_to_json_object)
        .collect::<Result<Vec<_>>>()?;

    // Generated INSERTs end in RETURNING *, whose first column is the key by convention
    let last_insert_id = rows
        .first()
        .and_then(|row| row.values().next())
        .and_then(|value| value.as_i64())
        .unwrap_or(0);

    Ok(Executed {
        affected_rows: rows.len() as u64,
        last_insert_id,
        rows: Some(rows),
    })
}

/// PostgreSQL backend: an async client driven on its own current-thread runtime
pub struct PostgresDriver {
    runtime: Runtime,
    client: Client,
}

impl PostgresDriver {
    /// Connect using the host, user, password, database name and port of `config`
    pub fn connect(config: &DbConfig) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.db_host)
            .user(&config.db_user)
            .password(&config.db_password)
            .dbname(&config.db_name);
        if let Some(port) = config.port {
            pg_config.port(port);
        }
        Self::connect_with(pg_config)
    }

    /// Connect with a libpq-style connection string
    pub fn connect_str(connection_string: &str) -> Result<Self> {
        let pg_config = connection_string
            .parse::<tokio_postgres::Config>()
            .map_err(|e| DbError::new_connection(e.to_string()))?;
        Self::connect_with(pg_config)
    }

    fn connect_with(pg_config: tokio_postgres::Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::new_connection(e.to_string()))?;

        let (client, connection) = runtime
            .block_on(pg_config.connect(NoTls))
            .map_err(|e| DbError::new_connection(e.to_string()))?;

        // Only makes progress while a block_on call is running, which is every driver call
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgresql connection closed with error");
            }
        });

        Ok(Self { runtime, client })
    }
}

impl Driver for PostgresDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute(&mut self, sql: &str, params: &[ParameterValue]) -> Result<Executed> {
        self.runtime.block_on(execute_statement(&self.client, sql, params))
    }

    fn begin(&mut self) -> Result<()> {
        self.runtime.block_on(self.client.batch_execute("BEGIN"))?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.runtime.block_on(self.client.batch_execute("COMMIT"))?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.runtime.block_on(self.client.batch_execute("ROLLBACK"))?;
        Ok(())
    }
}
