//! MySQL driver implementation

use async_trait::async_trait;
use dbconnector_core::{ConnectorError, RelationalConfig, Result, Table};
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement};
use std::str::FromStr;
use tracing::{debug, warn};

use super::traits::{SqlDriver, SqlSession};

/// Opens single MySQL connections (no pool)
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    /// Translate the opaque option map into connect options.
    ///
    /// Unknown keys are rejected the way the server client would reject them,
    /// so a bad key fails every dial attempt.
    pub fn connect_options(config: &RelationalConfig) -> Result<MySqlConnectOptions> {
        let mut options = match config.get_str("url") {
            Some(url) => MySqlConnectOptions::from_str(&url)
                .map_err(|e| ConnectorError::ConnectionFailed(format!("invalid url: {}", e)))?,
            None => MySqlConnectOptions::new(),
        };

        for (key, _) in config.iter() {
            let value = config.get_str(key).ok_or_else(|| {
                ConnectorError::ConnectionFailed(format!("option '{}' must be a scalar", key))
            })?;
            options = match key.as_str() {
                "url" => options,
                "host" => options.host(&value),
                "port" => options.port(value.parse::<u16>().map_err(|_| {
                    ConnectorError::ConnectionFailed(format!("invalid port '{}'", value))
                })?),
                "user" | "username" => options.username(&value),
                "password" | "passwd" => options.password(&value),
                "database" | "db" => options.database(&value),
                "unix_socket" | "socket" => options.socket(&value),
                "charset" => options.charset(&value),
                "collation" => options.collation(&value),
                other => {
                    return Err(ConnectorError::ConnectionFailed(format!(
                        "unsupported connection option '{}'",
                        other
                    )))
                }
            };
        }

        // Every prepare must reach the server: cached metadata would hide
        // schema changes and survive a `USE` of another database.
        Ok(options.statement_cache_capacity(0))
    }
}

#[async_trait]
impl SqlDriver for MySqlDriver {
    type Session = MySqlSession;

    async fn dial(&self, config: &RelationalConfig) -> Result<MySqlSession> {
        let options = Self::connect_options(config)?;
        let conn = options
            .connect()
            .await
            .map_err(|e| ConnectorError::ConnectionFailed(format!("MySQL connection failed: {}", e)))?;
        Ok(MySqlSession { conn })
    }

    fn driver_name(&self) -> &'static str {
        "mysql"
    }
}

/// One open MySQL connection
pub struct MySqlSession {
    conn: MySqlConnection,
}

impl MySqlSession {
    /// Convert a MySQL row to positional JSON values
    fn row_to_values(row: &MySqlRow) -> Vec<Value> {
        row.columns()
            .iter()
            .map(|column| Self::get_column_value(row, column))
            .collect()
    }

    /// Get a column value as a JSON value
    fn get_column_value(row: &MySqlRow, column: &MySqlColumn) -> Value {
        use sqlx::TypeInfo;

        let type_name = column.type_info().name();
        let idx = column.ordinal();

        match type_name {
            "BOOLEAN" => row
                .try_get::<bool, _>(idx)
                .map(Value::Bool)
                .unwrap_or(Value::Null),
            "TINYINT" | "SMALLINT" | "INT" | "MEDIUMINT" | "BIGINT" => row
                .try_get::<i64, _>(idx)
                .map(|v| Value::Number(v.into()))
                .unwrap_or(Value::Null),
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "INT UNSIGNED" | "MEDIUMINT UNSIGNED"
            | "BIGINT UNSIGNED" => row
                .try_get::<u64, _>(idx)
                .map(|v| Value::Number(v.into()))
                .unwrap_or(Value::Null),
            "FLOAT" => row
                .try_get::<f32, _>(idx)
                .ok()
                .and_then(|v| serde_json::Number::from_f64(v as f64))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            "DOUBLE" => row
                .try_get::<f64, _>(idx)
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            "DATETIME" | "TIMESTAMP" => row
                .try_get::<chrono::NaiveDateTime, _>(idx)
                .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Null),
            "DATE" => row
                .try_get::<chrono::NaiveDate, _>(idx)
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null),
            "JSON" => row.try_get::<Value, _>(idx).unwrap_or(Value::Null),
            _ => match row.try_get_unchecked::<String, _>(idx) {
                Ok(text) => Value::String(text),
                Err(_) => match row.try_get_unchecked::<Vec<u8>, _>(idx) {
                    Ok(bytes) => {
                        warn!(
                            column = column.name(),
                            "Binary value is not UTF-8; writing it as hex"
                        );
                        Value::String(hex_literal(&bytes))
                    }
                    Err(_) => Value::Null,
                },
            },
        }
    }
}

/// `0x`-prefixed lowercase hex, the way the server prints binary literals
fn hex_literal(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::from("0x"), |mut out, b| {
            out.push_str(&format!("{:02x}", b));
            out
        })
}

/// Bind one JSON scalar as a statement parameter
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        nested => query.bind(nested.to_string()),
    }
}

/// Transport failures mean the connection is gone; everything else is the statement's fault
fn query_error(err: sqlx::Error) -> ConnectorError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Protocol(_) | sqlx::Error::Tls(_) => {
            ConnectorError::NotConnected(format!("MySQL connection lost: {}", err))
        }
        other => ConnectorError::Query(format!("MySQL statement failed: {}", other)),
    }
}

#[async_trait]
impl SqlSession for MySqlSession {
    async fn fetch(&mut self, statement: &str) -> Result<Table> {
        // A bare &str runs over the text protocol, so USE and SHOW work too.
        let rows = self.conn.fetch_all(statement).await.map_err(query_error)?;

        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = rows.iter().map(Self::row_to_values).collect();

        Ok(Table::new(columns, rows))
    }

    async fn describe_columns(&mut self, statement: &str) -> Result<Vec<String>> {
        let prepared = self.conn.prepare(statement).await.map_err(query_error)?;
        Ok(prepared
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }

    async fn insert_rows(&mut self, statement: &str, rows: &[Vec<Value>]) -> Result<u64> {
        debug!(statement, rows = rows.len(), "Executing parameterized insert");

        let mut tx = self.conn.begin().await.map_err(query_error)?;
        let mut affected = 0;
        for row in rows {
            let query = row.iter().fold(sqlx::query(statement), bind_value);
            affected += query
                .execute(&mut *tx)
                .await
                .map_err(query_error)?
                .rows_affected();
        }
        tx.commit().await.map_err(query_error)?;

        Ok(affected)
    }

    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await.map_err(query_error)
    }

    async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(query_error)
    }
}
