//! Relational connector
//!
//! [`RelationalOperator`] owns one session at a time. `connect` dials with
//! backoff; inserts read the target table's columns right before building
//! the statement, so schema changes are always picked up.

use dbconnector_core::prompt::{choose_with_retries, confirm};
use dbconnector_core::{
    redact_credentials, ConnectorError, MySqlProfile, Prompter, RelationalConfig, Result,
    RetryPolicy, Table,
};
use dbconnector_types::Multiplicity;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::connectors::{MySqlDriver, SqlDriver, SqlSession};
use crate::export::{export_path, verify_written, write_table_csv};
use crate::retry::dial_with_backoff;
use crate::state::{CloseOutcome, Reported};

/// Malformed answers tolerated at the "more than one row?" question
const ROW_MODE_ATTEMPTS: usize = 3;

/// Quote an identifier with backticks
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// A parameterized single-row insert for a fixed column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub sql: String,
}

impl InsertStatement {
    /// Build `INSERT INTO t (c1, c2) VALUES (?, ?)` with columns in the order given
    pub fn new(table: &str, columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ConnectorError::MalformedInput(format!(
                "no columns left to insert into '{}'",
                table
            )));
        }
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            column_list,
            placeholders
        );
        Ok(Self {
            table: table.to_string(),
            columns,
            sql,
        })
    }

    pub fn placeholder_count(&self) -> usize {
        self.columns.len()
    }

    /// Check every row has exactly one value per placeholder
    fn check_arity(&self, rows: &[Vec<Value>]) -> Result<()> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != self.placeholder_count() {
                return Err(ConnectorError::MalformedInput(format!(
                    "row {} has {} values but ({}) needs {}",
                    i,
                    row.len(),
                    self.columns.join(", "),
                    self.placeholder_count()
                )));
            }
        }
        Ok(())
    }
}

/// Connector for a relational server
pub struct RelationalOperator<D: SqlDriver = MySqlDriver> {
    driver: D,
    config: RelationalConfig,
    retry: RetryPolicy,
    session: Option<D::Session>,
    prompter: Box<dyn Prompter>,
}

/// The MySQL connector
pub type MySqlOperator = RelationalOperator<MySqlDriver>;

impl MySqlOperator {
    /// Create a MySQL connector from a profile section
    pub fn from_profile(profile: &MySqlProfile, prompter: Box<dyn Prompter>) -> Self {
        Self::new(MySqlDriver, profile.options.clone(), profile.retry, prompter)
    }
}

impl<D: SqlDriver> RelationalOperator<D> {
    pub fn new(
        driver: D,
        config: RelationalConfig,
        retry: RetryPolicy,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        Self {
            driver,
            config,
            retry,
            session: None,
            prompter,
        }
    }

    /// Replace the decision-point strategy
    pub fn set_prompter(&mut self, prompter: Box<dyn Prompter>) {
        self.prompter = prompter;
    }

    /// Whether a session is held. A server that went away is only noticed
    /// by the next operation or `connect`.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Dial the server, retrying with backoff.
    ///
    /// A held session that still answers a ping is kept; a dead one is
    /// dropped and replaced.
    pub async fn connect(&mut self) -> Result<()> {
        self.try_connect().await.reported("connect")
    }

    async fn try_connect(&mut self) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            match session.ping().await {
                Ok(()) => {
                    debug!("Session already open");
                    return Ok(());
                }
                Err(e) => {
                    warn!("Held session is gone, redialing: {}", e);
                    self.session = None;
                }
            }
        }

        let driver = &self.driver;
        let config = &self.config;
        let session = dial_with_backoff(&self.retry, move |attempt| {
            debug!(attempt, driver = driver.driver_name(), "Dialing");
            driver.dial(config)
        })
        .await?;

        self.session = Some(session);
        info!("Connected to {}", self.driver.driver_name());
        Ok(())
    }

    fn session(&mut self) -> Result<&mut D::Session> {
        self.session
            .as_mut()
            .ok_or_else(|| ConnectorError::NotConnected("call connect() first".to_string()))
    }

    /// Log a failed result, dropping the session when the connection was lost
    fn settle<T>(&mut self, result: Result<T>, operation: &str) -> Result<T> {
        if matches!(result, Err(ConnectorError::NotConnected(_))) && self.session.take().is_some() {
            warn!("Connection lost during {}; call connect() to redial", operation);
        }
        result.reported(operation)
    }

    /// Run a statement; statements without a result set give an empty table
    pub async fn execute_query(&mut self, sql: &str) -> Result<Table> {
        let result = self.try_execute_query(sql).await;
        self.settle(result, "execute_query")
    }

    async fn try_execute_query(&mut self, sql: &str) -> Result<Table> {
        debug!(sql, "Executing query");
        self.session()?.fetch(sql).await
    }

    /// Switch to `db_name`, or report the current database when it is empty
    pub async fn resolve_active_database(&mut self, db_name: &str) -> Result<String> {
        let result = self.try_resolve_active_database(db_name).await;
        self.settle(result, "resolve_active_database")
    }

    async fn try_resolve_active_database(&mut self, db_name: &str) -> Result<String> {
        let session = self.session()?;

        if db_name.is_empty() {
            let table = session.fetch("SELECT DATABASE()").await?;
            return match table.rows.first().and_then(|row| row.first()) {
                Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
                _ => Err(ConnectorError::InvalidContext(
                    "no database selected; pass a database name".to_string(),
                )),
            };
        }

        session
            .fetch(&format!("USE {}", quote_ident(db_name)))
            .await
            .map_err(|e| match e {
                ConnectorError::NotConnected(_) => e,
                e => ConnectorError::InvalidContext(format!(
                    "cannot use database '{}': {}",
                    db_name, e
                )),
            })?;
        Ok(db_name.to_string())
    }

    /// Table names in the active database
    pub async fn list_tables(&mut self) -> Result<Vec<String>> {
        let result = self.try_list_tables().await;
        self.settle(result, "list_tables")
    }

    async fn try_list_tables(&mut self) -> Result<Vec<String>> {
        let table = self.session()?.fetch("SHOW TABLES").await?;
        Ok(table
            .rows
            .iter()
            .filter_map(|row| row.first())
            .map(Table::cell_text)
            .collect())
    }

    /// Resolve the database and make sure `table` exists in it
    async fn locate_table(&mut self, table: &str, db_name: &str) -> Result<String> {
        let database = self.try_resolve_active_database(db_name).await?;
        let tables = self.try_list_tables().await?;
        if !tables.iter().any(|t| t == table) {
            return Err(ConnectorError::InvalidContext(format!(
                "table '{}' does not exist in '{}'; existing tables: [{}]",
                table,
                database,
                tables.join(", ")
            )));
        }
        Ok(database)
    }

    /// Column names of `table`, read from a throwaway `SELECT *`
    async fn table_columns(&mut self, table: &str) -> Result<Vec<String>> {
        let statement = format!("SELECT * FROM {}", quote_ident(table));
        self.session()?.describe_columns(&statement).await
    }

    /// Insert one row or many rows into `table`.
    ///
    /// Two decision points run first: whether the leading id column is
    /// omitted, then whether `values` holds one row or a list of rows.
    /// Rows are written in one transaction.
    pub async fn insert(&mut self, table: &str, values: Value, db_name: &str) -> Result<u64> {
        let result = self.try_insert(table, values, db_name).await;
        self.settle(result, "insert")
    }

    async fn try_insert(&mut self, table: &str, values: Value, db_name: &str) -> Result<u64> {
        self.locate_table(table, db_name).await?;

        let mut columns = self.table_columns(table).await?;
        if confirm(
            self.prompter.as_mut(),
            &format!("Is the id column of '{}' generated automatically? [y/n]", table),
            &["y", "yes"],
        ) && !columns.is_empty()
        {
            columns.remove(0);
        }

        let statement = InsertStatement::new(table, columns)?;
        debug!(sql = %statement.sql, "Built insert statement");

        let mode = choose_with_retries(
            self.prompter.as_mut(),
            "Insert more than one row? [y/n]",
            ROW_MODE_ATTEMPTS,
            Multiplicity::from_yes_no,
        )?;
        let rows = rows_for_mode(values, mode)?;
        statement.check_arity(&rows)?;

        let inserted = self.session()?.insert_rows(&statement.sql, &rows).await?;
        info!("Inserted {} row(s) into '{}'", inserted, table);
        Ok(inserted)
    }

    /// Insert every record of a CSV, XLSX or JSON file into `table`.
    ///
    /// Record fields are matched to columns by name; a field the table does not
    /// have is rejected and a column no record mentions is left out.
    pub async fn bulk_insert(
        &mut self,
        table: &str,
        path: impl AsRef<Path>,
        db_name: &str,
    ) -> Result<u64> {
        let result = self.try_bulk_insert(table, path.as_ref(), db_name).await;
        self.settle(result, "bulk_insert")
    }

    async fn try_bulk_insert(&mut self, table: &str, path: &Path, db_name: &str) -> Result<u64> {
        let records = dbconnector_parser::load_records(path)?;
        self.locate_table(table, db_name).await?;
        let schema = self.table_columns(table).await?;

        let (columns, rows) = align_records(table, &schema, records)?;
        let statement = InsertStatement::new(table, columns)?;
        statement.check_arity(&rows)?;

        let inserted = self.session()?.insert_rows(&statement.sql, &rows).await?;
        info!(
            "Inserted {} row(s) from {} into '{}'",
            inserted,
            path.display(),
            table
        );
        Ok(inserted)
    }

    /// Write every row of `table` as CSV to `file_name` in the working directory
    pub async fn export_table(
        &mut self,
        table: &str,
        file_name: &str,
        db_name: &str,
    ) -> Result<PathBuf> {
        let result = self.try_export_table(table, file_name, db_name).await;
        self.settle(result, "export_table")
    }

    async fn try_export_table(
        &mut self,
        table: &str,
        file_name: &str,
        db_name: &str,
    ) -> Result<PathBuf> {
        let path = export_path(file_name)?;
        self.locate_table(table, db_name).await?;

        let statement = format!("SELECT * FROM {}", quote_ident(table));
        let mut data = self.session()?.fetch(&statement).await?;
        if data.columns.is_empty() {
            data.columns = self.table_columns(table).await?;
        }

        write_table_csv(&path, &data)?;
        verify_written(&path)?;
        Ok(path)
    }

    /// Release the session. Closing twice is not an error.
    pub async fn close(&mut self) -> Result<CloseOutcome> {
        match self.session.take() {
            Some(session) => {
                if let Err(e) = session.close().await {
                    warn!("Error while closing session: {}", e);
                }
                info!("Connection closed");
                Ok(CloseOutcome::Closed)
            }
            None => {
                info!("Connection already closed");
                Ok(CloseOutcome::AlreadyClosed)
            }
        }
    }
}

/// Turn caller values into rows according to the chosen row mode
fn rows_for_mode(values: Value, mode: Multiplicity) -> Result<Vec<Vec<Value>>> {
    let Value::Array(items) = values else {
        return Err(ConnectorError::MalformedInput(
            "values must be a list".to_string(),
        ));
    };

    match mode {
        Multiplicity::One => Ok(vec![items]),
        Multiplicity::Many => items
            .into_iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Array(row) => Ok(row),
                other => Err(ConnectorError::MalformedInput(format!(
                    "row {} must be a list, got {}",
                    i, other
                ))),
            })
            .collect(),
    }
}

/// Align records to schema columns: schema order, missing values become NULL
fn align_records(
    table: &str,
    schema: &[String],
    records: Value,
) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let Value::Array(items) = records else {
        return Err(ConnectorError::MalformedInput(
            "data file must hold a list of records".to_string(),
        ));
    };
    if items.is_empty() {
        return Err(ConnectorError::MalformedInput(
            "data file holds no records".to_string(),
        ));
    }

    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(record) => Ok(record),
            other => Err(ConnectorError::MalformedInput(format!(
                "record {} must be a mapping, got {}",
                i, other
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    for record in &records {
        if let Some(unknown) = record.keys().find(|k| !schema.contains(k)) {
            return Err(ConnectorError::MalformedInput(format!(
                "field '{}' is not a column of '{}'",
                unknown, table
            )));
        }
    }

    let columns: Vec<String> = schema
        .iter()
        .filter(|c| records.iter().any(|r| r.contains_key(c.as_str())))
        .cloned()
        .collect();
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok((columns, rows))
}

impl<D: SqlDriver> fmt::Display for RelationalOperator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationalOperator({}", self.driver.driver_name())?;
        for (key, _) in self.config.iter() {
            let value = self.config.get_str(key).unwrap_or_default();
            match key.as_str() {
                "password" | "passwd" => write!(f, ", {}=***", key)?,
                "url" => write!(f, ", url={}", redact_credentials(&value))?,
                _ => write!(f, ", {}={}", key, value)?,
            }
        }
        let state = if self.is_open() { "open" } else { "closed" };
        write!(f, ", {})", state)
    }
}
