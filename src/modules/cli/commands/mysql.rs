//! MySQL command implementation

use clap::{Args, Subcommand};
use dbconnector_core::ConnectorError;
use dbconnector_runtime::MySqlOperator;
use dbconnector_types::Connector;
use std::path::PathBuf;

use super::{load_profile, parse_json_arg};
use crate::output::{format_success, format_warning};
use crate::prompt::ConsolePrompter;

/// MySQL command arguments
#[derive(Args, Debug)]
pub struct MysqlCommand {
    #[command(subcommand)]
    pub action: MysqlAction,
}

#[derive(Subcommand, Debug)]
pub enum MysqlAction {
    /// Run a SQL statement and print its rows
    Query {
        sql: String,
    },

    /// Insert one row, or a list of rows, given as JSON
    Insert {
        table: String,
        /// `["Ada", 36]` or `[["Ada", 36], ["Alan", 41]]`
        values: String,
        /// Database to switch to first
        #[arg(long, default_value = "")]
        db: String,
    },

    /// Insert every record of a CSV, XLSX or JSON file
    BulkInsert {
        table: String,
        path: PathBuf,
        #[arg(long, default_value = "")]
        db: String,
    },

    /// Write a table to a CSV file in the working directory
    Export {
        table: String,
        file: String,
        #[arg(long, default_value = "")]
        db: String,
    },

    /// List the tables of the active database
    Tables {
        #[arg(long, default_value = "")]
        db: String,
    },
}

impl MysqlCommand {
    /// Execute the mysql command
    pub async fn execute(&self, profile_path: &str) -> Result<(), ConnectorError> {
        let profile = load_profile(profile_path)?;
        let section = profile.mysql.ok_or_else(|| {
            ConnectorError::Config(format!(
                "'{}' has no {} section",
                profile_path,
                Connector::Mysql.section()
            ))
        })?;

        let mut operator = MySqlOperator::from_profile(&section, Box::new(ConsolePrompter));
        operator.connect().await?;

        let result = self.run(&mut operator).await;
        operator.close().await?;
        result
    }

    async fn run(&self, operator: &mut MySqlOperator) -> Result<(), ConnectorError> {
        match &self.action {
            MysqlAction::Query { sql } => {
                let table = operator.execute_query(sql).await?;
                if table.columns.is_empty() {
                    println!("{}", format_success("Statement executed"));
                } else {
                    println!("{}", table);
                }
            }
            MysqlAction::Insert { table, values, db } => {
                let values = parse_json_arg("values", values)?;
                let inserted = operator.insert(table, values, db).await?;
                println!(
                    "{}",
                    format_success(&format!("Inserted {} row(s) into '{}'", inserted, table))
                );
            }
            MysqlAction::BulkInsert { table, path, db } => {
                let inserted = operator.bulk_insert(table, path, db).await?;
                println!(
                    "{}",
                    format_success(&format!("Inserted {} row(s) into '{}'", inserted, table))
                );
            }
            MysqlAction::Export { table, file, db } => {
                let path = operator.export_table(table, file, db).await?;
                println!(
                    "{}",
                    format_success(&format!("Exported '{}' to {}", table, path.display()))
                );
            }
            MysqlAction::Tables { db } => {
                if !db.is_empty() {
                    operator.resolve_active_database(db).await?;
                }
                let tables = operator.list_tables().await?;
                if tables.is_empty() {
                    println!("{}", format_warning("No tables"));
                }
                for table in tables {
                    println!("{}", table);
                }
            }
        }
        Ok(())
    }
}
