//! MongoDB command implementation

use clap::{Args, Subcommand};
use dbconnector_core::{ConnectorError, Table};
use dbconnector_runtime::document::filter_from_json;
use dbconnector_runtime::{bson_to_json, MongoOperator, UpdateSpec};
use dbconnector_types::Connector;
use std::path::PathBuf;

use super::{load_profile, parse_json_arg};
use crate::output::{format_success, format_warning};
use crate::prompt::ConsolePrompter;

/// MongoDB command arguments
#[derive(Args, Debug)]
pub struct MongoCommand {
    /// Database to use instead of the profile's
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Collection to use instead of the profile's
    #[arg(long, global = true)]
    pub collection: Option<String>,

    #[command(subcommand)]
    pub action: MongoAction,
}

#[derive(Subcommand, Debug)]
pub enum MongoAction {
    /// Insert a JSON document or a JSON list of documents
    Insert { data: String },

    /// Insert every record of a CSV, XLSX or JSON file
    BulkInsert {
        path: PathBuf,
        /// Collection to switch to before inserting
        #[arg(long = "into", default_value = "")]
        target: String,
    },

    /// Print the documents matching a JSON filter
    Find {
        #[arg(default_value = "{}")]
        filter: String,
    },

    /// Delete the documents matching a JSON filter
    Delete {
        #[arg(default_value = "{}")]
        filter: String,
    },

    /// Apply an update document or pipeline to matching documents
    Update { filter: String, update: String },

    /// Write the collection to a JSON or CSV file in the working directory
    Export { file: String },
}

impl MongoCommand {
    /// Execute the mongo command
    pub async fn execute(&self, profile_path: &str) -> Result<(), ConnectorError> {
        let profile = load_profile(profile_path)?;
        let section = profile.mongodb.ok_or_else(|| {
            ConnectorError::Config(format!(
                "'{}' has no {} section",
                profile_path,
                Connector::Mongodb.section()
            ))
        })?;

        let mut operator = MongoOperator::from_profile(&section, Box::new(ConsolePrompter));
        if let Some(database) = &self.database {
            operator.select_database(database)?;
        }
        if let Some(collection) = &self.collection {
            operator.select_collection(collection)?;
        }
        operator.connect().await?;

        let result = self.run(&mut operator).await;
        operator.close().await?;
        result
    }

    async fn run(&self, operator: &mut MongoOperator) -> Result<(), ConnectorError> {
        match &self.action {
            MongoAction::Insert { data } => {
                let inserted = operator.insert_json(parse_json_arg("data", data)?).await?;
                println!(
                    "{}",
                    format_success(&format!("Inserted {} document(s)", inserted))
                );
            }
            MongoAction::BulkInsert { path, target } => {
                let inserted = operator.bulk_insert(path, target).await?;
                println!(
                    "{}",
                    format_success(&format!(
                        "Inserted {} document(s) from {}",
                        inserted,
                        path.display()
                    ))
                );
            }
            MongoAction::Find { filter } => {
                let filter = filter_from_json(parse_json_arg("filter", filter)?)?;
                let docs = operator.find(filter).await?;
                if docs.is_empty() {
                    println!("{}", format_warning("No data"));
                } else {
                    let records: Vec<_> = docs
                        .into_iter()
                        .filter_map(|doc| match bson_to_json(doc.into()) {
                            serde_json::Value::Object(map) => Some(map),
                            _ => None,
                        })
                        .collect();
                    println!("{}", Table::from_records(&records));
                }
            }
            MongoAction::Delete { filter } => {
                let filter = filter_from_json(parse_json_arg("filter", filter)?)?;
                let deleted = operator.delete(filter).await?;
                println!(
                    "{}",
                    format_success(&format!("Deleted {} document(s)", deleted))
                );
            }
            MongoAction::Update { filter, update } => {
                let filter = filter_from_json(parse_json_arg("filter", filter)?)?;
                let update = UpdateSpec::from_json(parse_json_arg("update", update)?)?;
                let modified = operator.update(filter, update).await?;
                println!(
                    "{}",
                    format_success(&format!("Updated {} document(s)", modified))
                );
            }
            MongoAction::Export { file } => {
                let path = operator.export_data(file).await?;
                println!(
                    "{}",
                    format_success(&format!("Exported to {}", path.display()))
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Cli, Commands};
    use clap::Parser;

    use super::*;

    fn command(args: &[&str]) -> MongoCommand {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Mongo(cmd) => cmd,
            other => panic!("expected mongo command, got {:?}", other),
        }
    }

    #[test]
    fn test_find_defaults_to_empty_filter() {
        let cmd = command(&["dbconnector", "mongo", "find"]);
        match cmd.action {
            MongoAction::Find { filter } => assert_eq!(filter, "{}"),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_context_overrides() {
        let cmd = command(&[
            "dbconnector",
            "mongo",
            "update",
            r#"{"name": "Ada"}"#,
            r#"{"$set": {"age": 37}}"#,
            "--database",
            "shop",
            "--collection",
            "people",
        ]);
        assert_eq!(cmd.database.as_deref(), Some("shop"));
        assert_eq!(cmd.collection.as_deref(), Some("people"));
        assert!(matches!(cmd.action, MongoAction::Update { .. }));
    }

    #[test]
    fn test_bulk_insert_target() {
        let cmd = command(&["dbconnector", "mongo", "bulk-insert", "rows.xlsx", "--into", "imported"]);
        match cmd.action {
            MongoAction::BulkInsert { path, target } => {
                assert_eq!(path, PathBuf::from("rows.xlsx"));
                assert_eq!(target, "imported");
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_without_mongodb_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.yaml");
        std::fs::write(&path, "mysql:\n  host: localhost\n  user: root\n").unwrap();

        let cmd = command(&["dbconnector", "mongo", "export", "out.json"]);
        let err = cmd.execute(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
    }
}
