//! CLI commands

mod mongo;
mod mysql;

pub use mongo::{MongoAction, MongoCommand};
pub use mysql::{MysqlAction, MysqlCommand};

use clap::{Parser, Subcommand};
use dbconnector_core::{ConnectorError, Profile};
use dbconnector_types::Connector;
use dbconnector_parser::parse_file;
use tracing::info;

/// dbconnector - CRUD and bulk import/export for MySQL and MongoDB
#[derive(Parser, Debug)]
#[command(name = "dbconnector")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Connection profile path
    ///
    /// Global, so it can follow the subcommand:
    /// `dbconnector mongo find -f prod.yaml`.
    #[arg(
        short = 'f',
        long = "file",
        global = true,
        default_value = "dbconnector.yaml"
    )]
    pub file: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Work with the MySQL server from the profile
    Mysql(MysqlCommand),

    /// Work with the MongoDB server from the profile
    Mongo(MongoCommand),
}

impl Commands {
    /// Which server the command talks to
    pub fn connector(&self) -> Connector {
        match self {
            Commands::Mysql(_) => Connector::Mysql,
            Commands::Mongo(_) => Connector::Mongodb,
        }
    }
}

/// Load and validate the connection profile
fn load_profile(path: &str) -> Result<Profile, ConnectorError> {
    info!("Loading profile from: {}", path);
    parse_file(path)
}

/// Parse a JSON command-line argument
fn parse_json_arg(name: &str, raw: &str) -> Result<serde_json::Value, ConnectorError> {
    serde_json::from_str(raw)
        .map_err(|e| ConnectorError::MalformedInput(format!("{} is not valid JSON: {}", name, e)))
}
