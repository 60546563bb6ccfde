//! dbconnector CLI
//!
//! This crate provides the command-line interface for dbconnector:
//! - mysql: query, insert, bulk-insert, export and list tables
//! - mongo: insert, bulk-insert, find, delete, update and export

pub mod commands;
pub mod output;
pub mod prompt;

pub use commands::{Cli, Commands};
