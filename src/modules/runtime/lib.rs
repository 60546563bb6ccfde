//! Connectors for dbconnector
//!
//! This crate provides the two connector components, [`RelationalOperator`]
//! for MySQL and [`DocumentOperator`] for MongoDB, together with the driver
//! traits they are built on, the dial backoff routine and the file export
//! helpers.
//!
//! An operator instance is meant for one caller at a time. Every operation
//! takes `&mut self`; sharing an operator between tasks needs a lock around it.

pub mod connectors;
pub mod document;
pub mod export;
pub mod relational;
pub mod retry;
pub mod state;

#[cfg(test)]
mod testing;

pub use connectors::{
    bson_to_json, DocumentClient, DocumentDriver, MongoClient, MongoDriver, MySqlDriver,
    MySqlSession, Namespace, SqlDriver, SqlSession, UpdateSpec,
};
pub use document::{DocumentOperator, MongoOperator};
pub use relational::{InsertStatement, MySqlOperator, RelationalOperator};
pub use state::CloseOutcome;
