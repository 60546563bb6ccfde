//! Database drivers for dbconnector
//!
//! The operators talk to databases only through the traits in [`traits`];
//! this module provides the MySQL (sqlx) and MongoDB implementations.

mod mongodb;
mod mysql;
mod traits;

pub use self::mongodb::{bson_to_json, MongoClient, MongoDriver};
pub use mysql::{MySqlDriver, MySqlSession};
pub use traits::{DocumentClient, DocumentDriver, Namespace, SqlDriver, SqlSession, UpdateSpec};
