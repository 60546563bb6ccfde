//! Driver trait definitions

use async_trait::async_trait;
use bson::{Bson, Document};
use dbconnector_core::{ConnectorError, RelationalConfig, Result, Table};
use dbconnector_types::Multiplicity;
use serde_json::Value;
use std::fmt;

/// Opens sessions against a relational server
#[async_trait]
pub trait SqlDriver: Send + Sync {
    type Session: SqlSession;

    /// Make one connection attempt with the given options
    async fn dial(&self, config: &RelationalConfig) -> Result<Self::Session>;

    /// Get the driver name
    fn driver_name(&self) -> &'static str;
}

/// A single relational connection; it also plays the cursor role
#[async_trait]
pub trait SqlSession: Send {
    /// Execute a statement and collect whatever rows it produces.
    ///
    /// Statements without a result set return an empty table.
    async fn fetch(&mut self, statement: &str) -> Result<Table>;

    /// Column names of a statement's result set, read from the result
    /// metadata without consuming any rows
    async fn describe_columns(&mut self, statement: &str) -> Result<Vec<String>>;

    /// Execute a parameterized statement once per row inside one transaction
    /// and commit it. If any row fails nothing is committed.
    async fn insert_rows(&mut self, statement: &str, rows: &[Vec<Value>]) -> Result<u64>;

    /// Round trip to check the server still holds this connection
    async fn ping(&mut self) -> Result<()>;

    /// Release the connection
    async fn close(self) -> Result<()>;
}

/// Opens clients against a document server
#[async_trait]
pub trait DocumentDriver: Send + Sync {
    type Client: DocumentClient;

    /// Build a client from a connection string (no round trip yet)
    async fn open(&self, uri: &str) -> Result<Self::Client>;
}

/// Database/collection pair a document operation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Update applied to matching documents: an operator document such as
/// `{"$set": {...}}` or an aggregation pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateSpec {
    Document(Document),
    Pipeline(Vec<Document>),
}

impl UpdateSpec {
    /// Build an update from JSON: an object or an array of objects
    pub fn from_json(value: Value) -> Result<Self> {
        let bson = bson::to_bson(&value)
            .map_err(|e| ConnectorError::MalformedInput(format!("JSON to BSON failed: {}", e)))?;
        match bson {
            Bson::Document(doc) => Ok(UpdateSpec::Document(doc)),
            Bson::Array(stages) => stages
                .into_iter()
                .enumerate()
                .map(|(i, stage)| match stage {
                    Bson::Document(doc) => Ok(doc),
                    other => Err(ConnectorError::MalformedInput(format!(
                        "update pipeline stage {} is '{}', expected a mapping",
                        i,
                        dbconnector_core::bson_type_name(&other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(UpdateSpec::Pipeline),
            other => Err(ConnectorError::MalformedInput(format!(
                "update must be a mapping or a pipeline, got '{}'",
                dbconnector_core::bson_type_name(&other)
            ))),
        }
    }
}

impl From<Document> for UpdateSpec {
    fn from(doc: Document) -> Self {
        UpdateSpec::Document(doc)
    }
}

/// A live document-store client
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Administrative primary probe (`isMaster` on `admin`)
    async fn is_master(&self) -> Result<Document>;

    /// Server information fetch (`buildInfo`)
    async fn server_info(&self) -> Result<Document>;

    async fn insert_one(&self, ns: &Namespace, doc: Document) -> Result<()>;

    /// Insert all documents, returning how many were stored
    async fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> Result<usize>;

    async fn find(&self, ns: &Namespace, filter: Document) -> Result<Vec<Document>>;

    async fn count(&self, ns: &Namespace, filter: Document) -> Result<u64>;

    /// Delete the first or every match, returning the deleted count
    async fn delete(&self, ns: &Namespace, filter: Document, scope: Multiplicity) -> Result<u64>;

    /// Update the first or every match, returning the modified count
    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: UpdateSpec,
        scope: Multiplicity,
    ) -> Result<u64>;

    /// Shut the client down and release its connections
    async fn shutdown(self) -> Result<()>;
}
