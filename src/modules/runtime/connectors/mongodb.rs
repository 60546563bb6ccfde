//! MongoDB driver implementation

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use dbconnector_core::{ConnectorError, Result};
use dbconnector_types::Multiplicity;
use futures::TryStreamExt;
use mongodb::{options::ClientOptions, options::UpdateModifications, Client, Collection};
use tracing::debug;

use super::traits::{DocumentClient, DocumentDriver, Namespace, UpdateSpec};

/// Builds MongoDB clients from connection strings
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDriver;

#[async_trait]
impl DocumentDriver for MongoDriver {
    type Client = MongoClient;

    async fn open(&self, uri: &str) -> Result<MongoClient> {
        let options = ClientOptions::parse(uri).await.map_err(|e| {
            ConnectorError::ConnectionFailed(format!("MongoDB options parse failed: {}", e))
        })?;

        let client = Client::with_options(options).map_err(|e| {
            ConnectorError::ConnectionFailed(format!("MongoDB client creation failed: {}", e))
        })?;

        Ok(MongoClient { client })
    }
}

/// A pooled MongoDB client
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
}

impl MongoClient {
    fn collection(&self, ns: &Namespace) -> Collection<Document> {
        self.client
            .database(&ns.database)
            .collection::<Document>(&ns.collection)
    }

    async fn admin_command(&self, command: Document) -> Result<Document> {
        self.client
            .database("admin")
            .run_command(command, None)
            .await
            .map_err(|e| ConnectorError::ConnectionFailed(format!("MongoDB probe failed: {}", e)))
    }
}

fn command_error(action: &str, ns: &Namespace, err: mongodb::error::Error) -> ConnectorError {
    ConnectorError::Query(format!("{} on {} failed: {}", action, ns, err))
}

/// Convert a BSON value into plain JSON (ObjectIds as hex, dates as RFC 3339)
pub fn bson_to_json(bson: Bson) -> serde_json::Value {
    match bson {
        Bson::ObjectId(oid) => serde_json::Value::String(oid.to_hex()),
        Bson::DateTime(dt) => serde_json::Value::String(
            chrono::DateTime::from_timestamp_millis(dt.timestamp_millis())
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| dt.to_string()),
        ),
        Bson::Document(doc) => serde_json::Value::Object(
            doc.into_iter()
                .map(|(key, value)| (key, bson_to_json(value)))
                .collect(),
        ),
        Bson::Array(arr) => serde_json::Value::Array(arr.into_iter().map(bson_to_json).collect()),
        Bson::Decimal128(d) => serde_json::Value::String(d.to_string()),
        other => bson::from_bson(other).unwrap_or(serde_json::Value::Null),
    }
}

#[async_trait]
impl DocumentClient for MongoClient {
    async fn is_master(&self) -> Result<Document> {
        self.admin_command(doc! { "isMaster": 1 }).await
    }

    async fn server_info(&self) -> Result<Document> {
        self.admin_command(doc! { "buildInfo": 1 }).await
    }

    async fn insert_one(&self, ns: &Namespace, doc: Document) -> Result<()> {
        self.collection(ns)
            .insert_one(doc, None)
            .await
            .map_err(|e| command_error("insert", ns, e))?;
        Ok(())
    }

    async fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> Result<usize> {
        let result = self
            .collection(ns)
            .insert_many(docs, None)
            .await
            .map_err(|e| command_error("insert", ns, e))?;
        Ok(result.inserted_ids.len())
    }

    async fn find(&self, ns: &Namespace, filter: Document) -> Result<Vec<Document>> {
        debug!(namespace = %ns, %filter, "Running find");
        let cursor = self
            .collection(ns)
            .find(filter, None)
            .await
            .map_err(|e| command_error("find", ns, e))?;
        cursor
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| command_error("find", ns, e))
    }

    async fn count(&self, ns: &Namespace, filter: Document) -> Result<u64> {
        self.collection(ns)
            .count_documents(filter, None)
            .await
            .map_err(|e| command_error("count", ns, e))
    }

    async fn delete(&self, ns: &Namespace, filter: Document, scope: Multiplicity) -> Result<u64> {
        let collection = self.collection(ns);
        let result = match scope {
            Multiplicity::One => collection.delete_one(filter, None).await,
            Multiplicity::Many => collection.delete_many(filter, None).await,
        }
        .map_err(|e| command_error("delete", ns, e))?;
        Ok(result.deleted_count)
    }

    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: UpdateSpec,
        scope: Multiplicity,
    ) -> Result<u64> {
        let update = match update {
            UpdateSpec::Document(doc) => UpdateModifications::Document(doc),
            UpdateSpec::Pipeline(stages) => UpdateModifications::Pipeline(stages),
        };
        let collection = self.collection(ns);
        let result = match scope {
            Multiplicity::One => collection.update_one(filter, update, None).await,
            Multiplicity::Many => collection.update_many(filter, update, None).await,
        }
        .map_err(|e| command_error("update", ns, e))?;
        Ok(result.modified_count)
    }

    async fn shutdown(self) -> Result<()> {
        self.client.shutdown().await;
        Ok(())
    }
}
