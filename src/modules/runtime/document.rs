//! Document connector
//!
//! [`DocumentOperator`] keeps one client plus the selected database and
//! collection. Every CRUD operation runs against that context.

use bson::{Bson, Document};
use dbconnector_core::prompt::{choose, confirm};
use dbconnector_core::{
    redact_credentials, ConnectorError, InsertPayload, MongoProfile, Prompter, Result, Table,
};
use dbconnector_parser::validator::{validate_collection_name, validate_database_name};
use dbconnector_types::{ExportFormat, Multiplicity};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::connectors::{
    bson_to_json, DocumentClient, DocumentDriver, MongoDriver, Namespace, UpdateSpec,
};
use crate::export::{export_path, verify_written, write_json, write_table_csv};
use crate::state::{CloseOutcome, Reported};

/// Parse a JSON filter into a document; only objects are accepted
pub fn filter_from_json(value: Value) -> Result<Document> {
    match bson::to_bson(&value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(ConnectorError::MalformedInput(format!(
            "filter must be a mapping, got '{}'",
            dbconnector_core::bson_type_name(&other)
        ))),
        Err(e) => Err(ConnectorError::MalformedInput(format!(
            "invalid filter: {}",
            e
        ))),
    }
}

/// Connector for a document server
pub struct DocumentOperator<D: DocumentDriver = MongoDriver> {
    driver: D,
    uri: String,
    client: Option<D::Client>,
    database: Option<String>,
    collection: Option<String>,
    prompter: Box<dyn Prompter>,
}

/// The MongoDB connector
pub type MongoOperator = DocumentOperator<MongoDriver>;

impl MongoOperator {
    /// Create a MongoDB connector from a profile section.
    ///
    /// The profile's database and collection become the initial context.
    pub fn from_profile(profile: &MongoProfile, prompter: Box<dyn Prompter>) -> Self {
        let mut operator = Self::new(MongoDriver, &profile.uri, prompter);
        operator.database = profile.database.clone();
        operator.collection = profile.collection.clone();
        operator
    }
}

impl<D: DocumentDriver> DocumentOperator<D> {
    pub fn new(driver: D, uri: impl Into<String>, prompter: Box<dyn Prompter>) -> Self {
        Self {
            driver,
            uri: uri.into(),
            client: None,
            database: None,
            collection: None,
            prompter,
        }
    }

    /// Replace the decision-point strategy
    pub fn set_prompter(&mut self, prompter: Box<dyn Prompter>) {
        self.prompter = prompter;
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Open the client and probe the server twice (`isMaster`, `buildInfo`).
    ///
    /// The connector only counts as open once both probes answered.
    pub async fn connect(&mut self) -> Result<()> {
        self.try_connect().await.reported("connect")
    }

    async fn try_connect(&mut self) -> Result<()> {
        if self.client.is_some() {
            debug!("Client already open");
            return Ok(());
        }

        let client = self.driver.open(&self.uri).await?;
        client.is_master().await?;
        let build = client.server_info().await?;

        match build.get_str("version") {
            Ok(version) => info!("Connected to MongoDB {}", version),
            Err(_) => info!("Connected to MongoDB"),
        }
        self.client = Some(client);
        Ok(())
    }

    /// Select the database later operations use. Clears the collection.
    pub fn select_database(&mut self, name: &str) -> Result<()> {
        validate_database_name(name).reported("select_database")?;
        if self.database.as_deref() != Some(name) {
            self.collection = None;
        }
        self.database = Some(name.to_string());
        debug!(database = name, "Database selected");
        Ok(())
    }

    /// Select the collection later operations use
    pub fn select_collection(&mut self, name: &str) -> Result<()> {
        let result = match self.database {
            None => Err(ConnectorError::InvalidContext(
                "select a database before a collection".to_string(),
            )),
            Some(_) => validate_collection_name(name),
        };
        result.reported("select_collection")?;
        self.collection = Some(name.to_string());
        debug!(collection = name, "Collection selected");
        Ok(())
    }

    fn client(&self) -> Result<&D::Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ConnectorError::NotConnected("call connect() first".to_string()))
    }

    fn namespace(&self) -> Result<Namespace> {
        match (&self.database, &self.collection) {
            (Some(database), Some(collection)) => Ok(Namespace::new(database, collection)),
            (None, _) => Err(ConnectorError::InvalidContext(
                "no database selected".to_string(),
            )),
            (_, None) => Err(ConnectorError::InvalidContext(
                "no collection selected".to_string(),
            )),
        }
    }

    /// Insert one record or a list of records into the selected collection.
    ///
    /// A list containing anything but mappings is rejected as a whole.
    pub async fn insert(&mut self, payload: impl Into<InsertPayload>) -> Result<usize> {
        self.try_insert(payload.into()).await.reported("insert")
    }

    /// Classify a JSON value and insert it
    pub async fn insert_json(&mut self, data: Value) -> Result<usize> {
        let result = match InsertPayload::from_json(data) {
            Ok(payload) => self.try_insert(payload).await,
            Err(e) => Err(e),
        };
        result.reported("insert")
    }

    async fn try_insert(&mut self, payload: InsertPayload) -> Result<usize> {
        let client = self.client()?;
        let ns = self.namespace()?;

        let inserted = match payload.into_valid()? {
            InsertPayload::Record(doc) => {
                client.insert_one(&ns, doc).await?;
                1
            }
            InsertPayload::Records(docs) => client.insert_many(&ns, docs).await?,
            other => {
                return Err(ConnectorError::MalformedInput(format!(
                    "cannot insert {:?}",
                    other
                )))
            }
        };

        info!("Inserted {} document(s) into {}", inserted, ns);
        Ok(inserted)
    }

    /// Insert every record of a CSV, XLSX or JSON file.
    ///
    /// A non-empty `collection` switches the selected collection first.
    pub async fn bulk_insert(&mut self, path: impl AsRef<Path>, collection: &str) -> Result<usize> {
        self.try_bulk_insert(path.as_ref(), collection)
            .await
            .reported("bulk_insert")
    }

    async fn try_bulk_insert(&mut self, path: &Path, collection: &str) -> Result<usize> {
        let data = dbconnector_parser::load_records(path)?;
        if !collection.is_empty() {
            self.select_collection(collection)?;
        }
        let payload = InsertPayload::from_json(data)?;
        self.try_insert(payload).await
    }

    /// Documents matching `filter`; an empty filter matches everything.
    ///
    /// No match is not an error: the result is simply empty.
    pub async fn find(&mut self, filter: Document) -> Result<Vec<Document>> {
        self.try_find(filter).await.reported("find")
    }

    async fn try_find(&mut self, filter: Document) -> Result<Vec<Document>> {
        let ns = self.namespace()?;
        let docs = self.client()?.find(&ns, filter).await?;
        if docs.is_empty() {
            warn!("No data in {} for this filter", ns);
        }
        Ok(docs)
    }

    /// Delete matching documents, asking how many to remove.
    ///
    /// An empty filter asks for confirmation before wiping the collection;
    /// declining deletes nothing and returns 0.
    pub async fn delete(&mut self, filter: Document) -> Result<u64> {
        self.try_delete(filter).await.reported("delete")
    }

    async fn try_delete(&mut self, filter: Document) -> Result<u64> {
        let ns = self.namespace()?;
        self.client()?;

        let scope = if filter.is_empty() {
            let question = format!("Delete every document in {}? [y/n]", ns);
            if !confirm(self.prompter.as_mut(), &question, &["y"]) {
                info!("Nothing deleted");
                return Ok(0);
            }
            Multiplicity::Many
        } else {
            if self.client()?.count(&ns, filter.clone()).await? == 0 {
                return Err(ConnectorError::NoMatch(format!("no such entry: {}", filter)));
            }
            choose(
                self.prompter.as_mut(),
                "Delete one or many matching documents? [one/many]",
            )?
        };

        let deleted = self.client()?.delete(&ns, filter, scope).await?;
        info!("Deleted {} document(s) from {}", deleted, ns);
        Ok(deleted)
    }

    /// Update matching documents, asking whether to touch one or all
    pub async fn update(&mut self, filter: Document, update: impl Into<UpdateSpec>) -> Result<u64> {
        self.try_update(filter, update.into())
            .await
            .reported("update")
    }

    async fn try_update(&mut self, filter: Document, update: UpdateSpec) -> Result<u64> {
        let ns = self.namespace()?;
        if self.client()?.count(&ns, filter.clone()).await? == 0 {
            return Err(ConnectorError::NoMatch(format!(
                "entry does not exist: {}",
                filter
            )));
        }

        let scope: Multiplicity = choose(
            self.prompter.as_mut(),
            "Update one or many matching documents? [one/many]",
        )?;

        let modified = self.client()?.update(&ns, filter, update, scope).await?;
        info!("Updated {} document(s) in {}", modified, ns);
        Ok(modified)
    }

    /// Write the whole collection to `file_name` in the working directory,
    /// as JSON or CSV depending on the answer to the format question
    pub async fn export_data(&mut self, file_name: &str) -> Result<PathBuf> {
        self.try_export_data(file_name)
            .await
            .reported("export_data")
    }

    async fn try_export_data(&mut self, file_name: &str) -> Result<PathBuf> {
        let path = export_path(file_name)?;
        let ns = self.namespace()?;
        let docs = self.client()?.find(&ns, Document::new()).await?;

        let format: ExportFormat = choose(
            self.prompter.as_mut(),
            "Export format? [json/csv]",
        )?;

        let records: Vec<serde_json::Map<String, Value>> = docs
            .into_iter()
            .map(|doc| match bson_to_json(Bson::Document(doc)) {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            })
            .collect();

        match format {
            ExportFormat::Json => {
                let value = Value::Array(records.into_iter().map(Value::Object).collect());
                write_json(&path, &value)?;
            }
            ExportFormat::Csv => write_table_csv(&path, &Table::from_records(&records))?,
        }

        verify_written(&path)?;
        Ok(path)
    }

    /// Probe the server once more, then shut the client down.
    ///
    /// A failed probe is logged; the client is shut down regardless.
    pub async fn close(&mut self) -> Result<CloseOutcome> {
        let Some(client) = self.client.take() else {
            info!("Connection already closed");
            return Ok(CloseOutcome::AlreadyClosed);
        };

        if let Err(e) = client.is_master().await {
            warn!("Server did not answer before close: {}", e);
        }
        client.shutdown().await.reported("close")?;
        info!("Connection closed");
        Ok(CloseOutcome::Closed)
    }
}

impl<D: DocumentDriver> fmt::Display for DocumentOperator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DocumentOperator(uri={}, database={}, collection={}, {})",
            redact_credentials(&self.uri),
            self.database.as_deref().unwrap_or("-"),
            self.collection.as_deref().unwrap_or("-"),
            if self.is_open() { "open" } else { "closed" }
        )
    }
}
