//! In-memory drivers for operator tests

use async_trait::async_trait;
use bson::{Bson, Document};
use dbconnector_core::{ConnectorError, RelationalConfig, Result, Table};
use dbconnector_types::Multiplicity;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::connectors::{
    DocumentClient, DocumentDriver, Namespace, SqlDriver, SqlSession, UpdateSpec,
};

fn ident(raw: &str) -> String {
    raw.trim().trim_matches('`').replace("``", "`")
}

#[derive(Debug, Default, Clone)]
pub struct FakeTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Default)]
pub struct SqlState {
    pub dials: u32,
    pub current_database: Option<String>,
    pub databases: BTreeMap<String, BTreeMap<String, FakeTable>>,
    /// Every (statement, rows) pair handed to `insert_rows`
    pub inserts: Vec<(String, Vec<Vec<Value>>)>,
    pub executed: Vec<String>,
    pub closes: u32,
    /// Set when the server side dropped the current connection
    pub dropped: bool,
}

impl SqlState {
    fn alive(&self) -> Result<()> {
        if self.dropped {
            return Err(ConnectorError::NotConnected(
                "Lost connection to MySQL server during query".into(),
            ));
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut FakeTable> {
        let db = self
            .current_database
            .clone()
            .ok_or_else(|| ConnectorError::Query("No database selected".into()))?;
        self.databases
            .get_mut(&db)
            .and_then(|tables| tables.get_mut(name))
            .ok_or_else(|| ConnectorError::Query(format!("Table '{}.{}' doesn't exist", db, name)))
    }
}

/// SQL driver failing its first `failures` dials
#[derive(Clone, Default)]
pub struct FakeSqlDriver {
    pub state: Arc<Mutex<SqlState>>,
    pub failures: u32,
}

impl FakeSqlDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    pub fn with_table(self, database: &str, table: &str, columns: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .databases
            .entry(database.to_string())
            .or_default()
            .insert(
                table.to_string(),
                FakeTable {
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                    rows: Vec::new(),
                },
            );
        self
    }

    pub fn using(self, database: &str) -> Self {
        self.state.lock().unwrap().current_database = Some(database.to_string());
        self
    }

    /// Kill the open connection the way a server restart would
    pub fn drop_connection(&self) {
        self.state.lock().unwrap().dropped = true;
    }

    pub fn rows(&self, database: &str, table: &str) -> Vec<Vec<Value>> {
        self.state.lock().unwrap().databases[database][table].rows.clone()
    }
}

#[async_trait]
impl SqlDriver for FakeSqlDriver {
    type Session = FakeSqlSession;

    async fn dial(&self, _config: &RelationalConfig) -> Result<FakeSqlSession> {
        let mut state = self.state.lock().unwrap();
        state.dials += 1;
        if state.dials <= self.failures {
            return Err(ConnectorError::ConnectionFailed(
                "Can't connect to MySQL server".into(),
            ));
        }
        state.dropped = false;
        Ok(FakeSqlSession {
            state: Arc::clone(&self.state),
        })
    }

    fn driver_name(&self) -> &'static str {
        "fake-sql"
    }
}

pub struct FakeSqlSession {
    state: Arc<Mutex<SqlState>>,
}

#[async_trait]
impl SqlSession for FakeSqlSession {
    async fn fetch(&mut self, statement: &str) -> Result<Table> {
        let mut state = self.state.lock().unwrap();
        state.alive()?;
        state.executed.push(statement.to_string());

        if statement == "SELECT DATABASE()" {
            let current = state
                .current_database
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null);
            return Ok(Table::new(vec!["DATABASE()".into()], vec![vec![current]]));
        }
        if let Some(db) = statement.strip_prefix("USE ") {
            let db = ident(db);
            if !state.databases.contains_key(&db) {
                return Err(ConnectorError::Query(format!("Unknown database '{}'", db)));
            }
            state.current_database = Some(db);
            return Ok(Table::default());
        }
        if statement == "SHOW TABLES" {
            let db = state.current_database.clone().unwrap_or_default();
            let rows = state
                .databases
                .get(&db)
                .map(|tables| tables.keys().map(|t| vec![Value::String(t.clone())]).collect())
                .unwrap_or_default();
            return Ok(Table::new(vec![format!("Tables_in_{}", db)], rows));
        }
        if let Some(table) = statement.strip_prefix("SELECT * FROM ") {
            let table = state.table_mut(&ident(table))?.clone();
            let columns = if table.rows.is_empty() {
                Vec::new()
            } else {
                table.columns
            };
            return Ok(Table::new(columns, table.rows));
        }
        if statement.starts_with("BROKEN") {
            return Err(ConnectorError::Query("You have an error in your SQL syntax".into()));
        }
        Ok(Table::default())
    }

    async fn describe_columns(&mut self, statement: &str) -> Result<Vec<String>> {
        let table = statement
            .strip_prefix("SELECT * FROM ")
            .ok_or_else(|| ConnectorError::Query("unsupported statement".into()))?;
        let mut state = self.state.lock().unwrap();
        state.alive()?;
        Ok(state.table_mut(&ident(table))?.columns.clone())
    }

    async fn insert_rows(&mut self, statement: &str, rows: &[Vec<Value>]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.alive()?;
        state.inserts.push((statement.to_string(), rows.to_vec()));

        let rest = statement
            .strip_prefix("INSERT INTO ")
            .ok_or_else(|| ConnectorError::Query("not an insert".into()))?;
        let (table, rest) = rest
            .split_once(" (")
            .ok_or_else(|| ConnectorError::Query("missing column list".into()))?;
        let (columns, _) = rest
            .split_once(')')
            .ok_or_else(|| ConnectorError::Query("missing column list".into()))?;
        let columns: Vec<String> = columns.split(',').map(ident).collect();

        let target = state.table_mut(&ident(table))?;
        for row in rows {
            let full = target
                .columns
                .iter()
                .map(|c| {
                    columns
                        .iter()
                        .position(|given| given == c)
                        .and_then(|i| row.get(i).cloned())
                        .unwrap_or(Value::Null)
                })
                .collect();
            target.rows.push(full);
        }
        Ok(rows.len() as u64)
    }

    async fn ping(&mut self) -> Result<()> {
        self.state.lock().unwrap().alive()
    }

    async fn close(self) -> Result<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DocumentState {
    pub collections: HashMap<Namespace, Vec<Document>>,
    pub probes: u32,
    pub fail_probes: bool,
    pub shutdowns: u32,
}

/// Document driver backed by a shared in-memory store
#[derive(Clone, Default)]
pub struct FakeDocumentDriver {
    pub state: Arc<Mutex<DocumentState>>,
}

impl FakeDocumentDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(&Namespace::new(database, collection))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_probe_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_probes = fail;
    }
}

#[async_trait]
impl DocumentDriver for FakeDocumentDriver {
    type Client = FakeDocumentClient;

    async fn open(&self, uri: &str) -> Result<FakeDocumentClient> {
        if !uri.starts_with("mongodb://") {
            return Err(ConnectorError::ConnectionFailed(format!(
                "invalid connection string '{}'",
                uri
            )));
        }
        Ok(FakeDocumentClient {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakeDocumentClient {
    state: Arc<Mutex<DocumentState>>,
}

impl FakeDocumentClient {
    fn probe(&self, reply: Document) -> Result<Document> {
        let mut state = self.state.lock().unwrap();
        state.probes += 1;
        if state.fail_probes {
            return Err(ConnectorError::ConnectionFailed("server selection timeout".into()));
        }
        Ok(reply)
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn same_value(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| doc.get(key).is_some_and(|actual| same_value(actual, expected)))
}

fn apply_set(doc: &mut Document, update: &Document) -> bool {
    let mut changed = false;
    if let Ok(fields) = update.get_document("$set") {
        for (key, value) in fields {
            if !doc.get(key).is_some_and(|old| same_value(old, value)) {
                doc.insert(key.clone(), value.clone());
                changed = true;
            }
        }
    }
    changed
}

#[async_trait]
impl DocumentClient for FakeDocumentClient {
    async fn is_master(&self) -> Result<Document> {
        self.probe(bson::doc! { "ismaster": true, "ok": 1.0 })
    }

    async fn server_info(&self) -> Result<Document> {
        self.probe(bson::doc! { "version": "6.0.0", "ok": 1.0 })
    }

    async fn insert_one(&self, ns: &Namespace, doc: Document) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.collections.entry(ns.clone()).or_default().push(doc);
        Ok(())
    }

    async fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let count = docs.len();
        state.collections.entry(ns.clone()).or_default().extend(docs);
        Ok(count)
    }

    async fn find(&self, ns: &Namespace, filter: Document) -> Result<Vec<Document>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .collections
            .get(ns)
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, ns: &Namespace, filter: Document) -> Result<u64> {
        Ok(self.find(ns, filter).await?.len() as u64)
    }

    async fn delete(&self, ns: &Namespace, filter: Document, scope: Multiplicity) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let Some(docs) = state.collections.get_mut(ns) else {
            return Ok(0);
        };
        let mut deleted = 0;
        docs.retain(|d| {
            let hit = matches(d, &filter) && (scope == Multiplicity::Many || deleted == 0);
            if hit {
                deleted += 1;
            }
            !hit
        });
        Ok(deleted)
    }

    async fn update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: UpdateSpec,
        scope: Multiplicity,
    ) -> Result<u64> {
        let stages = match update {
            UpdateSpec::Document(doc) => vec![doc],
            UpdateSpec::Pipeline(stages) => stages,
        };
        let mut state = self.state.lock().unwrap();
        let Some(docs) = state.collections.get_mut(ns) else {
            return Ok(0);
        };
        let mut modified = 0;
        for doc in docs.iter_mut().filter(|d| matches(d, &filter)) {
            let mut changed = false;
            for stage in &stages {
                changed |= apply_set(doc, stage);
            }
            if changed {
                modified += 1;
            }
            if scope == Multiplicity::One {
                break;
            }
        }
        Ok(modified)
    }

    async fn shutdown(self) -> Result<()> {
        self.state.lock().unwrap().shutdowns += 1;
        Ok(())
    }
}
