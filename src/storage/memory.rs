//! In-process document store.
//!
//! Backs tests and demos with the same operation surface as the Mongo
//! backend, plus fault-injection switches so connection-lifecycle behavior
//! can be exercised deterministically.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document, to_vec};
use regex::{Regex, RegexBuilder};

use super::DocumentStore;
use crate::core::{
    CollectionStats, DatabaseInfo, DatabaseStats, DbError, DocumentId, Result, ServerInfo,
};
use crate::query::{FilterValue, SearchFilter};

type Collections = BTreeMap<String, Vec<Document>>;

pub struct MemoryStore {
    databases: RwLock<BTreeMap<String, Collections>>,
    connect_fault: RwLock<Option<DbError>>,
    operation_fault: RwLock<Option<DbError>>,
    connect_delay: RwLock<Option<Duration>>,
    connects: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(BTreeMap::new()),
            connect_fault: RwLock::new(None),
            operation_fault: RwLock::new(None),
            connect_delay: RwLock::new(None),
            connects: AtomicU64::new(0),
        }
    }

    /// Make every connect attempt fail with `error` (None clears).
    pub fn fail_connects(&self, error: Option<DbError>) {
        if let Ok(mut fault) = self.connect_fault.write() {
            *fault = error;
        }
    }

    /// Make every operation fail with `error` (None clears).
    pub fn fail_operations(&self, error: Option<DbError>) {
        if let Ok(mut fault) = self.operation_fault.write() {
            *fault = error;
        }
    }

    /// Stall connect attempts, e.g. beyond the caller's connect timeout.
    pub fn delay_connects(&self, delay: Option<Duration>) {
        if let Ok(mut configured) = self.connect_delay.write() {
            *configured = delay;
        }
    }

    /// How many connect attempts have been made.
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }

    fn check_fault(&self) -> Result<()> {
        match self.operation_fault.read()?.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let delay = *self.connect_delay.read()?;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.connect_fault.read()?.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn server_info(&self) -> Result<ServerInfo> {
        self.check_fault()?;
        Ok(ServerInfo {
            version: format!("{}-memory", env!("CARGO_PKG_VERSION")),
            git_version: None,
        })
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        self.check_fault()?;
        let databases = self.databases.read()?;
        Ok(databases
            .iter()
            .map(|(name, collections)| DatabaseInfo {
                name: name.clone(),
                size_on_disk: collections
                    .values()
                    .flat_map(|documents| documents.iter().map(document_size))
                    .sum(),
            })
            .collect())
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.check_fault()?;
        let databases = self.databases.read()?;
        Ok(databases
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats> {
        self.check_fault()?;
        let databases = self.databases.read()?;
        let documents = databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .ok_or_else(|| {
                DbError::Query(format!("collection '{database}.{collection}' not found"))
            })?;

        let size: u64 = documents.iter().map(document_size).sum();
        let count = documents.len() as u64;
        Ok(CollectionStats {
            size,
            count,
            storage_size: size,
            avg_obj_size: if count == 0 { 0 } else { size / count },
        })
    }

    async fn database_stats(&self, database: &str) -> Result<DatabaseStats> {
        self.check_fault()?;
        let databases = self.databases.read()?;
        let Some(collections) = databases.get(database) else {
            return Ok(DatabaseStats::default());
        };

        let data_size: u64 = collections
            .values()
            .flat_map(|documents| documents.iter().map(document_size))
            .sum();
        Ok(DatabaseStats {
            collections: collections.len() as u64,
            objects: collections.values().map(|documents| documents.len() as u64).sum(),
            data_size,
            storage_size: data_size,
            indexes: collections.len() as u64,
            index_size: 0,
        })
    }

    async fn count_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<u64> {
        self.check_fault()?;
        let matcher = filter.map(Matcher::compile).transpose()?;
        let databases = self.databases.read()?;
        let Some(documents) = databases
            .get(database)
            .and_then(|collections| collections.get(collection))
        else {
            return Ok(0);
        };

        Ok(documents
            .iter()
            .filter(|document| matcher.as_ref().is_none_or(|m| m.matches(document)))
            .count() as u64)
    }

    async fn find_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<&SearchFilter>,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Document>> {
        self.check_fault()?;
        let matcher = filter.map(Matcher::compile).transpose()?;
        let databases = self.databases.read()?;
        let Some(documents) = databases
            .get(database)
            .and_then(|collections| collections.get(collection))
        else {
            return Ok(Vec::new());
        };

        let selected = documents
            .iter()
            .filter(|document| matcher.as_ref().is_none_or(|m| m.matches(document)))
            .skip(skip as usize);
        Ok(if limit > 0 {
            selected.take(limit as usize).cloned().collect()
        } else {
            selected.cloned().collect()
        })
    }

    async fn insert_document(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> Result<DocumentId> {
        self.check_fault()?;
        let mut document = document;
        let id_value = match document.get("_id") {
            Some(value) => value.clone(),
            None => {
                let oid = ObjectId::new();
                document.insert("_id", oid);
                Bson::ObjectId(oid)
            }
        };

        let mut databases = self.databases.write()?;
        databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .push(document);

        Ok(DocumentId::from_bson(&id_value))
    }

    async fn replace_document(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
        document: Document,
    ) -> Result<bool> {
        self.check_fault()?;
        let target = id.to_bson();
        let mut databases = self.databases.write()?;
        let Some(documents) = databases
            .get_mut(database)
            .and_then(|collections| collections.get_mut(collection))
        else {
            return Ok(false);
        };

        for existing in documents.iter_mut() {
            if existing.get("_id") == Some(&target) {
                // keep _id leading so an unchanged replacement compares equal
                let mut replacement = Document::new();
                replacement.insert("_id", target.clone());
                for (key, value) in document {
                    replacement.insert(key, value);
                }
                let modified = *existing != replacement;
                *existing = replacement;
                return Ok(modified);
            }
        }
        Ok(false)
    }

    async fn delete_document(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
    ) -> Result<bool> {
        self.check_fault()?;
        let target = id.to_bson();
        let mut databases = self.databases.write()?;
        let Some(documents) = databases
            .get_mut(database)
            .and_then(|collections| collections.get_mut(collection))
        else {
            return Ok(false);
        };

        match documents
            .iter()
            .position(|document| document.get("_id") == Some(&target))
        {
            Some(index) => {
                documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64> {
        self.check_fault()?;
        let mut databases = self.databases.write()?;
        let Some(documents) = databases
            .get_mut(database)
            .and_then(|collections| collections.get_mut(collection))
        else {
            return Ok(0);
        };

        let removed = documents.len() as u64;
        documents.clear();
        Ok(removed)
    }

    async fn create_collection(&self, database: &str, collection: &str) -> Result<()> {
        self.check_fault()?;
        let mut databases = self.databases.write()?;
        let collections = databases.entry(database.to_string()).or_default();
        if collections.contains_key(collection) {
            return Err(DbError::Query(format!(
                "collection '{collection}' already exists"
            )));
        }
        collections.insert(collection.to_string(), Vec::new());
        Ok(())
    }
}

/// A search filter compiled for evaluation against stored documents.
#[derive(Debug)]
struct Matcher {
    path: String,
    kind: MatcherKind,
}

#[derive(Debug)]
enum MatcherKind {
    Number(f64),
    Bool(bool),
    Pattern(Regex),
}

impl Matcher {
    fn compile(filter: &SearchFilter) -> Result<Self> {
        let kind = match &filter.value {
            FilterValue::Integer(value) => MatcherKind::Number(*value as f64),
            FilterValue::Float(value) => MatcherKind::Number(*value),
            FilterValue::Bool(value) => MatcherKind::Bool(*value),
            FilterValue::Text(pattern) => MatcherKind::Pattern(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|err| DbError::Query(format!("invalid search pattern: {err}")))?,
            ),
        };
        Ok(Self {
            path: filter.path.clone(),
            kind,
        })
    }

    fn matches(&self, document: &Document) -> bool {
        let Some(value) = resolve_path(document, &self.path) else {
            return false;
        };
        match &self.kind {
            MatcherKind::Number(expected) => {
                bson_number(value).is_some_and(|n| (n - expected).abs() < f64::EPSILON)
            }
            MatcherKind::Bool(expected) => value.as_bool() == Some(*expected),
            MatcherKind::Pattern(pattern) => {
                value.as_str().is_some_and(|s| pattern.is_match(s))
            }
        }
    }
}

fn resolve_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

fn bson_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn document_size(document: &Document) -> u64 {
    to_vec(document).map(|bytes| bytes.len() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn matcher(key: &str, value: &str) -> Matcher {
        Matcher::compile(&SearchFilter::parse(key, value)).unwrap()
    }

    #[test]
    fn test_numeric_match_bridges_widths() {
        let m = matcher("age", "42");
        assert!(m.matches(&doc! { "age": 42_i32 }));
        assert!(m.matches(&doc! { "age": 42_i64 }));
        assert!(m.matches(&doc! { "age": 42.0 }));
        assert!(!m.matches(&doc! { "age": 43 }));
        assert!(!m.matches(&doc! { "age": "42" }));
    }

    #[test]
    fn test_bool_match_is_strict() {
        let m = matcher("active", "true");
        assert!(m.matches(&doc! { "active": true }));
        assert!(!m.matches(&doc! { "active": "true" }));
        assert!(!m.matches(&doc! { "active": 1 }));
    }

    #[test]
    fn test_text_match_is_substring_and_case_insensitive() {
        let m = matcher("name", "grace");
        assert!(m.matches(&doc! { "name": "Grace Hopper" }));
        assert!(m.matches(&doc! { "name": "disgraceful" }));
        assert!(!m.matches(&doc! { "name": "Ada" }));
        assert!(!m.matches(&doc! { "name": 42 }));
    }

    #[test]
    fn test_dot_path_resolution() {
        let m = matcher("address_city", "oslo");
        assert!(m.matches(&doc! { "address": { "city": "Oslo" } }));
        assert!(!m.matches(&doc! { "address": { "city": "Bergen" } }));
        assert!(!m.matches(&doc! { "address": "Oslo" }));
    }

    #[test]
    fn test_invalid_pattern_is_a_query_error() {
        let err = Matcher::compile(&SearchFilter::parse("name", "(unclosed")).unwrap_err();
        assert!(matches!(err, DbError::Query(_)));
    }

    #[test]
    fn test_missing_path_never_matches() {
        let m = matcher("missing", "1");
        assert!(!m.matches(&doc! { "present": 1 }));
    }

    #[test]
    fn test_document_size_is_positive() {
        assert!(document_size(&doc! { "a": 1 }) > 0);
    }
}
