//! MongoDB backend.
//!
//! Wraps one lazily-created `mongodb::Client`. The handle is cached after
//! the first successful connect and reused by every operation; a fresh
//! admin ping decides liveness on reconnect attempts.

use std::sync::RwLock;

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use log::debug;
use mongodb::Client;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{Error as DriverError, ErrorKind as DriverErrorKind};
use mongodb::options::ClientOptions;
use std::time::Duration;

use super::DocumentStore;
use crate::core::{
    CollectionStats, DatabaseInfo, DatabaseStats, DbError, DocumentId, Result, ServerInfo,
    classify_connection_message,
};
use crate::query::SearchFilter;

const AUTHENTICATION_FAILED_CODE: i32 = 18;

pub struct MongoStore {
    uri: String,
    selection_timeout: Option<Duration>,
    client: RwLock<Option<Client>>,
}

impl MongoStore {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            selection_timeout: None,
            client: RwLock::new(None),
        }
    }

    /// Bound server selection so unreachable targets fail within the
    /// configured connect budget instead of the driver's default.
    pub fn with_selection_timeout(uri: impl Into<String>, timeout: Duration) -> Self {
        Self {
            uri: uri.into(),
            selection_timeout: Some(timeout),
            client: RwLock::new(None),
        }
    }

    fn client(&self) -> Result<Client> {
        self.client
            .read()?
            .as_ref()
            .cloned()
            .ok_or_else(|| DbError::Connection("client is not connected".to_string()))
    }

    fn classify_connect(err: DriverError) -> DbError {
        match err.kind.as_ref() {
            DriverErrorKind::Authentication { message, .. } => {
                DbError::InvalidCredentials(message.clone())
            }
            DriverErrorKind::InvalidArgument { message, .. } => DbError::InvalidUrl(message.clone()),
            DriverErrorKind::DnsResolve { message, .. } => DbError::InvalidUrl(message.clone()),
            DriverErrorKind::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    DbError::ConnectionRefused(io_err.to_string())
                }
                std::io::ErrorKind::TimedOut => DbError::Timeout(io_err.to_string()),
                _ => classify_connection_message(&io_err.to_string()),
            },
            DriverErrorKind::Command(cmd) if cmd.code == AUTHENTICATION_FAILED_CODE => {
                DbError::InvalidCredentials(cmd.message.clone())
            }
            _ => classify_connection_message(&err.to_string()),
        }
    }

    fn classify_operation(err: DriverError) -> DbError {
        match err.kind.as_ref() {
            DriverErrorKind::Authentication { message, .. } => {
                DbError::InvalidCredentials(message.clone())
            }
            DriverErrorKind::Command(cmd) if cmd.code == AUTHENTICATION_FAILED_CODE => {
                DbError::InvalidCredentials(cmd.message.clone())
            }
            DriverErrorKind::Command(cmd) => DbError::Query(cmd.message.clone()),
            DriverErrorKind::ServerSelection { message, .. } => DbError::Timeout(message.clone()),
            DriverErrorKind::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    DbError::ConnectionRefused(io_err.to_string())
                }
                std::io::ErrorKind::TimedOut => DbError::Timeout(io_err.to_string()),
                _ => classify_connection_message(&io_err.to_string()),
            },
            _ => DbError::Query(err.to_string()),
        }
    }

    fn collection(&self, database: &str, collection: &str) -> Result<mongodb::Collection<Document>> {
        Ok(self.client()?.database(database).collection(collection))
    }

    fn filter_document(filter: Option<&SearchFilter>) -> Document {
        filter.map(SearchFilter::to_filter_document).unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn connect(&self) -> Result<()> {
        let cached = { self.client.read()?.as_ref().cloned() };
        let client = match cached {
            Some(client) => client,
            None => {
                let mut options = ClientOptions::parse(&self.uri)
                    .await
                    .map_err(Self::classify_connect)?;
                options.server_selection_timeout = self.selection_timeout;
                Client::with_options(options).map_err(Self::classify_connect)?
            }
        };

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(Self::classify_connect)?;

        *self.client.write()? = Some(client);
        debug!("connected to document store");
        Ok(())
    }

    async fn server_info(&self) -> Result<ServerInfo> {
        let info = self
            .client()?
            .database("admin")
            .run_command(doc! { "buildInfo": 1 })
            .await
            .map_err(Self::classify_operation)?;

        Ok(ServerInfo {
            version: info.get_str("version").unwrap_or("unknown").to_string(),
            git_version: info.get_str("gitVersion").ok().map(str::to_string),
        })
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let specs = self
            .client()?
            .list_databases()
            .await
            .map_err(Self::classify_operation)?;

        Ok(specs
            .into_iter()
            .map(|spec| DatabaseInfo {
                name: spec.name,
                size_on_disk: spec.size_on_disk,
            })
            .collect())
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.client()?
            .database(database)
            .list_collection_names()
            .await
            .map_err(Self::classify_operation)
    }

    async fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats> {
        let stats = self
            .client()?
            .database(database)
            .run_command(doc! { "collStats": collection })
            .await
            .map_err(Self::classify_operation)?;

        Ok(CollectionStats {
            size: read_u64(&stats, "size"),
            count: read_u64(&stats, "count"),
            storage_size: read_u64(&stats, "storageSize"),
            avg_obj_size: read_u64(&stats, "avgObjSize"),
        })
    }

    async fn database_stats(&self, database: &str) -> Result<DatabaseStats> {
        let stats = self
            .client()?
            .database(database)
            .run_command(doc! { "dbStats": 1 })
            .await
            .map_err(Self::classify_operation)?;

        Ok(DatabaseStats {
            collections: read_u64(&stats, "collections"),
            objects: read_u64(&stats, "objects"),
            data_size: read_u64(&stats, "dataSize"),
            storage_size: read_u64(&stats, "storageSize"),
            indexes: read_u64(&stats, "indexes"),
            index_size: read_u64(&stats, "indexSize"),
        })
    }

    async fn count_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<u64> {
        self.collection(database, collection)?
            .count_documents(Self::filter_document(filter))
            .await
            .map_err(Self::classify_operation)
    }

    async fn find_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<&SearchFilter>,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Document>> {
        let cursor = self
            .collection(database, collection)?
            .find(Self::filter_document(filter))
            .skip(skip)
            .limit(limit.max(0))
            .await
            .map_err(Self::classify_operation)?;

        cursor.try_collect().await.map_err(Self::classify_operation)
    }

    async fn insert_document(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> Result<DocumentId> {
        let result = self
            .collection(database, collection)?
            .insert_one(document)
            .await
            .map_err(Self::classify_operation)?;

        Ok(DocumentId::from_bson(&result.inserted_id))
    }

    async fn replace_document(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
        document: Document,
    ) -> Result<bool> {
        let result = self
            .collection(database, collection)?
            .replace_one(doc! { "_id": id.to_bson() }, document)
            .await
            .map_err(Self::classify_operation)?;

        Ok(result.modified_count > 0)
    }

    async fn delete_document(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
    ) -> Result<bool> {
        let result = self
            .collection(database, collection)?
            .delete_one(doc! { "_id": id.to_bson() })
            .await
            .map_err(Self::classify_operation)?;

        Ok(result.deleted_count > 0)
    }

    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64> {
        let result = self
            .collection(database, collection)?
            .delete_many(doc! {})
            .await
            .map_err(Self::classify_operation)?;

        Ok(result.deleted_count)
    }

    async fn create_collection(&self, database: &str, collection: &str) -> Result<()> {
        self.client()?
            .database(database)
            .create_collection(collection)
            .await
            .map_err(Self::classify_operation)
    }
}

/// Stats commands report numbers as whatever width the server picked.
fn read_u64(document: &Document, key: &str) -> u64 {
    match document.get(key) {
        Some(Bson::Int32(v)) => (*v).max(0) as u64,
        Some(Bson::Int64(v)) => (*v).max(0) as u64,
        Some(Bson::Double(v)) if *v >= 0.0 => *v as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u64_across_widths() {
        let stats = doc! { "size": 512_i32, "count": 3_i64, "avgObjSize": 170.6 };
        assert_eq!(read_u64(&stats, "size"), 512);
        assert_eq!(read_u64(&stats, "count"), 3);
        assert_eq!(read_u64(&stats, "avgObjSize"), 170);
        assert_eq!(read_u64(&stats, "storageSize"), 0);
    }

    #[test]
    fn test_read_u64_ignores_negatives() {
        let stats = doc! { "size": -1_i32 };
        assert_eq!(read_u64(&stats, "size"), 0);
    }

    #[test]
    fn test_operations_require_connect() {
        let store = MongoStore::new("mongodb://localhost:27017");
        assert!(store.client().is_err());
    }
}
