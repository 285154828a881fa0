pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::core::{
    CollectionStats, DatabaseInfo, DatabaseStats, DocumentId, Result, ServerInfo,
};
use crate::query::SearchFilter;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// The driver seam between the service and a concrete document store.
///
/// Filters cross this boundary as typed [`SearchFilter`]s; each backend
/// lowers them to its native form. Errors come back already classified as
/// [`crate::core::DbError`]s.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Open (or verify) the underlying connection. Safe to call
    /// concurrently and repeatedly; an established handle is reused.
    async fn connect(&self) -> Result<()>;

    async fn server_info(&self) -> Result<ServerInfo>;

    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>>;

    async fn list_collections(&self, database: &str) -> Result<Vec<String>>;

    async fn collection_stats(&self, database: &str, collection: &str)
    -> Result<CollectionStats>;

    async fn database_stats(&self, database: &str) -> Result<DatabaseStats>;

    async fn count_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<&SearchFilter>,
    ) -> Result<u64>;

    /// Fetch documents in stable store order. A non-positive `limit` means
    /// no cap.
    async fn find_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Option<&SearchFilter>,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Document>>;

    /// Insert one document, returning its identity (assigned by the store
    /// when the payload carries none).
    async fn insert_document(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> Result<DocumentId>;

    /// Full field-set replacement matched by identity. Returns whether a
    /// document was actually modified.
    async fn replace_document(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
        document: Document,
    ) -> Result<bool>;

    /// Returns whether a document was removed; a missing identity is not an
    /// error.
    async fn delete_document(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
    ) -> Result<bool>;

    /// Remove every document, returning the count removed.
    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64>;

    /// Explicit creation; some stores only materialize a collection on
    /// first write.
    async fn create_collection(&self, database: &str, collection: &str) -> Result<()>;
}
