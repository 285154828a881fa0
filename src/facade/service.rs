//! The query/result service the UI talks to.
//!
//! Every operation ensures a live connection first, wraps its outcome in an
//! [`Outcome`] envelope, and never lets a fault escape as an error the
//! caller has to catch. Any fault while using the connection flips it back
//! to unconnected so the next operation reconnects.

use std::future::Future;
use std::sync::Arc;

use log::{error, warn};

use crate::config::ServiceConfig;
use crate::connection::ConnectionManager;
use crate::core::{
    CollectionStats, CollectionSummary, DatabaseListing, DatabaseStats, DatabaseSummary, DbError,
    DocumentId, Result, ServerInfo,
};
use crate::json;
use crate::query::SearchFilter;
use crate::result::{Outcome, Page, PageRequest, Pagination};
use crate::storage::{DocumentStore, MongoStore};

/// Creating a database is only observable once it holds a collection, so
/// one throwaway collection is written and kept. Dropping it would delete
/// the database again once empty.
pub const MARKER_COLLECTION: &str = "_placeholder";

/// Database administration service over a single shared connection.
///
/// # Examples
///
/// ```no_run
/// use mongodeck::{AdminService, PageRequest};
///
/// # tokio_test::block_on(async {
/// let service = AdminService::from_env();
///
/// let listing = service.list_databases().await;
/// let page = service
///     .fetch_page("shop", "orders", PageRequest::default())
///     .await;
/// # });
/// ```
pub struct AdminService<S: DocumentStore> {
    store: Arc<S>,
    connection: ConnectionManager<S>,
    read_only: bool,
}

impl AdminService<MongoStore> {
    /// Service against the store configured in the environment.
    pub fn from_env() -> Self {
        Self::with_config(ServiceConfig::from_env())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let store = MongoStore::with_selection_timeout(config.url.as_str(), config.connect_timeout);
        Self::new(store, &config)
    }
}

impl<S: DocumentStore> AdminService<S> {
    pub fn new(store: S, config: &ServiceConfig) -> Self {
        let store = Arc::new(store);
        let connection = ConnectionManager::new(Arc::clone(&store), config.connect_timeout);
        Self {
            store,
            connection,
            read_only: config.read_only,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn connection(&self) -> &ConnectionManager<S> {
        &self.connection
    }

    // DATABASE

    pub async fn server_info(&self) -> Outcome<ServerInfo> {
        self.guarded(self.store.server_info()).await.into()
    }

    /// Every database on the server with its collections and sizes, plus
    /// the aggregate on-disk total. Hiding system databases is the
    /// sidebar's policy, not done here.
    pub async fn list_databases(&self) -> Outcome<DatabaseListing> {
        self.guarded(self.collect_databases()).await.into()
    }

    pub async fn database_stats(&self, database: &str) -> Outcome<DatabaseStats> {
        if let Err(err) = json::validate_database_name(database) {
            return Outcome::failure(err);
        }
        self.guarded(self.store.database_stats(database)).await.into()
    }

    /// Materialize a database by writing its marker collection.
    pub async fn create_database(&self, database: &str) -> Outcome<()> {
        if let Err(err) = self.check_writable() {
            return Outcome::failure(err);
        }
        if let Err(err) = json::validate_database_name(database) {
            return Outcome::failure(err);
        }
        self.guarded(self.store.create_collection(database, MARKER_COLLECTION))
            .await
            .into()
    }

    // COLLECTION

    pub async fn list_collections(&self, database: &str) -> Outcome<Vec<String>> {
        if let Err(err) = json::validate_database_name(database) {
            return Outcome::failure(err);
        }
        self.guarded(self.sorted_collections(database)).await.into()
    }

    pub async fn collection_stats(
        &self,
        database: &str,
        collection: &str,
    ) -> Outcome<CollectionStats> {
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure(err);
        }
        self.guarded(self.store.collection_stats(database, collection))
            .await
            .into()
    }

    /// Membership check over the collection listing; the store is not
    /// assumed to have a dedicated existence API.
    pub async fn collection_exists(&self, database: &str, collection: &str) -> Outcome<bool> {
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure(err);
        }
        let exists = self.guarded(async {
            let names = self.store.list_collections(database).await?;
            Ok(names.iter().any(|name| name == collection))
        });
        exists.await.into()
    }

    pub async fn create_collection(&self, database: &str, collection: &str) -> Outcome<()> {
        if let Err(err) = self.check_writable() {
            return Outcome::failure(err);
        }
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure(err);
        }
        self.guarded(self.store.create_collection(database, collection))
            .await
            .into()
    }

    // DOCUMENTS

    /// One page of an unfiltered collection listing.
    ///
    /// On any fault the envelope still carries an empty page with zeroed
    /// pagination — the page number resets to 1 rather than being
    /// preserved.
    pub async fn fetch_page(
        &self,
        database: &str,
        collection: &str,
        request: PageRequest,
    ) -> Outcome<Page> {
        let request = request.normalized();
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure_with(err, Page::empty(request.page_size));
        }
        match self
            .guarded(self.read_page(database, collection, None, request))
            .await
        {
            Ok(page) => Outcome::success(page),
            Err(err) => Outcome::failure_with(err, Page::empty(request.page_size)),
        }
    }

    /// One page of documents matching a single key/value predicate.
    pub async fn search(
        &self,
        database: &str,
        collection: &str,
        key: &str,
        value: &str,
        request: PageRequest,
    ) -> Outcome<Page> {
        let request = request.normalized();
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure_with(err, Page::empty(request.page_size));
        }
        let filter = SearchFilter::parse(key, value);
        match self
            .guarded(self.read_page(database, collection, Some(&filter), request))
            .await
        {
            Ok(page) => Outcome::success(page),
            Err(err) => Outcome::failure_with(err, Page::empty(request.page_size)),
        }
    }

    /// Insert one document submitted as JSON text; returns the identity the
    /// store assigned (or the one the payload carried).
    pub async fn insert_document(
        &self,
        database: &str,
        collection: &str,
        payload: &str,
    ) -> Outcome<DocumentId> {
        if let Err(err) = self.check_writable() {
            return Outcome::failure(err);
        }
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure(err);
        }
        let document = match json::parse_document(payload) {
            Ok(document) => document,
            Err(err) => return Outcome::failure(err),
        };
        self.guarded(self.store.insert_document(database, collection, document))
            .await
            .into()
    }

    /// Full field-set replacement matched by identity. The payload's own
    /// identity field is stripped first; it can never be overwritten.
    pub async fn update_document(
        &self,
        database: &str,
        collection: &str,
        document_id: &str,
        payload: &str,
    ) -> Outcome<bool> {
        if let Err(err) = self.check_writable() {
            return Outcome::failure(err);
        }
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure(err);
        }
        let mut document = match json::parse_document(payload) {
            Ok(document) => document,
            Err(err) => return Outcome::failure(err),
        };
        document.remove("_id");
        let id = DocumentId::parse(document_id);
        self.guarded(self.store.replace_document(database, collection, &id, document))
            .await
            .into()
    }

    /// Returns whether a document was removed; a missing identity reports
    /// `false`, not an error.
    pub async fn delete_document(
        &self,
        database: &str,
        collection: &str,
        document_id: &str,
    ) -> Outcome<bool> {
        if let Err(err) = self.check_writable() {
            return Outcome::failure(err);
        }
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure(err);
        }
        let id = DocumentId::parse(document_id);
        self.guarded(self.store.delete_document(database, collection, &id))
            .await
            .into()
    }

    /// Remove every document in a collection. Irreversible; the UI owns the
    /// confirmation dialog.
    pub async fn delete_all_documents(&self, database: &str, collection: &str) -> Outcome<u64> {
        if let Err(err) = self.check_writable() {
            return Outcome::failure(err);
        }
        if let Err(err) = self.check_namespace(database, collection) {
            return Outcome::failure(err);
        }
        self.guarded(self.store.delete_all(database, collection))
            .await
            .into()
    }

    // internals

    /// Ensure a live connection, run the operation, and treat any fault as
    /// a dead connection before handing the error back.
    async fn guarded<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        self.connection.ensure_connected().await?;
        match operation.await {
            Ok(value) => Ok(value),
            Err(err) => {
                error!("operation failed: {err}");
                self.connection.mark_unconnected();
                Err(err)
            }
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            Err(DbError::ReadOnly(
                "the service is running in read-only mode".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn check_namespace(&self, database: &str, collection: &str) -> Result<()> {
        json::validate_database_name(database)?;
        json::validate_collection_name(collection)
    }

    async fn sorted_collections(&self, database: &str) -> Result<Vec<String>> {
        let mut names = self.store.list_collections(database).await?;
        names.sort();
        Ok(names)
    }

    async fn read_page(
        &self,
        database: &str,
        collection: &str,
        filter: Option<&SearchFilter>,
        request: PageRequest,
    ) -> Result<Page> {
        let total = self
            .store
            .count_documents(database, collection, filter)
            .await?;
        let documents = self
            .store
            .find_documents(
                database,
                collection,
                filter,
                request.skip(),
                request.page_size as i64,
            )
            .await?;

        Ok(Page::new(
            documents,
            Pagination::new(total, request.page, request.page_size),
        ))
    }

    async fn collect_databases(&self) -> Result<DatabaseListing> {
        let infos = self.store.list_databases().await?;
        let mut databases = Vec::with_capacity(infos.len());
        let mut total_size = 0;

        for info in infos {
            let mut collections = Vec::new();
            match self.sorted_collections(&info.name).await {
                Ok(names) => {
                    for name in names {
                        let summary = match self.store.collection_stats(&info.name, &name).await {
                            Ok(stats) => CollectionSummary {
                                name,
                                total_size: stats.size,
                                document_count: stats.count,
                            },
                            Err(err) => {
                                warn!("stats unavailable for {}.{}: {}", info.name, name, err);
                                CollectionSummary {
                                    name,
                                    total_size: 0,
                                    document_count: 0,
                                }
                            }
                        };
                        collections.push(summary);
                    }
                }
                Err(err) => {
                    warn!("could not list collections of {}: {}", info.name, err);
                }
            }

            total_size += info.size_on_disk;
            databases.push(DatabaseSummary {
                name: info.name,
                total_size: info.size_on_disk,
                collections,
            });
        }

        Ok(DatabaseListing {
            databases,
            total_size,
        })
    }
}
