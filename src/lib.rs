// ============================================================================
// mongodeck Library
// ============================================================================

//! Database-access layer for a document-store admin UI.
//!
//! The presentation layer calls [`AdminService`] in-process; the service
//! owns one lazily-opened connection to the store, wraps every outcome in
//! an [`Outcome`] envelope, and classifies connection failures so the UI
//! can tell "cannot connect" apart from per-operation errors.
//!
//! ```no_run
//! use mongodeck::{AdminService, PageRequest};
//!
//! # tokio_test::block_on(async {
//! let service = AdminService::from_env();
//!
//! let listing = service.list_databases().await;
//! if let Some(listing) = listing.data() {
//!     for database in &listing.databases {
//!         println!("{} ({} bytes)", database.name, database.total_size);
//!     }
//! }
//!
//! let page = service
//!     .search("shop", "orders", "status", "pending", PageRequest::default())
//!     .await;
//! # });
//! ```

pub mod config;
pub mod connection;
pub mod core;
pub mod facade;
pub mod json;
pub mod query;
pub mod result;
pub mod storage;

// Re-export main types for convenience
pub use config::{ServiceConfig, env_bool, env_int, env_str};
pub use connection::{ConnState, ConnectionManager};
pub use core::{
    CollectionStats, CollectionSummary, DatabaseInfo, DatabaseListing, DatabaseStats,
    DatabaseSummary, DbError, DocumentId, ErrorInfo, ErrorKind, Result, ServerInfo,
};
pub use facade::{AdminService, MARKER_COLLECTION};
pub use query::{FilterValue, SearchFilter};
pub use result::{Outcome, Page, PageRequest, Pagination};
pub use storage::{DocumentStore, MemoryStore, MongoStore};
