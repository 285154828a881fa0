pub mod error;
pub mod id;
pub mod types;

pub use error::{DbError, ErrorInfo, ErrorKind, Result, classify_connection_message};
pub use id::DocumentId;
pub use types::{
    CollectionStats, CollectionSummary, DatabaseInfo, DatabaseListing, DatabaseStats,
    DatabaseSummary, ServerInfo,
};
