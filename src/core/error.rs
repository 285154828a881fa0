use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("connection timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    InvalidCredentials(String),

    #[error("invalid connection string: {0}")]
    InvalidUrl(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("query execution error: {0}")]
    Query(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("rejected in read-only mode: {0}")]
    ReadOnly(String),

    #[error("lock error: {0}")]
    Lock(String),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionRefused(_) => ErrorKind::ConnectionRefused,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::InvalidCredentials(_) => ErrorKind::InvalidCredentials,
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Query(_) => ErrorKind::Query,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::ReadOnly(_) => ErrorKind::ReadOnly,
            Self::Lock(_) => ErrorKind::Lock,
        }
    }
}

/// Stable tag the UI switches on. Connection-class kinds route to the
/// dedicated "cannot connect" view instead of a per-operation toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ConnectionRefused,
    Timeout,
    InvalidCredentials,
    InvalidUrl,
    Connection,
    Query,
    MalformedInput,
    ReadOnly,
    Lock,
}

impl ErrorKind {
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused
                | Self::Timeout
                | Self::InvalidCredentials
                | Self::InvalidUrl
                | Self::Connection
        )
    }
}

/// Error payload carried by failure envelopes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<DbError> for ErrorInfo {
    fn from(err: DbError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

/// Classify a connection failure the driver reports only as text.
///
/// Typed driver kinds (bad auth, malformed URI) are mapped before this is
/// consulted; this covers the refusal/timeout signals that only show up in
/// the message.
pub fn classify_connection_message(message: &str) -> DbError {
    let lowered = message.to_lowercase();
    if lowered.contains("refused") {
        DbError::ConnectionRefused(message.to_string())
    } else if lowered.contains("timed out") || lowered.contains("timeout") {
        DbError::Timeout(message.to_string())
    } else {
        DbError::Connection(message.to_string())
    }
}
