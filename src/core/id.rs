use lazy_static::lazy_static;
use mongodb::bson::Bson;
use mongodb::bson::oid::ObjectId;
use regex::Regex;
use serde::{Serialize, Serializer};

lazy_static! {
    static ref OBJECT_ID_PATTERN: Regex = Regex::new("^[0-9a-fA-F]{24}$").unwrap();
}

/// Identity of a document as supplied by the UI or assigned by the store.
///
/// A 24-hex-character value is a binary object identifier; anything else is
/// an opaque string key. The decision lives here and nowhere else, so update
/// and delete targeting can never disagree about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentId {
    ObjectId(ObjectId),
    Raw(String),
}

impl DocumentId {
    /// Parse the raw string form the UI supplies.
    pub fn parse(raw: &str) -> Self {
        if OBJECT_ID_PATTERN.is_match(raw) {
            match ObjectId::parse_str(raw) {
                Ok(oid) => Self::ObjectId(oid),
                Err(_) => Self::Raw(raw.to_string()),
            }
        } else {
            Self::Raw(raw.to_string())
        }
    }

    /// Identity of a stored document, usually its `_id` value.
    pub fn from_bson(value: &Bson) -> Self {
        match value {
            Bson::ObjectId(oid) => Self::ObjectId(*oid),
            Bson::String(s) => Self::Raw(s.clone()),
            other => Self::Raw(other.to_string()),
        }
    }

    /// The value used to match `_id` in filters.
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::ObjectId(oid) => Bson::ObjectId(*oid),
            Self::Raw(s) => Bson::String(s.clone()),
        }
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            Self::Raw(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
