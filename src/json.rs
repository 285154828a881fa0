//! JSON payloads between the UI and the document store.
//!
//! The UI submits documents as JSON text and renders what the store returns,
//! so parsing, identity-aware rendering, and namespace validation live here.

use mongodb::bson::{Bson, Document};
use serde_json::Value as JsonValue;

use crate::core::{DbError, Result};

const MAX_DATABASE_NAME_LEN: usize = 63;
const DATABASE_FORBIDDEN_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0'];

/// Parse the JSON text of a single document submitted for insert or update.
pub fn parse_document(payload: &str) -> Result<Document> {
    let value: JsonValue = serde_json::from_str(payload)
        .map_err(|err| DbError::MalformedInput(format!("invalid JSON: {err}")))?;

    if !value.is_object() {
        return Err(DbError::MalformedInput(
            "expected a JSON object".to_string(),
        ));
    }

    match Bson::try_from(value) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(_) => Err(DbError::MalformedInput(
            "expected a JSON object".to_string(),
        )),
        Err(err) => Err(DbError::MalformedInput(format!("invalid document: {err}"))),
    }
}

/// Render a stored document for the UI.
///
/// Object-id identities come out as `{"$oid": "<hex>"}`; the UI unwraps that
/// shape before editing and re-supplies the raw string form on update/delete.
pub fn document_to_json(document: &Document) -> JsonValue {
    Bson::Document(document.clone()).into_relaxed_extjson()
}

pub fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DbError::MalformedInput(
            "database name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_DATABASE_NAME_LEN {
        return Err(DbError::MalformedInput(format!(
            "database name exceeds {MAX_DATABASE_NAME_LEN} bytes: '{name}'"
        )));
    }
    if name.contains(DATABASE_FORBIDDEN_CHARS) {
        return Err(DbError::MalformedInput(format!(
            "database name contains a forbidden character: '{name}'"
        )));
    }
    Ok(())
}

pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DbError::MalformedInput(
            "collection name cannot be empty".to_string(),
        ));
    }
    if name.contains('$') || name.contains('\0') {
        return Err(DbError::MalformedInput(format!(
            "collection name contains a forbidden character: '{name}'"
        )));
    }
    if name.starts_with("system.") {
        return Err(DbError::MalformedInput(format!(
            "collection name is reserved: '{name}'"
        )));
    }
    Ok(())
}
