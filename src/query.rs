//! Search predicate construction.
//!
//! The UI submits a single key/value pair; the value's type decides the
//! match: numeric equality, boolean equality, or a case-insensitive
//! substring/regex over string fields. Keys use underscore-delimited path
//! notation for nested fields ("address_city" targets `address.city`).

use mongodb::bson::{Bson, Document, doc};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    pub path: String,
    pub value: FilterValue,
}

impl SearchFilter {
    pub fn parse(key: &str, value: &str) -> Self {
        Self {
            path: key.replace('_', "."),
            value: classify(value),
        }
    }

    /// Lower to the store's native filter shape.
    pub fn to_filter_document(&self) -> Document {
        let clause: Bson = match &self.value {
            FilterValue::Integer(v) => Bson::Int64(*v),
            FilterValue::Float(v) => Bson::Double(*v),
            FilterValue::Bool(v) => Bson::Boolean(*v),
            FilterValue::Text(pattern) => {
                Bson::Document(doc! { "$regex": pattern.as_str(), "$options": "i" })
            }
        };
        let mut filter = Document::new();
        filter.insert(self.path.as_str(), clause);
        filter
    }
}

fn classify(raw: &str) -> FilterValue {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return FilterValue::Integer(value);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        // "NaN" and "inf" parse but are not equality targets; treat as text
        if value.is_finite() {
            return FilterValue::Float(value);
        }
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => FilterValue::Bool(true),
        "false" => FilterValue::Bool(false),
        _ => FilterValue::Text(raw.to_string()),
    }
}
