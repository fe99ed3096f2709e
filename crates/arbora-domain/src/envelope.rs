//! The update-envelope contract
//!
//! Every extraction or classification service returns the same strict shape:
//! a mapping from dotted field paths to either a concrete value or the
//! sentinel. The sentinel distinguishes "the service did not provide this
//! field" from "the field is explicitly empty"; sentinel values must never
//! overwrite a concrete value already in the record.

use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reserved "not provided" marker (wire value for unknown fields)
pub const NOT_PROVIDED: &str = "Not provided";

/// Placeholder path/value used on synthetic provenance rows when an
/// extractor ran but nothing applied
pub const NOT_FOUND: &str = "Not Found";

/// Envelope roots that may never be written through a turn. The location and
/// party identities live in the read-only [`crate::JobContext`].
pub const CONTEXT_ROOTS: [&str; 4] = ["arborist_info", "customer_info", "location", "job_id"];

/// Strings extractors commonly emit that mean "nothing here"
const NOISE_STRINGS: [&str; 5] = ["not provided", "n/a", "na", "none", "none provided"];

/// One field's incoming value: the sentinel, a scalar, or list elements
///
/// List elements are kept as raw JSON values because two list fields
/// (`targets.items`, `risks.items`) carry structured objects; the merge
/// engine revalidates them against the record schema.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The sentinel: field not provided by the service
    NotProvided,
    /// A concrete scalar value
    Text(String),
    /// Elements to append to a list field
    List(Vec<Value>),
}

impl FieldValue {
    /// Build a scalar value, normalizing blanks and noise to the sentinel
    pub fn text(s: impl Into<String>) -> FieldValue {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() || NOISE_STRINGS.contains(&trimmed.to_lowercase().as_str()) {
            return FieldValue::NotProvided;
        }
        FieldValue::Text(trimmed.to_string())
    }

    /// Build a list value; an empty list collapses to the sentinel
    pub fn list(elems: Vec<Value>) -> FieldValue {
        if elems.is_empty() {
            FieldValue::NotProvided
        } else {
            FieldValue::List(elems)
        }
    }

    /// True when this value carries real content
    pub fn is_provided(&self) -> bool {
        match self {
            FieldValue::NotProvided => false,
            FieldValue::Text(s) => !s.trim().is_empty() && s != NOT_PROVIDED,
            FieldValue::List(v) => !v.is_empty(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::NotProvided => serializer.serialize_str(NOT_PROVIDED),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::List(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FieldValue::from_json(value).map_err(D::Error::custom)
    }
}

impl FieldValue {
    /// Convert a raw JSON value into a field value
    ///
    /// Numbers and booleans are coerced to their string form (record scalars
    /// are numeric-as-string). Objects are rejected: a lone object is not a
    /// valid field value under the envelope contract.
    pub fn from_json(value: Value) -> Result<FieldValue, String> {
        match value {
            Value::Null => Ok(FieldValue::NotProvided),
            Value::String(s) => Ok(FieldValue::text(s)),
            Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
            Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
            Value::Array(v) => Ok(FieldValue::list(v)),
            Value::Object(_) => Err("object is not a valid envelope field value".to_string()),
        }
    }
}

/// A strict update envelope: dotted record paths to value-or-sentinel
///
/// Paths are record-rooted, e.g. `"tree_description.dbh_in"`. The map is
/// ordered so merge application is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateEnvelope {
    updates: BTreeMap<String, FieldValue>,
}

impl UpdateEnvelope {
    /// An empty envelope (merging it yields a single "Not Found" row)
    pub fn new() -> UpdateEnvelope {
        UpdateEnvelope::default()
    }

    /// Insert one path/value pair
    pub fn insert(&mut self, path: impl Into<String>, value: FieldValue) {
        self.updates.insert(path.into(), value);
    }

    /// Builder-style insert
    pub fn with(mut self, path: impl Into<String>, value: FieldValue) -> UpdateEnvelope {
        self.insert(path, value);
        self
    }

    /// True when no fields are present at all
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Iterate path/value pairs in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.updates.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Dotted paths that carry real content (non-sentinel)
    pub fn provided_paths(&self) -> Vec<String> {
        self.updates
            .iter()
            .filter(|(_, v)| v.is_provided())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Drop paths rooted in read-only context fields or in roots that are
    /// not known sections. Services occasionally surface context blocks;
    /// those writes are blocked here regardless of what the guard saw.
    pub fn sanitized(&self) -> UpdateEnvelope {
        let updates = self
            .updates
            .iter()
            .filter(|(path, _)| {
                let root = path.split('.').next().unwrap_or("");
                !CONTEXT_ROOTS.contains(&root) && crate::Section::parse(root).is_some()
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        UpdateEnvelope { updates }
    }
}

impl Serialize for UpdateEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("updates", &self.updates)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for UpdateEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            updates: BTreeMap<String, FieldValue>,
        }
        let wire = Wire::deserialize(deserializer)?;
        Ok(UpdateEnvelope { updates: wire.updates })
    }
}
