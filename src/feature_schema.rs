//! Feature schema resolution.
//!
//! The feature artifact shipped next to a model comes in a handful of shapes:
//! a bare list of names, an object holding the list under one of several
//! well-known keys, or an object whose own keys are the feature names (for
//! example `{"age": "num", "gender": "cat"}`). Each shape is recognised by a
//! detector; detectors are tried in a fixed order and the first one that
//! claims the value produces the schema.
//!
//! For the key-mapping shape the feature order is the order the keys were
//! written in the artifact. JSON objects are parsed with insertion order
//! preserved and the names are never re-sorted, so reordering keys in the
//! artifact reorders the model input.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::errors::{ServeError, ServeResult};

/// Keys checked, in priority order, when the artifact is an object.
pub const CANDIDATE_KEYS: [&str; 5] = [
    "features",
    "feature_names",
    "columns",
    "feature_names_in",
    "feature_names_in_",
];

const EXPECTED_SHAPES: &str = "expected a list of feature names, an object with one of \
     'features', 'feature_names', 'columns', 'feature_names_in', 'feature_names_in_' \
     holding such a list, or an object whose keys are the feature names";

/// Which artifact shape produced a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaSource {
    List,
    Key(&'static str),
    MappingKeys,
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::List => write!(f, "top-level list"),
            SchemaSource::Key(key) => write!(f, "key '{key}'"),
            SchemaSource::MappingKeys => write!(f, "object keys"),
        }
    }
}

/// A detector returns `None` when the value is not its shape.
type Detector = fn(&Value) -> Option<ServeResult<(SchemaSource, Vec<String>)>>;

const DETECTORS: [Detector; 3] = [detect_list, detect_candidate_key, detect_mapping_keys];

fn detect_list(data: &Value) -> Option<ServeResult<(SchemaSource, Vec<String>)>> {
    let items = data.as_array()?;
    Some(coerce_names(items).map(|names| (SchemaSource::List, names)))
}

fn detect_candidate_key(data: &Value) -> Option<ServeResult<(SchemaSource, Vec<String>)>> {
    let map = data.as_object()?;
    CANDIDATE_KEYS.iter().find_map(|key| {
        let items = map.get(*key)?.as_array()?;
        Some(coerce_names(items).map(|names| (SchemaSource::Key(*key), names)))
    })
}

fn detect_mapping_keys(data: &Value) -> Option<ServeResult<(SchemaSource, Vec<String>)>> {
    let map = data.as_object()?;
    Some(Ok((SchemaSource::MappingKeys, map.keys().cloned().collect())))
}

fn coerce_names(items: &[Value]) -> ServeResult<Vec<String>> {
    items
        .iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(ServeError::schema_format(format!(
                "feature name at position {position} is not a scalar: {other}"
            ))),
        })
        .collect()
}

/// Canonical, ordered, duplicate-free list of feature names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema from names already in model order. An empty list is a
    /// valid, empty schema.
    pub fn new(names: Vec<String>) -> ServeResult<Self> {
        let mut seen = HashSet::with_capacity(names.len());
        let mut duplicates: Vec<&str> = Vec::new();
        for name in &names {
            if !seen.insert(name.as_str()) && !duplicates.contains(&name.as_str()) {
                duplicates.push(name.as_str());
            }
        }
        if !duplicates.is_empty() {
            return Err(ServeError::schema_format(format!(
                "duplicate feature names: {}",
                duplicates.join(", ")
            )));
        }

        Ok(Self { names })
    }

    /// Resolve a parsed feature artifact into a schema.
    pub fn resolve(data: &Value) -> ServeResult<Self> {
        Self::resolve_with_source(data).map(|(schema, _)| schema)
    }

    /// Like [`FeatureSchema::resolve`], also reporting which shape matched.
    pub fn resolve_with_source(data: &Value) -> ServeResult<(Self, SchemaSource)> {
        let (source, names) = DETECTORS
            .iter()
            .find_map(|detect| detect(data))
            .unwrap_or_else(|| Err(ServeError::schema_format(EXPECTED_SHAPES)))?;
        Ok((Self::new(names)?, source))
    }

    /// Read, parse and resolve a feature artifact from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ServeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServeError::io(format!("reading {}", path.display()), e))?;
        let data: Value = serde_json::from_str(&content)
            .map_err(|e| ServeError::serialization(format!("parsing {}", path.display()), e))?;

        let (schema, source) = Self::resolve_with_source(&data)?;
        if schema.is_empty() {
            tracing::warn!(path = %path.display(), %source, "feature schema is empty");
        }
        tracing::info!(
            path = %path.display(),
            n_features = schema.len(),
            %source,
            "feature schema resolved"
        );
        Ok(schema)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Leading names, at most `limit` of them.
    pub fn preview(&self, limit: usize) -> &[String] {
        &self.names[..self.names.len().min(limit)]
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
