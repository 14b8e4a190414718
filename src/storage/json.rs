use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::signal::{FlatStore, ScalarValue};
use crate::storage::StorageError;

/// Signal store kept in a single JSON document, re-read on every request.
///
/// Nested objects and dotted keys may be mixed freely:
/// `{"Vehicle": {"Drivetrain.Transmission.Gear": 3}}` is the same signal as
/// `{"Vehicle.Drivetrain.Transmission.Gear": 3}`.
#[derive(Debug, Clone)]
pub struct JsonBackend {
    path: PathBuf,
}

impl JsonBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn load(&self) -> Result<FlatStore, StorageError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StorageError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        parse_document(&contents)
    }
}

pub fn parse_document(contents: &str) -> Result<FlatStore, StorageError> {
    let value: Value = serde_json::from_str(contents)?;
    let Value::Object(root) = value else {
        return Err(StorageError::InvalidDocument(
            "top level value is not an object".into(),
        ));
    };
    let mut store = FlatStore::new();
    flatten_object("", &root, &mut store);
    Ok(store)
}

fn flatten_object(prefix: &str, object: &Map<String, Value>, store: &mut FlatStore) {
    for (key, value) in object {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) => flatten_object(&key, nested, store),
            other => match ScalarValue::from_json(other) {
                Some(scalar) => store.insert(key, scalar),
                None => tracing::warn!(key = %key, "Skipping non-scalar signal value"),
            },
        }
    }
}
