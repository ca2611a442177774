use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub description: String,
}

/// The JSON object extracted from an LLM answer.
///
/// Kept as the parsed object, keys in the order the LLM wrote them, so it
/// is written back as received; the accessors give a typed view over the
/// contract keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementsSpec {
    object: Map<String, Value>,
}

impl RequirementsSpec {
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self { object }
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    pub fn into_object(self) -> Map<String, Value> {
        self.object
    }

    /// Endpoints in the order the LLM listed them. Entries that are not
    /// `{path, method, ...}` objects are skipped.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let Some(list) = self.object.get("endpoints").and_then(Value::as_array) else {
            return Vec::new();
        };

        list.iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value(value.clone()) {
                Ok(endpoint) => Some(endpoint),
                Err(e) => {
                    warn!("Skipping endpoint {}: {}", idx, e);
                    None
                }
            })
            .collect()
    }

    pub fn logic(&self) -> Option<&Value> {
        self.object.get("logic")
    }

    pub fn schema(&self) -> Option<&Value> {
        self.object.get("schema")
    }

    pub fn auth(&self) -> Option<&Value> {
        self.object.get("auth")
    }
}
