use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A boat as served by the third-party boats API.
///
/// Fields other than `id` and `name` are kept verbatim in `extra` and
/// serialized back at the top level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoatRecord {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BoatRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }

    /// Adds an opaque field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns a field by name, including `id` and `name`.
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(Value::String(self.id.clone())),
            "name" => Some(Value::String(self.name.clone())),
            other => self.extra.get(other).cloned(),
        }
    }

    /// Shallow-merges `fields` onto this record.
    ///
    /// `id` is never overwritten and a non-string `name` is ignored.
    pub fn merge(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            match key.as_str() {
                "id" => {}
                "name" => {
                    if let Value::String(name) = value {
                        self.name = name.clone();
                    }
                }
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }
}
