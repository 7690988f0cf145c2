//! Data models for table storage operations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Property names the service adds to every entity it returns
const SYSTEM_PROPERTIES: [&str; 1] = ["Timestamp"];

/// A table row: its two-part key plus named property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntity {
    #[serde(rename = "PartitionKey")]
    pub partition_key: String,
    #[serde(rename = "RowKey")]
    pub row_key: String,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl TableEntity {
    pub fn new<P: Into<String>, R: Into<String>>(partition_key: P, row_key: R) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Property rendered for console output; strings print without quotes
    pub fn property_display(&self, name: &str) -> String {
        match self.properties.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Drop OData annotations and service-maintained properties
    pub fn without_system_properties(mut self) -> Self {
        self.properties.retain(|name, _| {
            !name.starts_with("odata.")
                && !name.contains("@odata.")
                && !SYSTEM_PROPERTIES.contains(&name.as_str())
        });
        self
    }
}
