use super::{classify_default, expect_object, ResponseFormatter, Shape};
use crate::error::{DriverError, DriverResult};
use crate::record::Record;
use serde_json::Value;
use trellis_core::NotSupportedPolicy;

/// Formatter for GraphSON-style Gremlin results.
///
/// Elements carry `id`, `label`, `type` and `properties`. Vertex properties
/// are lists of `{id, value}` objects and collapse to their values; edge
/// properties are plain values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GremlinFormatter {
    policy: NotSupportedPolicy,
}

impl GremlinFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: NotSupportedPolicy) -> Self {
        Self { policy }
    }
}

impl ResponseFormatter for GremlinFormatter {
    fn name(&self) -> &'static str {
        "gremlin"
    }

    fn identity_key(&self) -> &'static str {
        "id"
    }

    fn policy(&self) -> NotSupportedPolicy {
        self.policy
    }

    fn classify(&self, raw: &Value) -> Shape {
        let first = raw.as_array().and_then(|rows| rows.first());
        match first.and_then(|row| row.get("type")).and_then(Value::as_str) {
            Some("vertex" | "edge") => Shape::Set,
            _ => classify_default(self, raw),
        }
    }

    fn map_node(&self, node: &Value) -> DriverResult<Record> {
        let map = expect_object(self.name(), node)?;
        let id = map
            .get("id")
            .cloned()
            .ok_or_else(|| DriverError::formatting("gremlin element has no id"))?;
        let label = map.get("label").and_then(Value::as_str);
        let element_type = map.get("type").and_then(Value::as_str).unwrap_or("vertex");

        let mut record = Record::new(id, label, element_type);
        if element_type == "edge" {
            for end in ["inV", "outV", "inVLabel", "outVLabel"] {
                if let Some(value) = map.get(end) {
                    record.set_meta(end, value.clone());
                }
            }
        }

        if let Some(properties) = map.get("properties").and_then(Value::as_object) {
            for (key, value) in properties {
                record.insert(key.clone(), property_value(value));
            }
        }
        Ok(record)
    }
}

/// Collapse a GraphSON property into its plain value.
///
/// A single-entry property list yields the bare value, a multi-entry list
/// yields a list of values.
fn property_value(value: &Value) -> Value {
    match value {
        Value::Array(entries) => {
            let mut values: Vec<Value> = entries.iter().map(entry_value).collect();
            if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            }
        }
        other => entry_value(other),
    }
}

fn entry_value(entry: &Value) -> Value {
    entry.get("value").cloned().unwrap_or_else(|| entry.clone())
}
