use super::{copy_fields, expect_object, is_scalar, ResponseFormatter, Shape};
use crate::error::{DriverError, DriverResult};
use crate::record::Record;
use serde_json::Value;
use trellis_core::NotSupportedPolicy;

/// Formatter for Neo4j result rows.
///
/// Nodes carry `id`, `labels` and `properties`; relationships carry `id`,
/// `type`, `start`, `end` and `properties`. Rows may arrive keyed by column
/// name, so a single-column row is unwrapped before inspection. A row whose
/// columns all hold elements (`RETURN a, b`) yields one record per column.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neo4jFormatter {
    policy: NotSupportedPolicy,
}

impl Neo4jFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: NotSupportedPolicy) -> Self {
        Self { policy }
    }

    fn is_element(&self, value: &Value) -> bool {
        match value.as_object() {
            Some(map) => {
                map.contains_key(self.identity_key())
                    && (map.contains_key("labels") || map.contains_key("type"))
            }
            None => false,
        }
    }

    /// Columns of a row that binds several elements, or `None`
    fn element_columns<'a>(&self, row: &'a Value) -> Option<Vec<&'a Value>> {
        let columns = row.as_object()?;
        if self.is_element(row) || columns.is_empty() {
            return None;
        }
        columns
            .values()
            .all(|value| self.is_element(value))
            .then(|| columns.values().collect())
    }
}

impl ResponseFormatter for Neo4jFormatter {
    fn name(&self) -> &'static str {
        "neo4j"
    }

    fn identity_key(&self) -> &'static str {
        "id"
    }

    fn path_key(&self) -> &'static str {
        "nodes"
    }

    fn policy(&self) -> NotSupportedPolicy {
        self.policy
    }

    fn unwrap_row<'a>(&self, row: &'a Value) -> &'a Value {
        match row.as_object() {
            Some(columns)
                if columns.len() == 1
                    && !columns.contains_key(self.identity_key())
                    && !columns.contains_key(self.path_key()) =>
            {
                columns.values().next().unwrap_or(row)
            }
            _ => row,
        }
    }

    fn row_elements<'a>(&self, row: &'a Value) -> Vec<&'a Value> {
        self.element_columns(row)
            .unwrap_or_else(|| vec![self.unwrap_row(row)])
    }

    fn classify(&self, raw: &Value) -> Shape {
        let first = raw.as_array().and_then(|rows| rows.first());
        if first.is_some_and(|row| self.element_columns(row).is_some()) {
            return Shape::Set;
        }
        match first.map(|row| self.unwrap_row(row)) {
            // `RETURN count(a)` arrives as {"count(a)": 10}, unwrapped to 10
            Some(value) if is_scalar(value) => Shape::Scalar,
            Some(value) if self.is_element(value) => Shape::Set,
            Some(Value::Object(map)) if map.contains_key(self.path_key()) => Shape::Path,
            Some(Value::Object(_)) => Shape::Custom,
            _ => super::classify_default(self, raw),
        }
    }

    fn map_node(&self, node: &Value) -> DriverResult<Record> {
        let map = expect_object(self.name(), node)?;
        let id = map
            .get("id")
            .cloned()
            .ok_or_else(|| DriverError::formatting("neo4j element has no id"))?;

        let mut record = match (map.get("labels"), map.get("type")) {
            (Some(Value::Array(labels)), _) => {
                let label = labels.first().and_then(Value::as_str);
                let mut record = Record::new(id, label, "vertex");
                record.set_meta("labels", Value::Array(labels.clone()));
                record
            }
            (_, Some(Value::String(kind))) => {
                let mut record = Record::new(id, Some(kind.as_str()), "edge");
                for end in ["start", "end"] {
                    if let Some(value) = map.get(end) {
                        record.set_meta(end, value.clone());
                    }
                }
                record
            }
            _ => {
                return Err(DriverError::formatting(
                    "neo4j element is neither a node nor a relationship",
                ))
            }
        };

        if let Some(properties) = map.get("properties").and_then(Value::as_object) {
            copy_fields(&mut record, properties.iter());
        }
        Ok(record)
    }
}
