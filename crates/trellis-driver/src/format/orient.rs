use super::{expect_object, ResponseFormatter};
use crate::error::{DriverError, DriverResult};
use crate::record::Record;
use serde_json::Value;
use trellis_core::NotSupportedPolicy;

/// Formatter for OrientDB documents.
///
/// Identity lives in `@rid` and the class in `@class`. Other `@`-prefixed
/// attributes go to `meta` under their own names; everything else is data.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrientFormatter {
    policy: NotSupportedPolicy,
}

impl OrientFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: NotSupportedPolicy) -> Self {
        Self { policy }
    }
}

impl ResponseFormatter for OrientFormatter {
    fn name(&self) -> &'static str {
        "orientdb"
    }

    fn identity_key(&self) -> &'static str {
        "@rid"
    }

    fn policy(&self) -> NotSupportedPolicy {
        self.policy
    }

    fn map_node(&self, node: &Value) -> DriverResult<Record> {
        let map = expect_object(self.name(), node)?;
        let id = map
            .get("@rid")
            .cloned()
            .ok_or_else(|| DriverError::formatting("orientdb document has no @rid"))?;
        let label = map.get("@class").and_then(Value::as_str);
        // Edge documents link their endpoints through `in` and `out`
        let element_type = if map.contains_key("in") && map.contains_key("out") {
            "edge"
        } else {
            "vertex"
        };

        let mut record = Record::new(id, label, element_type);
        for (key, value) in map {
            match key.as_str() {
                "@rid" | "@class" => {}
                attribute if attribute.starts_with('@') => {
                    record.set_meta(attribute, value.clone())
                }
                _ => {
                    record.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(record)
    }
}
