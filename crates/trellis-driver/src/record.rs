//! Normalized records produced by response formatters

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Keys owned by the record itself. Data fields can never claim them.
pub const PROTECTED_KEYS: [&str; 3] = ["id", "label", "meta"];

/// One graph element in driver-independent form.
///
/// Serializes as a flat mapping: `id`, `label`, `meta`, then the data fields
/// in the order they were inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: Value,
    label: Value,
    meta: Map<String, Value>,
    fields: Map<String, Value>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            id: Value::Null,
            label: Value::Null,
            meta: Map::new(),
            fields: Map::new(),
        }
    }
}

impl Record {
    /// Create a record with its identity already set
    pub fn new(id: impl Into<Value>, label: Option<&str>, element_type: &str) -> Self {
        let mut record = Self::default();
        record.set_identity(id.into(), label, element_type);
        record
    }

    pub fn is_protected(key: &str) -> bool {
        PROTECTED_KEYS.contains(&key)
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_str()
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up `id`, `label` or a data field. `meta` is reached through [`Record::meta`].
    pub fn get(&self, key: &str) -> Option<&Value> {
        match key {
            "id" => Some(&self.id),
            "label" => Some(&self.label),
            "meta" => None,
            _ => self.fields.get(key),
        }
    }

    /// Insert a data field. Returns `false` and leaves the record untouched
    /// when `key` is protected.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if Self::is_protected(&key) {
            return false;
        }
        self.fields.insert(key, value);
        true
    }

    /// Set the protected identity keys and mirror them into `meta`.
    pub fn set_identity(&mut self, id: Value, label: Option<&str>, element_type: &str) {
        let label = label.map_or(Value::Null, Value::from);
        self.meta.insert("id".to_string(), id.clone());
        self.meta.insert("label".to_string(), label.clone());
        self.meta
            .insert("type".to_string(), Value::from(element_type));
        self.id = id;
        self.label = label;
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: Value) {
        self.meta.insert(key.into(), value);
    }

    /// Flatten into a JSON object
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 3);
        map.insert("id".to_string(), self.id.clone());
        map.insert("label".to_string(), self.label.clone());
        map.insert("meta".to_string(), Value::Object(self.meta.clone()));
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("label", &self.label)?;
        map.serialize_entry("meta", &self.meta)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
