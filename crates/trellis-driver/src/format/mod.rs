//! Response formatting
//!
//! A [`ResponseFormatter`] turns a raw driver payload into one of the
//! normalized shapes. The shared algorithms live in the trait's provided
//! methods; each driver supplies how a single native element maps to a
//! [`Record`] and may refine shape classification.
//!
//! Raw payloads are expected to be arrays of rows. `null` is treated as an
//! empty result.

mod gremlin;
mod neo4j;
mod orient;

pub use gremlin::GremlinFormatter;
pub use neo4j::Neo4jFormatter;
pub use orient::OrientFormatter;

use crate::error::{DriverError, DriverResult};
use crate::record::Record;
use serde_json::Value;
use trellis_core::{CommandError, NotSupportedPolicy};

/// Classification of a raw payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Set,
    Tree,
    Path,
    Scalar,
    Custom,
}

/// Result of set formatting.
///
/// A single row yields `Single`; zero or several rows yield `Many`.
#[derive(Debug, Clone, PartialEq)]
pub enum SetResult {
    Single(Record),
    Many(Vec<Record>),
}

impl SetResult {
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_single(&self) -> Option<&Record> {
        match self {
            Self::Single(record) => Some(record),
            Self::Many(_) => None,
        }
    }

    /// Flatten to a list regardless of cardinality
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Self::Single(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

/// Driver-specific response normalization.
pub trait ResponseFormatter: Send + Sync {
    /// Short name used in messages
    fn name(&self) -> &'static str;

    /// Key whose presence marks a row as a graph element
    fn identity_key(&self) -> &'static str;

    /// Key whose presence marks a row as a path
    fn path_key(&self) -> &'static str {
        "objects"
    }

    fn policy(&self) -> NotSupportedPolicy {
        NotSupportedPolicy::Fail
    }

    /// Map one native element to a record
    fn map_node(&self, node: &Value) -> DriverResult<Record>;

    /// Strip driver framing around a row. Default: the row is the element.
    fn unwrap_row<'a>(&self, row: &'a Value) -> &'a Value {
        row
    }

    /// Elements carried by one set row. Default: the unwrapped row alone.
    fn row_elements<'a>(&self, row: &'a Value) -> Vec<&'a Value> {
        vec![self.unwrap_row(row)]
    }

    /// Heuristic shape of a raw payload, judged by its first row.
    fn classify(&self, raw: &Value) -> Shape {
        classify_default(self, raw)
    }

    /// Format as a set of records
    fn to_set(&self, raw: &Value) -> DriverResult<SetResult> {
        let rows = rows_of(self, raw, Shape::Set)?;
        let mut records = rows
            .iter()
            .flat_map(|row| self.row_elements(row))
            .map(|element| self.map_node(element))
            .collect::<DriverResult<Vec<_>>>()?;

        if records.len() == 1 {
            Ok(SetResult::Single(records.remove(0)))
        } else {
            Ok(SetResult::Many(records))
        }
    }

    /// Format as a list of paths, each an ordered list of records
    fn to_path(&self, raw: &Value) -> DriverResult<Vec<Vec<Record>>> {
        let rows = rows_of(self, raw, Shape::Path)?;
        rows.iter()
            .map(|row| -> DriverResult<Vec<Record>> {
                let objects = self
                    .unwrap_row(row)
                    .get(self.path_key())
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        DriverError::formatting(format!(
                            "{} path row has no '{}' list",
                            self.name(),
                            self.path_key()
                        ))
                    })?;
                objects.iter().map(|node| self.map_node(node)).collect()
            })
            .collect()
    }

    /// Unwrap the first value of the first row. Empty payloads yield `null`.
    fn to_scalar(&self, raw: &Value) -> DriverResult<Value> {
        let rows = rows_of(self, raw, Shape::Scalar)?;
        let Some(first) = rows.first() else {
            return Ok(Value::Null);
        };
        Ok(match self.unwrap_row(first) {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
            Value::Object(map) => map.values().next().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        })
    }

    /// Tree formatting is not implemented by any built-in driver.
    ///
    /// Under a lenient policy this yields an empty list.
    fn to_tree(&self, _raw: &Value) -> DriverResult<Vec<Record>> {
        let message = format!("{} responses cannot be formatted as a tree", self.name());
        match self.policy().check(message) {
            Ok(()) => Ok(Vec::new()),
            Err(CommandError::NotSupported(msg)) => Err(DriverError::NotSupported(msg)),
            Err(err) => Err(err.into()),
        }
    }
}

/// Shape heuristic shared by all formatters
pub(crate) fn classify_default<F>(formatter: &F, raw: &Value) -> Shape
where
    F: ResponseFormatter + ?Sized,
{
    let Some(first) = raw.as_array().and_then(|rows| rows.first()) else {
        return Shape::Custom;
    };
    match formatter.unwrap_row(first) {
        Value::Object(map) if map.contains_key(formatter.identity_key()) => Shape::Set,
        Value::Object(map) if map.contains_key(formatter.path_key()) => Shape::Path,
        Value::Object(_) => Shape::Custom,
        Value::Array(items) if items.len() == 1 && is_scalar(&items[0]) => Shape::Scalar,
        Value::Array(_) => Shape::Custom,
        _ => Shape::Scalar,
    }
}

/// Rows of `raw`, checked against the `expected` shape when non-empty.
fn rows_of<'a, F>(formatter: &F, raw: &'a Value, expected: Shape) -> DriverResult<&'a [Value]>
where
    F: ResponseFormatter + ?Sized,
{
    let rows: &[Value] = match raw {
        Value::Null => &[],
        Value::Array(rows) => rows,
        _ => {
            return Err(DriverError::formatting(format!(
                "{} payload is not a list of rows",
                formatter.name()
            )))
        }
    };
    if rows.is_empty() {
        return Ok(rows);
    }

    let shape = formatter.classify(raw);
    if shape != expected {
        return Err(DriverError::formatting(format!(
            "{} payload looks like {:?}, not {:?}",
            formatter.name(),
            shape,
            expected
        )));
    }
    Ok(rows)
}

pub(crate) fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Copy the entries of a property map into a record's data fields
pub(crate) fn copy_fields<'a, I>(record: &mut Record, entries: I)
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    for (key, value) in entries {
        record.insert(key.clone(), value.clone());
    }
}

/// The node as a JSON object, or a formatting error naming `driver`
pub(crate) fn expect_object<'a>(
    driver: &str,
    node: &'a Value,
) -> DriverResult<&'a serde_json::Map<String, Value>> {
    node.as_object().ok_or_else(|| {
        DriverError::formatting(format!("{} element is not an object: {}", driver, node))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    /// Minimal formatter exercising only the provided methods
    struct PlainFormatter;

    impl ResponseFormatter for PlainFormatter {
        fn name(&self) -> &'static str {
            "plain"
        }

        fn identity_key(&self) -> &'static str {
            "id"
        }

        fn map_node(&self, node: &Value) -> DriverResult<Record> {
            let map = expect_object(self.name(), node)?;
            let mut record = Record::new(map["id"].clone(), None, "vertex");
            copy_fields(&mut record, map.iter());
            Ok(record)
        }
    }

    #[test_case(json!([{"id": 1}]), Shape::Set ; "element row")]
    #[test_case(json!([{"objects": []}]), Shape::Path ; "path row")]
    #[test_case(json!([[10]]), Shape::Scalar ; "single value row")]
    #[test_case(json!([true]), Shape::Scalar ; "bare scalar row")]
    #[test_case(json!([[1, 2]]), Shape::Custom ; "multi value row")]
    #[test_case(json!([{"x": 1}]), Shape::Custom ; "unknown mapping")]
    #[test_case(json!([]), Shape::Custom ; "empty")]
    #[test_case(json!({"id": 1}), Shape::Custom ; "not a list")]
    fn test_classify(raw: Value, expected: Shape) {
        assert_eq!(PlainFormatter.classify(&raw), expected);
    }

    #[test]
    fn test_set_cardinality() {
        let single = PlainFormatter.to_set(&json!([{"id": 1}])).unwrap();
        assert!(matches!(single, SetResult::Single(_)));

        let many = PlainFormatter.to_set(&json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(many.len(), 2);
        assert!(many.as_single().is_none());

        let empty = PlainFormatter.to_set(&json!([])).unwrap();
        assert_eq!(empty, SetResult::Many(Vec::new()));
        assert!(PlainFormatter.to_set(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_scalar_unwraps_first_value() {
        assert_eq!(PlainFormatter.to_scalar(&json!([[10]])).unwrap(), json!(10));
        assert_eq!(PlainFormatter.to_scalar(&json!([true])).unwrap(), json!(true));
        assert_eq!(PlainFormatter.to_scalar(&json!([])).unwrap(), Value::Null);
    }

    #[test]
    fn test_shape_mismatch_is_formatting_error() {
        let err = PlainFormatter.to_scalar(&json!([{"id": 1}])).unwrap_err();
        assert!(matches!(err, DriverError::Formatting(_)));

        let err = PlainFormatter.to_set(&json!([[10]])).unwrap_err();
        assert!(matches!(err, DriverError::Formatting(_)));

        let err = PlainFormatter.to_set(&json!("nope")).unwrap_err();
        assert!(matches!(err, DriverError::Formatting(_)));
    }

    #[test]
    fn test_path_maps_each_object() {
        let raw = json!([{"objects": [{"id": 1}, {"id": 2}, {"id": 3}]}]);
        let paths = PlainFormatter.to_path(&raw).unwrap();

        assert_eq!(paths.len(), 1);
        let ids: Vec<&Value> = paths[0].iter().map(Record::id).collect();
        assert_eq!(ids, [&json!(1), &json!(2), &json!(3)]);
    }

    #[test]
    fn test_tree_fails_by_default() {
        let err = PlainFormatter.to_tree(&json!([])).unwrap_err();
        assert!(err.is_not_supported());
    }
}
