//! OrientDB SQL processor.
//!
//! The SQL dialect addresses classes and record ids directly, so fields are
//! never qualified with a variable.

use crate::bag::{Bag, ElementId, Returning, Subject, Target, WhereClause};
use crate::command::{Command, Dialect};
use crate::error::{CommandError, CommandResult};
use crate::ops::{CommandKind, Comparator, ElementKind};
use crate::policy::NotSupportedPolicy;
use crate::processor::common::{cast_value, quote, Scratch};
use crate::processor::CommandProcessor;
use serde_json::{Map, Value};
use tracing::debug;

/// Compiles bags into OrientDB SQL.
#[derive(Debug, Clone, Default)]
pub struct OrientSqlProcessor {
    policy: NotSupportedPolicy,
}

impl OrientSqlProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: NotSupportedPolicy) -> Self {
        Self { policy }
    }

    fn create(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        if bag.element == ElementKind::Edge {
            return Err(CommandError::not_supported(
                "orientdb edge creation requires endpoints",
            ));
        }
        let class = bag
            .target
            .as_ref()
            .and_then(Target::as_label)
            .unwrap_or("V");

        match bag.data.as_slice() {
            [row] => {
                scratch.script.push(format!("CREATE VERTEX {}", class));
                if let Some(assignment) = self.assignment(row)? {
                    scratch.script.push(format!("SET {}", assignment));
                }
            }
            rows => {
                let mut documents = Vec::with_capacity(rows.len());
                for row in rows {
                    documents.push(self.document(row)?);
                }
                scratch.script.push(format!(
                    "INSERT INTO {} CONTENT [{}]",
                    class,
                    documents.join(", ")
                ));
            }
        }
        Ok(())
    }

    fn retrieve(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        if bag.projections.is_empty() {
            scratch.script.push("SELECT");
        } else {
            scratch
                .script
                .push(format!("SELECT {}", bag.projections.join(", ")));
        }
        scratch.script.push(format!("FROM {}", from_target(bag)));
        push_where(&bag.wheres, scratch);

        if !bag.order_by.is_empty() {
            let ordering = bag
                .order_by
                .iter()
                .map(|(field, direction)| format!("{} {}", field, direction))
                .collect::<Vec<_>>()
                .join(", ");
            scratch.script.push(format!("ORDER BY {}", ordering));
        }
        push_limit(bag, scratch);
        Ok(())
    }

    fn update(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        self.check_no_ordering(bag, "update")?;
        if bag.data.len() > 1 {
            debug!(
                ignored = bag.data.len() - 1,
                "Update applies only the first data row"
            );
        }

        let assignment = match bag.data.first() {
            Some(row) => self.assignment(row)?,
            None => None,
        };
        let Some(assignment) = assignment else {
            // Nothing left to write: select the matched records instead
            self.policy.check("update has no assignable fields")?;
            return self.retrieve(bag, scratch);
        };

        scratch.script.push(format!("UPDATE {}", from_target(bag)));
        scratch.script.push(format!("SET {}", assignment));

        let returned = match &bag.returning {
            Returning::Nothing => None,
            Returning::Fields(fields) => Some(fields.join(", ")),
            Returning::Bound if bag.projections.is_empty() => Some("@this".to_string()),
            Returning::Bound => Some(bag.projections.join(", ")),
        };
        if let Some(returned) = returned {
            scratch.script.push(format!("RETURN AFTER {}", returned));
        }

        push_where(&bag.wheres, scratch);
        push_limit(bag, scratch);
        Ok(())
    }

    fn delete(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        self.check_no_ordering(bag, "delete")?;
        let kind = match bag.element {
            ElementKind::Vertex => "VERTEX",
            ElementKind::Edge => "EDGE",
        };
        scratch
            .script
            .push(format!("DELETE {} {}", kind, from_target(bag)));
        push_where(&bag.wheres, scratch);
        push_limit(bag, scratch);
        Ok(())
    }

    fn check_no_ordering(&self, bag: &Bag, command: &str) -> CommandResult<()> {
        if bag.order_by.is_empty() {
            return Ok(());
        }
        self.policy
            .check(format!("ORDER BY is not supported by {}", command))
    }

    fn assignment(&self, row: &Map<String, Value>) -> CommandResult<Option<String>> {
        let mut parts = Vec::with_capacity(row.len());
        for (field, value) in self.writable_fields(row)? {
            parts.push(format!("{} = {}", field, cast_value(value)));
        }
        Ok((!parts.is_empty()).then(|| parts.join(", ")))
    }

    /// JSON document for `INSERT .. CONTENT`
    fn document(&self, row: &Map<String, Value>) -> CommandResult<String> {
        let content: Map<String, Value> = self
            .writable_fields(row)?
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::to_string(&content)
            .map_err(|e| CommandError::internal(format!("failed to encode document: {}", e)))
    }

    /// Fields of `row` minus record ids, which the server assigns
    fn writable_fields<'a>(
        &self,
        row: &'a Map<String, Value>,
    ) -> CommandResult<Vec<(&'a String, &'a Value)>> {
        let mut fields = Vec::with_capacity(row.len());
        for (field, value) in row {
            if field == "id" || field == "@rid" {
                self.policy
                    .check("manual assignment of record ids is not supported")?;
                continue;
            }
            fields.push((field, value));
        }
        Ok(fields)
    }
}

impl CommandProcessor for OrientSqlProcessor {
    fn dialect(&self) -> Dialect {
        Dialect::OrientSql
    }

    fn process(&self, bag: &Bag) -> CommandResult<Command> {
        bag.validate()?;
        let kind = bag
            .command
            .ok_or_else(|| CommandError::validation("command must be set"))?;

        let mut scratch = Scratch::new("");
        match kind {
            CommandKind::Create => self.create(bag, &mut scratch)?,
            CommandKind::Retrieve => self.retrieve(bag, &mut scratch)?,
            CommandKind::Update => self.update(bag, &mut scratch)?,
            CommandKind::Delete => self.delete(bag, &mut scratch)?,
        }

        let script = scratch.script.finish();
        debug!(
            dialect = "orientdb-sql",
            command = %kind,
            length = script.len(),
            "Compiled command"
        );
        Ok(Command::new(script, Dialect::OrientSql))
    }
}

fn from_target(bag: &Bag) -> String {
    match &bag.target {
        Some(Target::Label(class)) => class.clone(),
        Some(Target::Id(id)) => rid(id),
        Some(Target::Ids(ids)) => format!(
            "[{}]",
            ids.iter().map(rid).collect::<Vec<_>>().join(", ")
        ),
        None => match bag.element {
            ElementKind::Vertex => "V".to_string(),
            ElementKind::Edge => "E".to_string(),
        },
    }
}

fn rid(id: &ElementId) -> String {
    id.to_string()
}

/// Record ids (`#12:0`) are literals in OrientDB SQL and stay unquoted
fn rid_literal(value: &Value) -> String {
    match value {
        Value::String(s) if is_rid(s) => s.clone(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(rid_literal).collect::<Vec<_>>().join(", ")
        ),
        other => cast_value(other),
    }
}

fn is_rid(s: &str) -> bool {
    s.strip_prefix('#')
        .and_then(|rest| rest.split_once(':'))
        .is_some_and(|(cluster, position)| {
            !cluster.is_empty()
                && !position.is_empty()
                && cluster.trim_start_matches('-').chars().all(|c| c.is_ascii_digit())
                && position.chars().all(|c| c.is_ascii_digit())
        })
}

fn push_where(wheres: &[WhereClause], scratch: &mut Scratch) {
    if wheres.is_empty() {
        return;
    }

    let mut parts = Vec::with_capacity(wheres.len() * 2);
    for (i, clause) in wheres.iter().enumerate() {
        if i > 0 {
            parts.push(clause.conjunction.to_string());
        }
        parts.push(render_clause(clause));
    }
    scratch.script.push(format!("WHERE {}", parts.join(" ")));
}

fn render_clause(clause: &WhereClause) -> String {
    match &clause.subject {
        Subject::ElementId => compare(
            "@rid",
            clause.comparator,
            rid_literal(&clause.value),
            &clause.value,
        ),
        Subject::ElementLabel => {
            let label = clause.value.as_str().unwrap_or_default();
            compare("@class", clause.comparator, quote(label), &clause.value)
        }
        Subject::Field(field) => {
            compare(field, clause.comparator, cast_value(&clause.value), &clause.value)
        }
    }
}

fn compare(lhs: &str, comparator: Comparator, rhs: String, value: &Value) -> String {
    let op = match (comparator, value) {
        (Comparator::Eq, Value::Null) => return format!("{} IS NULL", lhs),
        (Comparator::Ne, Value::Null) => return format!("{} IS NOT NULL", lhs),
        (Comparator::NotIn, _) => return format!("NOT ({} IN {})", lhs, rhs),
        (Comparator::Eq, _) => "=",
        (Comparator::Ne, _) => "<>",
        (Comparator::Lt, _) => "<",
        (Comparator::Le, _) => "<=",
        (Comparator::Gt, _) => ">",
        (Comparator::Ge, _) => ">=",
        (Comparator::In, _) => "IN",
    };
    format!("{} {} {}", lhs, op, rhs)
}

fn push_limit(bag: &Bag, scratch: &mut Scratch) {
    if let Some(limit) = bag.effective_limit() {
        scratch.script.push(format!("LIMIT {}", limit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Direction;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn compile(bag: &Bag) -> String {
        OrientSqlProcessor::new().process(bag).unwrap().into_script()
    }

    #[test]
    fn test_select_by_class() {
        let bag = Bag::retrieve()
            .with_target(Target::label("person"))
            .where_field("name", Comparator::Eq, "Ada")
            .order("name", Direction::Asc)
            .with_limit(5);

        assert_eq!(
            compile(&bag),
            "SELECT FROM person WHERE name = 'Ada' ORDER BY name ASC LIMIT 5"
        );
    }

    #[test]
    fn test_select_projection_by_rid() {
        let bag = Bag::retrieve()
            .with_target(Target::id("#12:0"))
            .project("name")
            .project("age");

        assert_eq!(compile(&bag), "SELECT name, age FROM #12:0");
    }

    #[test]
    fn test_element_markers() {
        let bag = Bag::retrieve()
            .where_label("person")
            .where_id(Comparator::In, json!(["#12:0", "#12:1"]));

        assert_eq!(
            compile(&bag),
            "SELECT FROM V WHERE @class = 'person' AND @rid IN [#12:0, #12:1]"
        );
    }

    #[test]
    fn test_null_and_not_in() {
        let bag = Bag::retrieve()
            .with_target(Target::label("person"))
            .where_field("email", Comparator::Ne, Value::Null)
            .or_where_field("tag", Comparator::NotIn, json!(["x"]));

        assert_eq!(
            compile(&bag),
            "SELECT FROM person WHERE email IS NOT NULL OR NOT (tag IN ['x'])"
        );
    }

    #[test]
    fn test_create_single_vertex() {
        let bag = Bag::create("person").with_data(row(json!({"name": "Ada", "age": 36})));
        assert_eq!(
            compile(&bag),
            "CREATE VERTEX person SET name = 'Ada', age = 36"
        );
    }

    #[test]
    fn test_create_multiple_vertices() {
        let bag = Bag::create("person")
            .with_data(row(json!({"name": "Ada"})))
            .with_data(row(json!({"name": "Grace", "age": 45})));

        assert_eq!(
            compile(&bag),
            r#"INSERT INTO person CONTENT [{"name":"Ada"}, {"name":"Grace","age":45}]"#
        );
    }

    #[test]
    fn test_manual_rid_assignment() {
        let bag = Bag::create("person").with_data(row(json!({"@rid": "#1:1", "name": "Ada"})));
        assert!(OrientSqlProcessor::new().process(&bag).unwrap_err().is_not_supported());

        let command = OrientSqlProcessor::with_policy(NotSupportedPolicy::Ignore)
            .process(&bag)
            .unwrap();
        assert_eq!(command.script(), "CREATE VERTEX person SET name = 'Ada'");
    }

    #[test]
    fn test_create_edge_not_supported() {
        let bag = Bag::create("knows")
            .with_element(ElementKind::Edge)
            .with_data(row(json!({"since": 2020})));
        assert!(OrientSqlProcessor::new().process(&bag).unwrap_err().is_not_supported());
    }

    #[test]
    fn test_update_applies_only_first_row() {
        let bag = Bag::update()
            .with_target(Target::id("#12:0"))
            .with_data(row(json!({"name": "X"})))
            .with_data(row(json!({"name": "Y"})));

        assert_eq!(
            compile(&bag),
            "UPDATE #12:0 SET name = 'X' RETURN AFTER @this"
        );
    }

    #[test]
    fn test_update_with_where_and_limit() {
        let bag = Bag::update()
            .with_target(Target::label("person"))
            .with_data(row(json!({"minor": true})))
            .where_field("age", Comparator::Lt, 18)
            .with_returning(Returning::Nothing)
            .with_limit(10);

        assert_eq!(
            compile(&bag),
            "UPDATE person SET minor = true WHERE age < 18 LIMIT 10"
        );
    }

    #[test]
    fn test_update_of_only_ids_goes_through_policy() {
        let bag = Bag::update()
            .with_target(Target::id("#1:1"))
            .with_data(row(json!({"id": "#1:2"})));

        assert!(OrientSqlProcessor::new().process(&bag).unwrap_err().is_not_supported());

        let command = OrientSqlProcessor::with_policy(NotSupportedPolicy::Ignore)
            .process(&bag)
            .unwrap();
        assert_eq!(command.script(), "SELECT FROM #1:1");
    }

    #[test]
    fn test_update_ordering_goes_through_policy() {
        let bag = Bag::update()
            .with_target(Target::label("person"))
            .with_data(row(json!({"minor": true})))
            .order("age", Direction::Asc);

        assert!(OrientSqlProcessor::new().process(&bag).unwrap_err().is_not_supported());

        let command = OrientSqlProcessor::with_policy(NotSupportedPolicy::Ignore)
            .process(&bag)
            .unwrap();
        assert_eq!(
            command.script(),
            "UPDATE person SET minor = true RETURN AFTER @this"
        );
    }

    #[test]
    fn test_delete() {
        let bag = Bag::delete()
            .with_target(Target::label("person"))
            .where_field("age", Comparator::Lt, 18)
            .with_limit(3);
        assert_eq!(compile(&bag), "DELETE VERTEX person WHERE age < 18 LIMIT 3");

        let bag = Bag::delete()
            .with_element(ElementKind::Edge)
            .with_target(Target::ids(["#9:1", "#9:2"]));
        assert_eq!(compile(&bag), "DELETE EDGE [#9:1, #9:2]");
    }

    #[test]
    fn test_is_rid() {
        assert!(is_rid("#12:0"));
        assert!(!is_rid("#-1:-1"));
        assert!(!is_rid("12:0"));
        assert!(!is_rid("#12"));
        assert!(!is_rid("#a:1"));
    }
}
