//! Gremlin processor.
//!
//! Emits Groovy-flavoured traversal scripts rooted at `g`. Where-chains
//! become `has` steps; a chain containing `OR` becomes an `or(..)` step with
//! one anonymous traversal per AND-group.

use crate::bag::{Bag, ElementId, Returning, Subject, Target, WhereClause};
use crate::command::{Command, Dialect};
use crate::error::{CommandError, CommandResult};
use crate::ops::{CommandKind, Comparator, Conjunction, Direction, ElementKind};
use crate::policy::NotSupportedPolicy;
use crate::processor::common::{quote, Scratch};
use crate::processor::CommandProcessor;
use serde_json::{Map, Value};
use tracing::debug;

/// Compiles bags into Gremlin traversals.
#[derive(Debug, Clone, Default)]
pub struct GremlinProcessor {
    policy: NotSupportedPolicy,
}

impl GremlinProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: NotSupportedPolicy) -> Self {
        Self { policy }
    }

    fn create(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        if bag.element == ElementKind::Edge {
            return Err(CommandError::not_supported(
                "gremlin edge creation requires endpoints",
            ));
        }

        let label = bag
            .target
            .as_ref()
            .and_then(Target::as_label)
            .map(quote)
            .unwrap_or_default();
        let multi = bag.data.len() > 1;

        let mut traversal = String::from("g");
        for row in &bag.data {
            let var = scratch.vars.next_var();
            traversal.push_str(&format!(".addV({})", label));
            traversal.push_str(&self.properties(row, true)?);
            if multi {
                traversal.push_str(&format!(".as({})", quote(&var)));
            }
        }
        if multi {
            let labels = scratch
                .vars
                .issued()
                .iter()
                .map(|v| quote(v))
                .collect::<Vec<_>>()
                .join(", ");
            traversal.push_str(&format!(".select({})", labels));
        }
        traversal.push_str(&returning_suffix(bag, multi));

        scratch.script.push(traversal);
        Ok(())
    }

    fn retrieve(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        let mut traversal = self.filtered_source(bag);
        if !bag.projections.is_empty() {
            traversal.push_str(&value_map(&bag.projections));
        }
        scratch.script.push(traversal);
        Ok(())
    }

    fn update(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        if bag.data.len() > 1 {
            debug!(
                ignored = bag.data.len() - 1,
                "Update applies only the first data row"
            );
        }

        let mut traversal = self.filtered_source(bag);
        if let Some(row) = bag.data.first() {
            traversal.push_str(&self.properties(row, false)?);
        }
        traversal.push_str(&returning_suffix(bag, false));
        scratch.script.push(traversal);
        Ok(())
    }

    fn delete(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        let mut traversal = self.filtered_source(bag);
        traversal.push_str(".drop()");
        scratch.script.push(traversal);
        Ok(())
    }

    /// Source step, where-chain, ordering and limit
    fn filtered_source(&self, bag: &Bag) -> String {
        let mut traversal = source(bag);
        traversal.push_str(&where_steps(&bag.wheres));
        traversal.push_str(&order_steps(&bag.order_by));
        if let Some(limit) = bag.effective_limit() {
            traversal.push_str(&format!(".limit({})", limit));
        }
        traversal
    }

    /// `.property('k', v)` steps for one row.
    ///
    /// `id` maps to `T.id` on creation; ids of existing elements are
    /// immutable, so updating one goes through the policy.
    fn properties(&self, row: &Map<String, Value>, creating: bool) -> CommandResult<String> {
        let mut steps = String::new();
        for (field, value) in row {
            if field == "id" {
                if creating {
                    steps.push_str(&format!(".property(T.id, {})", literal(value)));
                } else {
                    self.policy
                        .check("element ids cannot be changed by an update")?;
                }
                continue;
            }
            steps.push_str(&format!(
                ".property({}, {})",
                quote(property_key(field)),
                literal(value)
            ));
        }
        Ok(steps)
    }
}

impl CommandProcessor for GremlinProcessor {
    fn dialect(&self) -> Dialect {
        Dialect::Gremlin
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
        debug!(dialect = "gremlin", command = %kind, length = script.len(), "Compiled command");
        Ok(Command::new(script, Dialect::Gremlin))
    }
}

fn source(bag: &Bag) -> String {
    let step = match bag.element {
        ElementKind::Vertex => "V",
        ElementKind::Edge => "E",
    };

    match &bag.target {
        Some(Target::Id(id)) => format!("g.{}({})", step, id_literal(id)),
        Some(Target::Ids(ids)) => format!(
            "g.{}({})",
            step,
            ids.iter().map(id_literal).collect::<Vec<_>>().join(", ")
        ),
        Some(Target::Label(label)) => format!("g.{}().hasLabel({})", step, quote(label)),
        None => format!("g.{}()", step),
    }
}

fn id_literal(id: &ElementId) -> String {
    literal(&id.to_value())
}

/// Split the chain at each `OR` into groups of AND-ed clauses
fn where_steps(wheres: &[WhereClause]) -> String {
    let mut groups: Vec<Vec<&WhereClause>> = Vec::new();
    for (i, clause) in wheres.iter().enumerate() {
        if i == 0 || clause.conjunction == Conjunction::Or {
            groups.push(Vec::new());
        }
        if let Some(group) = groups.last_mut() {
            group.push(clause);
        }
    }

    match groups.len() {
        0 => String::new(),
        1 => groups[0].iter().map(|c| format!(".{}", step(c))).collect(),
        _ => {
            let branches = groups
                .iter()
                .map(|group| {
                    let steps: String = group.iter().map(|c| format!(".{}", step(c))).collect();
                    format!("__{}", steps)
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!(".or({})", branches)
        }
    }
}

fn step(clause: &WhereClause) -> String {
    match &clause.subject {
        Subject::Field(field) => {
            let key = quote(property_key(field));
            match (clause.comparator, &clause.value) {
                (Comparator::Eq, Value::Null) => format!("hasNot({})", key),
                (Comparator::Ne, Value::Null) => format!("has({})", key),
                (comparator, value) => format!("has({}, {})", key, predicate(comparator, value)),
            }
        }
        Subject::ElementLabel => format!("hasLabel({})", predicate(clause.comparator, &clause.value)),
        Subject::ElementId => format!("hasId({})", predicate(clause.comparator, &clause.value)),
    }
}

fn predicate(comparator: Comparator, value: &Value) -> String {
    let name = match comparator {
        Comparator::Eq => return literal(value),
        Comparator::Ne => "neq",
        Comparator::Lt => "lt",
        Comparator::Le => "lte",
        Comparator::Gt => "gt",
        Comparator::Ge => "gte",
        Comparator::In => "within",
        Comparator::NotIn => "without",
    };

    match value {
        Value::Array(items) if comparator.is_membership() => format!(
            "{}({})",
            name,
            items.iter().map(literal).collect::<Vec<_>>().join(", ")
        ),
        other => format!("{}({})", name, literal(other)),
    }
}

fn order_steps(order_by: &[(String, Direction)]) -> String {
    if order_by.is_empty() {
        return String::new();
    }

    let mut steps = String::from(".order()");
    for (field, direction) in order_by {
        let direction = match direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        steps.push_str(&format!(".by({}, {})", quote(property_key(field)), direction));
    }
    steps
}

fn returning_suffix(bag: &Bag, multi: bool) -> String {
    let fields = match &bag.returning {
        Returning::Nothing => return ".iterate()".to_string(),
        Returning::Fields(fields) => fields,
        Returning::Bound => &bag.projections,
    };

    match (fields.is_empty(), multi) {
        (true, _) => String::new(),
        (false, true) => format!(".by({})", value_map(fields).trim_start_matches('.')),
        (false, false) => value_map(fields),
    }
}

fn value_map(fields: &[String]) -> String {
    let keys = fields
        .iter()
        .map(|f| quote(property_key(f)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(".valueMap({})", keys)
}

/// Gremlin has no variable qualifiers; `a.name` addresses `name`
fn property_key(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

/// Gremlin literal: strings are always quoted
fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) if map.is_empty() => "[:]".to_string(),
        Value::Object(map) => format!(
            "[{}]",
            map.iter()
                .map(|(k, v)| format!("{}: {}", quote(k), literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn compile(bag: &Bag) -> String {
        GremlinProcessor::new().process(bag).unwrap().into_script()
    }

    #[test]
    fn test_retrieve_by_label_with_filters() {
        let bag = Bag::retrieve()
            .with_target(Target::label("person"))
            .where_field("name", Comparator::Eq, "Ada")
            .order("name", Direction::Asc)
            .with_limit(5);

        assert_eq!(
            compile(&bag),
            "g.V().hasLabel('person').has('name', 'Ada').order().by('name', asc).limit(5)"
        );
    }

    #[test]
    fn test_retrieve_by_ids_with_projection() {
        let bag = Bag::retrieve()
            .with_target(Target::ids([1, 2]))
            .project("name")
            .project("a.age");

        assert_eq!(compile(&bag), "g.V(1, 2).valueMap('name', 'age')");
    }

    #[test]
    fn test_string_ids_are_quoted() {
        let bag = Bag::retrieve().with_target(Target::id("#12:0"));
        assert_eq!(compile(&bag), "g.V('#12:0')");
    }

    #[test]
    fn test_edges_use_e_step() {
        let bag = Bag::retrieve()
            .with_element(ElementKind::Edge)
            .where_label("knows");
        assert_eq!(compile(&bag), "g.E().hasLabel('knows')");
    }

    #[test]
    fn test_predicates() {
        let bag = Bag::retrieve()
            .where_field("age", Comparator::Ge, 18)
            .where_field("tag", Comparator::In, json!(["x", "y"]))
            .where_field("zip", Comparator::Ne, "10115")
            .where_id(Comparator::NotIn, json!([3]))
            .where_field("email", Comparator::Eq, Value::Null);

        assert_eq!(
            compile(&bag),
            "g.V().has('age', gte(18)).has('tag', within('x', 'y')).has('zip', neq('10115'))\
             .hasId(without(3)).hasNot('email')"
        );
    }

    #[test]
    fn test_disjunction_becomes_or_step() {
        let bag = Bag::retrieve()
            .where_field("name", Comparator::Eq, "Ada")
            .or_where_field("age", Comparator::Gt, 30)
            .where_field("active", Comparator::Eq, true);

        assert_eq!(
            compile(&bag),
            "g.V().or(__.has('name', 'Ada'), __.has('age', gt(30)).has('active', true))"
        );
    }

    #[test]
    fn test_create_single_vertex() {
        let bag = Bag::create("person").with_data(row(json!({"name": "Ada", "age": 36})));

        assert_eq!(
            compile(&bag),
            "g.addV('person').property('name', 'Ada').property('age', 36)"
        );
    }

    #[test]
    fn test_create_multiple_vertices() {
        let bag = Bag::create("person")
            .with_data(row(json!({"name": "Ada"})))
            .with_data(row(json!({"name": "Grace"})));

        assert_eq!(
            compile(&bag),
            "g.addV('person').property('name', 'Ada').as('a')\
             .addV('person').property('name', 'Grace').as('b').select('a', 'b')"
        );
    }

    #[test]
    fn test_create_with_explicit_id_and_no_return() {
        let bag = Bag::create("person")
            .with_data(row(json!({"id": 9, "name": "Ada"})))
            .with_returning(Returning::Nothing);

        assert_eq!(
            compile(&bag),
            "g.addV('person').property(T.id, 9).property('name', 'Ada').iterate()"
        );
    }

    #[test]
    fn test_create_multiple_with_projection() {
        let bag = Bag::create("person")
            .with_data(row(json!({"name": "Ada"})))
            .with_data(row(json!({"name": "Grace"})))
            .project("name");

        assert_eq!(
            compile(&bag),
            "g.addV('person').property('name', 'Ada').as('a')\
             .addV('person').property('name', 'Grace').as('b')\
             .select('a', 'b').by(valueMap('name'))"
        );
    }

    #[test]
    fn test_create_edge_not_supported() {
        let bag = Bag::create("knows")
            .with_element(ElementKind::Edge)
            .with_data(row(json!({"since": 2020})));

        let err = GremlinProcessor::new().process(&bag).unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn test_update_applies_only_first_row() {
        let bag = Bag::update()
            .with_target(Target::id(7))
            .with_data(row(json!({"name": "X"})))
            .with_data(row(json!({"name": "Y"})));

        assert_eq!(compile(&bag), "g.V(7).property('name', 'X')");
    }

    #[test]
    fn test_update_id_goes_through_policy() {
        let bag = Bag::update()
            .with_target(Target::id(7))
            .with_data(row(json!({"id": 8, "name": "X"})));

        assert!(GremlinProcessor::new().process(&bag).is_err());

        let command = GremlinProcessor::with_policy(NotSupportedPolicy::Ignore)
            .process(&bag)
            .unwrap();
        assert_eq!(command.script(), "g.V(7).property('name', 'X')");
    }

    #[test]
    fn test_delete() {
        let bag = Bag::delete()
            .with_target(Target::label("person"))
            .where_field("age", Comparator::Lt, 18)
            .with_limit(3);

        assert_eq!(
            compile(&bag),
            "g.V().hasLabel('person').has('age', lt(18)).limit(3).drop()"
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal(&json!("12")), "'12'");
        assert_eq!(literal(&json!({"a": 1})), "['a': 1]");
        assert_eq!(literal(&json!({})), "[:]");
    }
}
