//! Cypher processor.
//!
//! Emits:
//! - `CREATE <traversals> SET <assignments> RETURN <vars>`
//! - `MATCH <traversal> [WHERE ..] RETURN .. [ORDER BY ..] [LIMIT n]`
//! - `MATCH <traversal> [WHERE ..] SET .. RETURN .. [ORDER BY ..] [LIMIT n]`
//! - `MATCH <traversal> [WHERE ..] [ORDER BY ..] [LIMIT n] DELETE <vars>`

use crate::bag::{Bag, ElementId, Returning, Subject, Target, WhereClause};
use crate::command::{Command, Dialect};
use crate::error::{CommandError, CommandResult};
use crate::ops::{CommandKind, Comparator, Conjunction, ElementKind};
use crate::policy::NotSupportedPolicy;
use crate::processor::common::{alias_field, cast_value, identifier_token, Scratch};
use crate::processor::CommandProcessor;
use serde_json::{Map, Value};
use tracing::debug;

/// Keywords a generated variable must never spell. Cypher keywords are case
/// insensitive and generated variables are lowercase.
const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "asc", "ascending", "by", "call", "case", "contains", "create",
    "delete", "desc", "descending", "detach", "distinct", "do", "else", "end", "ends",
    "exists", "false", "for", "foreach", "from", "if", "in", "is", "limit", "match", "merge",
    "not", "null", "of", "on", "optional", "or", "order", "remove", "return", "set", "skip",
    "starts", "then", "to", "true", "union", "unwind", "use", "when", "where", "with", "xor",
    "yield",
];

/// Compiles bags into Cypher.
#[derive(Debug, Clone, Default)]
pub struct CypherProcessor {
    policy: NotSupportedPolicy,
}

impl CypherProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: NotSupportedPolicy) -> Self {
        Self { policy }
    }

    fn create(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        let mut traversals = Vec::with_capacity(bag.data.len());
        let mut assignments = Vec::new();

        for row in &bag.data {
            let var = scratch.vars.next_var();
            traversals.push(self.traversal(bag, &var));
            if let Some(assignment) = self.assignment(row, &var)? {
                assignments.push(assignment);
            }
        }

        scratch.script.push(format!("CREATE {}", traversals.join(", ")));
        if !assignments.is_empty() {
            scratch.script.push(format!("SET {}", assignments.join(", ")));
        }
        self.push_returning(bag, scratch);
        Ok(())
    }

    fn retrieve(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        self.push_match(bag, scratch);
        let items = self.items(&bag.projections, scratch);
        scratch.script.push(format!("RETURN {}", items));
        self.push_order_and_limit(bag, scratch);
        Ok(())
    }

    fn update(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        self.push_match(bag, scratch);

        if bag.data.len() > 1 {
            debug!(
                ignored = bag.data.len() - 1,
                "Update applies only the first data row"
            );
        }
        let var = last_var(scratch)?;

        // Without a RETURN clause, ORDER BY and LIMIT have to precede SET
        let ordered_before_set = matches!(bag.returning, Returning::Nothing)
            && (!bag.order_by.is_empty() || bag.effective_limit().is_some());
        if ordered_before_set {
            scratch
                .script
                .push(format!("WITH {}", scratch.vars.issued().join(", ")));
            self.push_order_and_limit(bag, scratch);
        }

        if let Some(row) = bag.data.first() {
            if let Some(assignment) = self.assignment(row, &var)? {
                scratch.script.push(format!("SET {}", assignment));
            }
        }

        self.push_returning(bag, scratch);
        if !ordered_before_set {
            self.push_order_and_limit(bag, scratch);
        }
        Ok(())
    }

    fn delete(&self, bag: &Bag, scratch: &mut Scratch) -> CommandResult<()> {
        self.push_match(bag, scratch);
        self.push_order_and_limit(bag, scratch);
        let items = self.items(&bag.projections, scratch);
        scratch.script.push(format!("DELETE {}", items));
        Ok(())
    }

    /// `MATCH <traversal> [WHERE <chain>]` over a freshly bound variable
    fn push_match(&self, bag: &Bag, scratch: &mut Scratch) {
        let var = scratch.vars.next_var();
        scratch
            .script
            .push(format!("MATCH {}", self.traversal(bag, &var)));

        let target = target_predicate(bag.target.as_ref(), &var);
        let chain = predicate_chain(&bag.wheres, &var);
        let predicate = match (target, chain) {
            (Some(target), Some(chain)) if has_disjunction(&bag.wheres) => {
                Some(format!("{} AND ({})", target, chain))
            }
            (Some(target), Some(chain)) => Some(format!("{} AND {}", target, chain)),
            (target, chain) => target.or(chain),
        };
        if let Some(predicate) = predicate {
            scratch.script.push(format!("WHERE {}", predicate));
        }
    }

    fn push_returning(&self, bag: &Bag, scratch: &mut Scratch) {
        let items = match &bag.returning {
            Returning::Nothing => return,
            Returning::Fields(fields) => self.items(fields, scratch),
            Returning::Bound => self.items(&bag.projections, scratch),
        };
        scratch.script.push(format!("RETURN {}", items));
    }

    fn push_order_and_limit(&self, bag: &Bag, scratch: &mut Scratch) {
        if !bag.order_by.is_empty() {
            let ordering = bag
                .order_by
                .iter()
                .map(|(field, direction)| format!("{} {}", self.item(field, scratch), direction))
                .collect::<Vec<_>>()
                .join(", ");
            scratch.script.push(format!("ORDER BY {}", ordering));
        }
        if let Some(limit) = bag.effective_limit() {
            scratch.script.push(format!("LIMIT {}", limit));
        }
    }

    fn traversal(&self, bag: &Bag, var: &str) -> String {
        let label = bag
            .target
            .as_ref()
            .and_then(Target::as_label)
            .map(|l| format!(":{}", identifier_token(l)))
            .unwrap_or_default();

        match bag.element {
            ElementKind::Vertex => format!("({}{})", var, label),
            ElementKind::Edge => format!("()-[{}{}]-()", var, label),
        }
    }

    /// `var.k = v, ...` for one data row; `None` when nothing is assignable
    fn assignment(&self, row: &Map<String, Value>, var: &str) -> CommandResult<Option<String>> {
        let mut parts = Vec::with_capacity(row.len());
        for (field, value) in row {
            if field == "id" {
                self.policy
                    .check("manual assignment of element ids is not supported")?;
                continue;
            }
            parts.push(format!("{} = {}", alias_field(field, var), cast_value(value)));
        }

        Ok((!parts.is_empty()).then(|| parts.join(", ")))
    }

    /// Explicit items, or every bound variable when `fields` is empty
    fn items(&self, fields: &[String], scratch: &Scratch) -> String {
        if fields.is_empty() {
            scratch.vars.issued().join(", ")
        } else {
            fields
                .iter()
                .map(|f| self.item(f, scratch))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    /// Bound variables pass through; other names are aliased
    fn item(&self, field: &str, scratch: &Scratch) -> String {
        if scratch.vars.issued().iter().any(|v| v == field) {
            return field.to_string();
        }
        match scratch.vars.last() {
            Some(var) => alias_field(field, var),
            None => field.to_string(),
        }
    }
}

impl CommandProcessor for CypherProcessor {
    fn dialect(&self) -> Dialect {
        Dialect::Cypher
    }

    fn process(&self, bag: &Bag) -> CommandResult<Command> {
        bag.validate()?;
        let kind = bag
            .command
            .ok_or_else(|| CommandError::validation("command must be set"))?;

        let mut scratch = Scratch::new("");
        scratch.vars.reserve(RESERVED_WORDS.iter().copied());
        match kind {
            CommandKind::Create => self.create(bag, &mut scratch)?,
            CommandKind::Retrieve => self.retrieve(bag, &mut scratch)?,
            CommandKind::Update => self.update(bag, &mut scratch)?,
            CommandKind::Delete => self.delete(bag, &mut scratch)?,
        }

        let script = scratch.script.finish();
        debug!(dialect = "cypher", command = %kind, length = script.len(), "Compiled command");
        Ok(Command::new(script, Dialect::Cypher))
    }
}

fn last_var(scratch: &Scratch) -> CommandResult<String> {
    scratch
        .vars
        .last()
        .map(str::to_string)
        .ok_or_else(|| CommandError::internal("no variable bound before use"))
}

fn target_predicate(target: Option<&Target>, var: &str) -> Option<String> {
    match target? {
        Target::Label(_) => None,
        Target::Id(id) => Some(format!("ID({}) = {}", var, cast_id(id))),
        Target::Ids(ids) => Some(format!(
            "ID({}) IN [{}]",
            var,
            ids.iter().map(cast_id).collect::<Vec<_>>().join(", ")
        )),
    }
}

fn cast_id(id: &ElementId) -> String {
    cast_value(&id.to_value())
}

fn has_disjunction(wheres: &[WhereClause]) -> bool {
    wheres
        .iter()
        .skip(1)
        .any(|c| c.conjunction == Conjunction::Or)
}

fn predicate_chain(wheres: &[WhereClause], var: &str) -> Option<String> {
    if wheres.is_empty() {
        return None;
    }

    let mut parts = Vec::with_capacity(wheres.len() * 2);
    for (i, clause) in wheres.iter().enumerate() {
        if i > 0 {
            parts.push(clause.conjunction.to_string());
        }
        parts.push(render_clause(clause, var));
    }
    Some(parts.join(" "))
}

fn render_clause(clause: &WhereClause, var: &str) -> String {
    match &clause.subject {
        Subject::ElementLabel => {
            let label = clause.value.as_str().unwrap_or_default();
            let test = format!("{}:{}", var, identifier_token(label));
            if clause.comparator == Comparator::Ne {
                format!("NOT {}", test)
            } else {
                test
            }
        }
        Subject::ElementId => compare(&format!("ID({})", var), clause.comparator, &clause.value),
        Subject::Field(field) => compare(&alias_field(field, var), clause.comparator, &clause.value),
    }
}

fn compare(lhs: &str, comparator: Comparator, value: &Value) -> String {
    match (comparator, value) {
        (Comparator::Eq, Value::Null) => format!("{} IS NULL", lhs),
        (Comparator::Ne, Value::Null) => format!("{} IS NOT NULL", lhs),
        (Comparator::NotIn, _) => format!("NOT {} IN {}", lhs, cast_value(value)),
        _ => format!("{} {} {}", lhs, operator(comparator), cast_value(value)),
    }
}

fn operator(comparator: Comparator) -> &'static str {
    match comparator {
        Comparator::Eq => "=",
        Comparator::Ne => "<>",
        Comparator::Lt => "<",
        Comparator::Le => "<=",
        Comparator::Gt => ">",
        Comparator::Ge => ">=",
        Comparator::In | Comparator::NotIn => "IN",
    }
}
