//! The command bag: a driver-independent description of one graph operation.
//!
//! A bag is populated during intent capture, validated, and then lent to
//! exactly one processor per `process` call. Processors never mutate it.

use crate::error::{CommandError, CommandResult};
use crate::ops::{CommandKind, Comparator, Conjunction, Direction, ElementKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identity of a stored element (numeric or string, e.g. `#12:0`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementId {
    Int(i64),
    Str(String),
}

impl ElementId {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ElementId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// What a bag operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// All elements carrying a label (class, type)
    Label(String),
    /// A single element
    Id(ElementId),
    /// Several elements
    Ids(Vec<ElementId>),
}

impl Target {
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    pub fn id(id: impl Into<ElementId>) -> Self {
        Self::Id(id.into())
    }

    pub fn ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ElementId>,
    {
        Self::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// The label, when the target is a label
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(label) => Some(label),
            _ => None,
        }
    }
}

/// Left-hand side of a where-clause.
///
/// The element markers compare against the element's identity or label
/// and never render as plain field comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Field(String),
    ElementId,
    ElementLabel,
}

/// One predicate in a bag's where-chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub subject: Subject,
    pub comparator: Comparator,
    pub value: Value,
    /// Ignored on the first clause of a chain
    #[serde(default)]
    pub conjunction: Conjunction,
}

impl WhereClause {
    pub fn new(subject: Subject, comparator: Comparator, value: impl Into<Value>) -> Self {
        Self {
            subject,
            comparator,
            value: value.into(),
            conjunction: Conjunction::And,
        }
    }

    pub fn field(field: impl Into<String>, comparator: Comparator, value: impl Into<Value>) -> Self {
        Self::new(Subject::Field(field.into()), comparator, value)
    }

    pub fn with_conjunction(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = conjunction;
        self
    }
}

/// Return shape of create/update commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Returning {
    /// Projections if any, otherwise every bound variable
    #[default]
    Bound,
    /// No return clause
    Nothing,
    /// Explicit field list
    Fields(Vec<String>),
}

/// Intermediate representation of one graph operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bag {
    pub command: Option<CommandKind>,
    pub target: Option<Target>,
    #[serde(default)]
    pub element: ElementKind,
    /// Rows to write; more than one implies a multi-row operation
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub wheres: Vec<WhereClause>,
    /// Fields to return; empty returns every bound variable
    #[serde(default)]
    pub projections: Vec<String>,
    #[serde(default)]
    pub order_by: Vec<(String, Direction)>,
    /// `None` and `Some(0)` both mean unlimited
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub returning: Returning,
}

impl Bag {
    pub fn new(command: CommandKind) -> Self {
        Self {
            command: Some(command),
            ..Default::default()
        }
    }

    /// Create elements labelled `label`
    pub fn create(label: impl Into<String>) -> Self {
        Self::new(CommandKind::Create).with_target(Target::label(label))
    }

    pub fn retrieve() -> Self {
        Self::new(CommandKind::Retrieve)
    }

    pub fn update() -> Self {
        Self::new(CommandKind::Update)
    }

    pub fn delete() -> Self {
        Self::new(CommandKind::Delete)
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_element(mut self, element: ElementKind) -> Self {
        self.element = element;
        self
    }

    /// Append a data row
    pub fn with_data(mut self, row: Map<String, Value>) -> Self {
        self.data.push(row);
        self
    }

    pub fn where_clause(mut self, clause: WhereClause) -> Self {
        self.wheres.push(clause);
        self
    }

    pub fn where_field(
        self,
        field: impl Into<String>,
        comparator: Comparator,
        value: impl Into<Value>,
    ) -> Self {
        self.where_clause(WhereClause::field(field, comparator, value))
    }

    pub fn or_where_field(
        self,
        field: impl Into<String>,
        comparator: Comparator,
        value: impl Into<Value>,
    ) -> Self {
        self.where_clause(
            WhereClause::field(field, comparator, value).with_conjunction(Conjunction::Or),
        )
    }

    pub fn where_id(self, comparator: Comparator, value: impl Into<Value>) -> Self {
        self.where_clause(WhereClause::new(Subject::ElementId, comparator, value))
    }

    pub fn where_label(self, label: impl Into<String>) -> Self {
        self.where_clause(WhereClause::new(
            Subject::ElementLabel,
            Comparator::Eq,
            Value::String(label.into()),
        ))
    }

    /// Add a projection; duplicates are dropped
    pub fn project(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.projections.contains(&field) {
            self.projections.push(field);
        }
        self
    }

    pub fn order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push((field.into(), direction));
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_returning(mut self, returning: Returning) -> Self {
        self.returning = returning;
        self
    }

    /// The limit, when one is set and positive
    pub fn effective_limit(&self) -> Option<u64> {
        self.limit.filter(|n| *n > 0)
    }

    /// Check the bag is structurally consistent for its command.
    pub fn validate(&self) -> CommandResult<()> {
        let command = self
            .command
            .ok_or_else(|| CommandError::validation("command must be set"))?;

        match command {
            CommandKind::Create | CommandKind::Update if self.data.is_empty() => {
                return Err(CommandError::validation(format!(
                    "{} requires at least one data row",
                    command
                )));
            }
            CommandKind::Retrieve | CommandKind::Delete if !self.data.is_empty() => {
                return Err(CommandError::validation(format!(
                    "{} does not accept data rows",
                    command
                )));
            }
            _ => {}
        }

        if command == CommandKind::Create {
            if matches!(self.target, Some(Target::Id(_)) | Some(Target::Ids(_))) {
                return Err(CommandError::validation(
                    "create cannot target existing element ids",
                ));
            }
            if !self.wheres.is_empty() {
                return Err(CommandError::validation(
                    "create does not accept where clauses",
                ));
            }
        }

        if matches!(&self.target, Some(Target::Ids(ids)) if ids.is_empty()) {
            return Err(CommandError::validation("target id list is empty"));
        }
        if matches!(&self.target, Some(Target::Label(label)) if label.is_empty()) {
            return Err(CommandError::validation("target label is empty"));
        }

        for clause in &self.wheres {
            validate_clause(clause)?;
        }

        let mut field_names = self
            .data
            .iter()
            .flat_map(|row| row.keys())
            .chain(self.projections.iter())
            .chain(self.order_by.iter().map(|(field, _)| field));
        if field_names.any(|name| name.is_empty()) {
            return Err(CommandError::validation("field names must not be empty"));
        }
        if let Returning::Fields(fields) = &self.returning {
            if fields.iter().any(String::is_empty) {
                return Err(CommandError::validation("field names must not be empty"));
            }
        }

        Ok(())
    }
}

fn validate_clause(clause: &WhereClause) -> CommandResult<()> {
    if clause.comparator.is_membership() && !clause.value.is_array() {
        return Err(CommandError::validation(format!(
            "'{}' comparison requires an array value",
            clause.comparator
        )));
    }

    match &clause.subject {
        Subject::Field(name) if name.is_empty() => {
            Err(CommandError::validation("field names must not be empty"))
        }
        Subject::Field(_) => Ok(()),
        Subject::ElementLabel => {
            if !matches!(clause.comparator, Comparator::Eq | Comparator::Ne) {
                return Err(CommandError::validation(format!(
                    "label clauses only support eq/ne, got '{}'",
                    clause.comparator
                )));
            }
            if !clause.value.is_string() {
                return Err(CommandError::validation("label clauses need a string value"));
            }
            Ok(())
        }
        Subject::ElementId => {
            let is_id = |v: &Value| v.is_i64() || v.is_u64() || v.is_string();
            let ok = match &clause.value {
                Value::Array(items) => {
                    clause.comparator.is_membership() && items.iter().all(is_id)
                }
                other => is_id(other),
            };
            if ok {
                Ok(())
            } else {
                Err(CommandError::validation(format!(
                    "invalid element id value {}",
                    clause.value
                )))
            }
        }
    }
}
