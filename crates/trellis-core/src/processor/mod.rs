//! Dialect processors.
//!
//! A processor compiles a validated [`Bag`] into a [`Command`] written in
//! one native query language. Processors hold no per-call state, so one
//! instance can be shared freely; each `process` call works on its own
//! [`Scratch`](common::Scratch).

pub mod common;
mod cypher;
mod gremlin;
mod sql;

pub use cypher::CypherProcessor;
pub use gremlin::GremlinProcessor;
pub use sql::OrientSqlProcessor;

use crate::bag::Bag;
use crate::command::{Command, Dialect};
use crate::error::{CommandError, CommandResult};
use crate::policy::NotSupportedPolicy;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for compiling bags into one dialect.
pub trait CommandProcessor: Send + Sync {
    /// The dialect this processor emits
    fn dialect(&self) -> Dialect;

    /// Validate `bag` and compile it into a command
    fn process(&self, bag: &Bag) -> CommandResult<Command>;
}

/// Registry of processors keyed by dialect.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<Dialect, Arc<dyn CommandProcessor>>,
}

impl ProcessorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in dialect
    pub fn with_defaults(policy: NotSupportedPolicy) -> Self {
        Self::for_dialects(&Dialect::ALL, policy)
    }

    /// Registry with the built-in processors for `dialects`
    pub fn for_dialects(dialects: &[Dialect], policy: NotSupportedPolicy) -> Self {
        let mut registry = Self::new();
        for dialect in dialects {
            registry.register(builtin(*dialect, policy));
        }
        registry
    }

    /// Register a processor, replacing any previous one for its dialect
    pub fn register(&mut self, processor: Arc<dyn CommandProcessor>) {
        self.processors.insert(processor.dialect(), processor);
    }

    pub fn contains(&self, dialect: Dialect) -> bool {
        self.processors.contains_key(&dialect)
    }

    /// Look up the processor for `dialect`
    pub fn get(&self, dialect: Dialect) -> CommandResult<Arc<dyn CommandProcessor>> {
        self.processors.get(&dialect).cloned().ok_or_else(|| {
            CommandError::not_supported(format!("no processor registered for '{}'", dialect))
        })
    }

    /// Registered dialects, in a stable order
    pub fn dialects(&self) -> Vec<Dialect> {
        Dialect::ALL
            .into_iter()
            .filter(|d| self.processors.contains_key(d))
            .collect()
    }
}

fn builtin(dialect: Dialect, policy: NotSupportedPolicy) -> Arc<dyn CommandProcessor> {
    match dialect {
        Dialect::Cypher => Arc::new(CypherProcessor::with_policy(policy)),
        Dialect::Gremlin => Arc::new(GremlinProcessor::with_policy(policy)),
        Dialect::OrientSql => Arc::new(OrientSqlProcessor::with_policy(policy)),
    }
}
