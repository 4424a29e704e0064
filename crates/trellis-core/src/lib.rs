//! # Trellis core
//!
//! Driver-independent description of graph operations and the processors
//! that compile them into native query scripts.
//!
//! ## Pipeline
//!
//! ```text
//! Bag (intent) -> validate -> CommandProcessor::process -> Command (script + dialect)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trellis_core::{Bag, CommandProcessor, Comparator, CypherProcessor, Target};
//!
//! let bag = Bag::retrieve()
//!     .with_target(Target::label("person"))
//!     .where_field("name", Comparator::Eq, "Ada")
//!     .with_limit(1);
//!
//! let command = CypherProcessor::new().process(&bag).unwrap();
//! assert_eq!(
//!     command.script(),
//!     "MATCH (a:person) WHERE a.name = 'Ada' RETURN a LIMIT 1"
//! );
//! ```

pub mod bag;
pub mod command;
pub mod error;
pub mod ops;
pub mod policy;
pub mod processor;

// Re-exports
pub use bag::{Bag, ElementId, Returning, Subject, Target, WhereClause};
pub use command::{Command, Dialect};
pub use error::{CommandError, CommandResult};
pub use ops::{CommandKind, Comparator, Conjunction, Direction, ElementKind};
pub use policy::NotSupportedPolicy;
pub use processor::{
    CommandProcessor, CypherProcessor, GremlinProcessor, OrientSqlProcessor, ProcessorRegistry,
};
