//! Driver dispatch and transaction control

use crate::client::{ClientError, NativeClient};
use crate::config::DriverConfig;
use crate::error::{DriverError, DriverResult};
use crate::format::{GremlinFormatter, Neo4jFormatter, OrientFormatter, ResponseFormatter};
use crate::response::Response;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use trellis_core::{
    Bag, Command, CommandProcessor, Dialect, NotSupportedPolicy, ProcessorRegistry,
};

/// Graph store family a driver talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    #[default]
    #[serde(rename = "neo4j")]
    Neo4j,
    #[serde(rename = "gremlin-server")]
    GremlinServer,
    #[serde(rename = "orientdb")]
    OrientDb,
}

impl DriverKind {
    /// Supported dialects. The first one compiles bags.
    pub fn dialects(self) -> &'static [Dialect] {
        match self {
            Self::Neo4j => &[Dialect::Cypher],
            Self::GremlinServer => &[Dialect::Gremlin],
            Self::OrientDb => &[Dialect::OrientSql, Dialect::Gremlin],
        }
    }

    pub fn primary_dialect(self) -> Dialect {
        self.dialects()[0]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neo4j => "neo4j",
            Self::GremlinServer => "gremlin-server",
            Self::OrientDb => "orientdb",
        }
    }

    /// Default port of the store's native protocol
    pub fn default_port(self) -> u16 {
        match self {
            Self::Neo4j => 7687,
            Self::GremlinServer => 8182,
            Self::OrientDb => 2424,
        }
    }

    fn formatter(self, policy: NotSupportedPolicy) -> Arc<dyn ResponseFormatter> {
        match self {
            Self::Neo4j => Arc::new(Neo4jFormatter::with_policy(policy)),
            Self::GremlinServer => Arc::new(GremlinFormatter::with_policy(policy)),
            Self::OrientDb => Arc::new(OrientFormatter::with_policy(policy)),
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a driver can run: a precompiled command or a bag to compile
#[derive(Debug, Clone)]
pub enum Query {
    Command(Command),
    Bag(Bag),
}

impl From<Command> for Query {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<Bag> for Query {
    fn from(bag: Bag) -> Self {
        Self::Bag(bag)
    }
}

impl From<&Bag> for Query {
    fn from(bag: &Bag) -> Self {
        Self::Bag(bag.clone())
    }
}

/// Dispatches commands to a native client and wraps what comes back.
///
/// At most one transaction is open at a time. Dropping a driver rolls back
/// an open transaction and closes the client.
pub struct Driver<C: NativeClient> {
    kind: DriverKind,
    client: C,
    processors: ProcessorRegistry,
    formatter: Arc<dyn ResponseFormatter>,
    policy: NotSupportedPolicy,
    in_transaction: bool,
    closed: bool,
}

impl<C: NativeClient> Driver<C> {
    pub fn new(kind: DriverKind, client: C) -> Self {
        Self::with_policy(kind, client, NotSupportedPolicy::default())
    }

    pub fn with_policy(kind: DriverKind, client: C, policy: NotSupportedPolicy) -> Self {
        debug!(kind = %kind, policy = ?policy, "Creating driver");
        Self {
            kind,
            client,
            processors: ProcessorRegistry::for_dialects(kind.dialects(), policy),
            formatter: kind.formatter(policy),
            policy,
            in_transaction: false,
            closed: false,
        }
    }

    /// Build a driver from loaded configuration
    pub fn from_config(config: &DriverConfig, client: C) -> Self {
        Self::with_policy(config.kind, client, config.errors.not_supported)
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    pub fn policy(&self) -> NotSupportedPolicy {
        self.policy
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn formatter(&self) -> Arc<dyn ResponseFormatter> {
        Arc::clone(&self.formatter)
    }

    pub fn dialects(&self) -> &'static [Dialect] {
        self.kind.dialects()
    }

    pub fn supports(&self, dialect: Dialect) -> bool {
        self.dialects().contains(&dialect)
    }

    /// Whether `language` names a supported dialect. Unknown names are unsupported.
    pub fn is_supported_language(&self, language: &str) -> bool {
        language
            .parse::<Dialect>()
            .map(|dialect| self.supports(dialect))
            .unwrap_or(false)
    }

    /// Processor for a supported dialect
    pub fn processor(&self, dialect: Dialect) -> DriverResult<Arc<dyn CommandProcessor>> {
        if !self.supports(dialect) {
            return Err(unsupported_dialect(self.kind, dialect));
        }
        Ok(self.processors.get(dialect)?)
    }

    /// Resolve a query into a command this driver can execute
    pub fn compile(&self, query: impl Into<Query>) -> DriverResult<Command> {
        let command = match query.into() {
            Query::Command(command) => {
                if !self.supports(command.dialect()) {
                    return Err(unsupported_dialect(self.kind, command.dialect()));
                }
                command
            }
            Query::Bag(bag) => self
                .processor(self.kind.primary_dialect())?
                .process(&bag)?,
        };
        debug!(
            dialect = %command.dialect(),
            script_len = command.script().len(),
            "Compiled command"
        );
        Ok(command)
    }

    pub fn execute_read(&self, query: impl Into<Query>) -> DriverResult<Response> {
        self.execute("read", query.into())
    }

    pub fn execute_write(&self, query: impl Into<Query>) -> DriverResult<Response> {
        self.execute("write", query.into())
    }

    fn execute(&self, operation: &'static str, query: Query) -> DriverResult<Response> {
        let command = self.compile(query)?;
        debug!(operation, dialect = %command.dialect(), "Executing command");
        let raw = self.client.execute(&command)?;
        Ok(Response::new(raw, self.formatter()))
    }

    /// Execute for side effects only. An empty result is not an error.
    pub fn run(&self, query: impl Into<Query>) -> DriverResult<&Self> {
        let command = self.compile(query)?;
        match self.client.execute(&command) {
            Ok(_) => Ok(self),
            Err(ClientError::EmptyResult(message)) => {
                debug!(message = %message, "Command produced no result");
                Ok(self)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn start_transaction(&mut self) -> DriverResult<()> {
        if self.in_transaction {
            return Err(DriverError::invalid_state("a transaction is already open"));
        }
        self.client.begin()?;
        self.in_transaction = true;
        info!(kind = %self.kind, "Transaction started");
        Ok(())
    }

    /// Commit or roll back the open transaction.
    ///
    /// The transaction is considered closed afterwards even if the client
    /// call fails.
    pub fn stop_transaction(&mut self, commit: bool) -> DriverResult<()> {
        if !self.in_transaction {
            return Err(DriverError::invalid_state("no transaction is open"));
        }
        self.in_transaction = false;
        if commit {
            self.client.commit()?;
            info!(kind = %self.kind, "Transaction committed");
        } else {
            self.client.rollback()?;
            info!(kind = %self.kind, "Transaction rolled back");
        }
        Ok(())
    }

    /// Roll back any open transaction and close the client
    pub fn close(mut self) -> DriverResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> DriverResult<()> {
        self.closed = true;
        let rollback = if self.in_transaction {
            self.in_transaction = false;
            info!(kind = %self.kind, "Rolling back open transaction on close");
            self.client.rollback()
        } else {
            Ok(())
        };
        let close = self.client.close();
        rollback?;
        close?;
        Ok(())
    }
}

impl<C: NativeClient> Drop for Driver<C> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.shutdown() {
            warn!(kind = %self.kind, error = %e, "Failed to shut down driver cleanly");
        }
    }
}

impl<C: NativeClient> fmt::Debug for Driver<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

fn unsupported_dialect(kind: DriverKind, dialect: Dialect) -> DriverError {
    DriverError::not_supported(format!("{} does not speak '{}'", kind, dialect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use test_case::test_case;

    /// Records every call and answers with a fixed payload
    #[derive(Default)]
    struct RecordingClient {
        calls: RefCell<Vec<String>>,
        reply: Value,
    }

    impl NativeClient for RecordingClient {
        fn execute(&self, command: &Command) -> Result<Value, ClientError> {
            self.calls.borrow_mut().push(command.script().to_string());
            Ok(self.reply.clone())
        }

        fn begin(&mut self) -> Result<(), ClientError> {
            self.calls.get_mut().push("begin".to_string());
            Ok(())
        }

        fn commit(&mut self) -> Result<(), ClientError> {
            self.calls.get_mut().push("commit".to_string());
            Ok(())
        }

        fn rollback(&mut self) -> Result<(), ClientError> {
            self.calls.get_mut().push("rollback".to_string());
            Ok(())
        }
    }

    #[test_case(DriverKind::Neo4j, "cypher", true ; "neo4j speaks cypher")]
    #[test_case(DriverKind::Neo4j, "gremlin", false ; "neo4j does not speak gremlin")]
    #[test_case(DriverKind::GremlinServer, "GREMLIN", true ; "case insensitive")]
    #[test_case(DriverKind::OrientDb, "orientdb-sql", true ; "orient speaks sql")]
    #[test_case(DriverKind::OrientDb, "gremlin", true ; "orient speaks gremlin")]
    #[test_case(DriverKind::OrientDb, "sparql", false ; "unknown language")]
    fn test_is_supported_language(kind: DriverKind, language: &str, expected: bool) {
        let driver = Driver::new(kind, RecordingClient::default());
        assert_eq!(driver.is_supported_language(language), expected);
    }

    #[test]
    fn test_bag_compiles_with_primary_dialect() {
        let driver = Driver::new(DriverKind::OrientDb, RecordingClient::default());
        let command = driver
            .compile(Bag::retrieve().with_target(trellis_core::Target::label("Person")))
            .unwrap();

        assert_eq!(command.dialect(), Dialect::OrientSql);
        assert_eq!(command.script(), "SELECT FROM Person");
    }

    #[test]
    fn test_foreign_command_is_rejected() {
        let driver = Driver::new(DriverKind::Neo4j, RecordingClient::default());
        let err = driver
            .execute_read(Command::new("g.V()", Dialect::Gremlin))
            .unwrap_err();

        assert!(err.is_not_supported());
        assert!(driver.client().calls.borrow().is_empty());
    }

    #[test]
    fn test_execute_wraps_payload() {
        let client = RecordingClient {
            reply: json!([[42]]),
            ..Default::default()
        };
        let driver = Driver::new(DriverKind::Neo4j, client);

        let response = driver
            .execute_read(Command::new("RETURN 42", Dialect::Cypher))
            .unwrap();
        assert_eq!(response.as_scalar().unwrap(), &json!(42));
        assert_eq!(*driver.client().calls.borrow(), ["RETURN 42"]);
    }

    #[test]
    fn test_transaction_flag() {
        let mut driver = Driver::new(DriverKind::Neo4j, RecordingClient::default());

        driver.start_transaction().unwrap();
        assert!(driver.in_transaction());
        assert!(matches!(
            driver.start_transaction().unwrap_err(),
            DriverError::InvalidState(_)
        ));

        driver.stop_transaction(true).unwrap();
        assert!(!driver.in_transaction());
        assert!(matches!(
            driver.stop_transaction(false).unwrap_err(),
            DriverError::InvalidState(_)
        ));
        assert_eq!(*driver.client().calls.borrow(), ["begin", "commit"]);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_value(DriverKind::GremlinServer).unwrap(),
            json!("gremlin-server")
        );
        let kind: DriverKind = serde_json::from_value(json!("orientdb")).unwrap();
        assert_eq!(kind, DriverKind::OrientDb);
    }
}
