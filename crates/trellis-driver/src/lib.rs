//! # Trellis driver
//!
//! Runs compiled commands against a graph store through a [`NativeClient`]
//! and normalizes what comes back.
//!
//! ## Features
//!
//! - **Dispatch**: bags compile with the driver's primary dialect; raw
//!   commands are checked against the dialects the driver speaks
//! - **Transactions**: one open transaction at a time, rolled back on drop
//! - **Normalization**: lazy set, path and scalar views over raw payloads,
//!   built from protected-key [`Record`]s
//! - **Configuration**: TOML, YAML or JSON via [`DriverConfig`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_core::{Bag, Comparator, Target};
//! use trellis_driver::{Driver, DriverKind};
//!
//! let driver = Driver::new(DriverKind::Neo4j, client);
//! let bag = Bag::retrieve()
//!     .with_target(Target::label("person"))
//!     .where_field("age", Comparator::Gt, 30);
//!
//! for record in driver.execute_read(bag)?.as_set()?.clone().into_vec() {
//!     println!("{} {:?}", record.id(), record.get("name"));
//! }
//! ```

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod record;
pub mod response;

pub use client::{ClientError, NativeClient};
pub use config::{ConnectionConfig, DriverConfig, ErrorConfig};
pub use driver::{Driver, DriverKind, Query};
pub use error::{DriverError, DriverResult};
pub use format::{
    GremlinFormatter, Neo4jFormatter, OrientFormatter, ResponseFormatter, SetResult, Shape,
};
pub use record::{Record, PROTECTED_KEYS};
pub use response::Response;
