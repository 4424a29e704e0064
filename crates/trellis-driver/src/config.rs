//! Driver configuration
//!
//! Plain serde structs with defaults, loadable from TOML, YAML or JSON.
//!
//! ```toml
//! kind = "orientdb"
//!
//! [connection]
//! host = "graph.internal"
//! database = "people"
//!
//! [errors]
//! not_supported = "warn"
//! ```

use crate::driver::DriverKind;
use crate::error::{DriverError, DriverResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use trellis_core::NotSupportedPolicy;

/// Top-level driver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub kind: DriverKind,
    pub connection: ConnectionConfig,
    pub errors: ErrorConfig,
}

/// Where the native client connects. Connecting itself is the client's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    /// Falls back to the driver kind's default port
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            user: None,
            password: None,
            database: None,
        }
    }
}

/// Error severity settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    pub not_supported: NotSupportedPolicy,
}

impl DriverConfig {
    pub fn from_toml_str(content: &str) -> DriverResult<Self> {
        toml::from_str(content).map_err(|e| DriverError::config(format!("invalid TOML: {}", e)))
    }

    pub fn from_yaml_str(content: &str) -> DriverResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| DriverError::config(format!("invalid YAML: {}", e)))
    }

    pub fn from_json_str(content: &str) -> DriverResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| DriverError::config(format!("invalid JSON: {}", e)))
    }

    /// Load from a file, choosing the format by extension
    pub fn load_from_file(path: impl AsRef<Path>) -> DriverResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriverError::config(format!("{}: {}", path.display(), e)))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let config = match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            _ => {
                return Err(DriverError::config(format!(
                    "{}: unrecognized config format",
                    path.display()
                )))
            }
        };

        info!(path = ?path, kind = %config.kind, "Loaded driver configuration");
        Ok(config)
    }

    /// Configured port, or the default for the driver kind
    pub fn port(&self) -> u16 {
        self.connection
            .port
            .unwrap_or_else(|| self.kind.default_port())
    }
}
