//! Database configuration.
//!
//! The on-disk shape is camelCase JSON, e.g.
//! `{"host": "localhost", "port": 5432, "user": "srm", "database": "harness"}`.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where and how to connect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    /// Server host; unused by file-based drivers.
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: Option<String>,
    /// Database name, or a file path for embedded drivers.
    pub database: String,
    /// Schema that tagged entity tables live in.
    pub schema: Option<String>,
}

impl DatabaseConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Read a bare `DatabaseConfig` JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }
}

/// Read and parse any JSON configuration file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let config_load = |message: String| Error::ConfigLoad {
        path: path.display().to_string(),
        message,
    };
    let text = fs::read_to_string(path).map_err(|e| config_load(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| config_load(e.to_string()))
}
