//! Environment configuration.
//!
//! The service reads a JSON environment file at startup. Its path comes from
//! `WORKING_ENV` (or `--env-file`) and defaults to `dev_env.json`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENV_FILE: &str = "dev_env.json";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// HTTP listen address
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Snapshot file written by `/store` and read at startup
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write a snapshot when the server shuts down
    #[serde(default = "default_persist_on_shutdown")]
    pub persist_on_shutdown: bool,

    /// Samples appended to the ballast per `/memory` call
    #[serde(default = "default_memory_chunk")]
    pub memory_chunk: usize,

    /// Basic-auth credentials (username -> password)
    #[serde(default = "default_users")]
    pub users: HashMap<String, String>,

    /// Metadata returned by the index route
    #[serde(default)]
    pub service: ServiceInfo,
}

/// Project metadata served on `/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInfo {
    #[serde(default = "default_service_name")]
    pub name: String,

    #[serde(default)]
    pub contact: Option<String>,

    #[serde(default = "default_system")]
    pub system: String,

    #[serde(default = "default_component_version")]
    pub version: String,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data_storage.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_persist_on_shutdown() -> bool {
    true
}

fn default_memory_chunk() -> usize {
    1_000_000
}

fn default_users() -> HashMap<String, String> {
    HashMap::from([("user".to_string(), "password".to_string())])
}

fn default_service_name() -> String {
    "biomarker-backend".to_string()
}

fn default_system() -> String {
    "Digital Biomarker Data Collection".to_string()
}

fn default_component_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            contact: None,
            system: default_system(),
            version: default_component_version(),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            data_file: default_data_file(),
            log_level: default_log_level(),
            persist_on_shutdown: default_persist_on_shutdown(),
            memory_chunk: default_memory_chunk(),
            users: default_users(),
            service: ServiceInfo::default(),
        }
    }
}

impl EnvConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read environment file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse environment file {}", path.display()))
    }

    /// Picks the environment file to read.
    ///
    /// An explicitly named file is always returned, so a missing one fails
    /// in `load_from`. Without one, `dev_env.json` is used if present.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let path = Path::new(DEFAULT_ENV_FILE);
                path.exists().then(|| path.to_path_buf())
            }
        }
    }
}
