//! Configuration management.

use serde::Deserialize;

use crate::telemetry::LoggingConfig;
use crate::workflow::policy::{
    DEFAULT_MAX_TASK_DEPTH, DEFAULT_SYSTEM_TASK_TYPES, DEFAULT_WHITELISTED_SIMPLE_TASKS,
};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Backend targets the dispatcher forwards to
    #[serde(default)]
    pub backends: BackendsConfig,

    /// Access control configuration
    #[serde(default)]
    pub access: AccessConfig,

    /// Task allow-lists
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendsConfig {
    /// Workflow orchestration backend
    #[serde(default = "default_conductor_target")]
    pub conductor: String,

    /// Scheduling backend
    #[serde(default = "default_schellar_target")]
    pub schellar: String,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            conductor: default_conductor_target(),
            schellar: default_schellar_target(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Role that grants administrative access
    #[serde(default = "default_owner_role")]
    pub owner_role: String,

    /// Group that grants administrative access
    #[serde(default = "default_admin_group")]
    pub admin_group: String,

    /// Static identity directory used when no external directory is wired in
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            owner_role: default_owner_role(),
            admin_group: default_admin_group(),
            directory: DirectoryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Role of callers without an entry
    #[serde(default = "default_role")]
    pub default_role: String,

    #[serde(default)]
    pub users: Vec<DirectoryEntry>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            default_role: default_role(),
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    /// Tenant the entry applies to; any tenant when absent
    #[serde(default)]
    pub tenant: Option<String>,

    pub email: String,

    pub role: String,

    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_system_task_types")]
    pub system_task_types: Vec<String>,

    #[serde(default = "default_whitelisted_simple_tasks")]
    pub whitelisted_simple_tasks: Vec<String>,

    /// Deepest accepted task nesting
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            system_task_types: default_system_task_types(),
            whitelisted_simple_tasks: default_whitelisted_simple_tasks(),
            max_depth: default_max_depth(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8088 }
fn default_conductor_target() -> String { "http://conductor-server:8080".to_string() }
fn default_schellar_target() -> String { "http://schellar:3000".to_string() }
fn default_owner_role() -> String { "OWNER".to_string() }
fn default_admin_group() -> String { "network-admin".to_string() }
fn default_role() -> String { "USER".to_string() }
fn default_max_depth() -> usize { DEFAULT_MAX_TASK_DEPTH }

fn default_system_task_types() -> Vec<String> {
    DEFAULT_SYSTEM_TASK_TYPES.iter().map(|s| s.to_string()).collect()
}

fn default_whitelisted_simple_tasks() -> Vec<String> {
    DEFAULT_WHITELISTED_SIMPLE_TASKS.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Load configuration from the environment (`TENANCY__SECTION__KEY`).
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("TENANCY").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("TENANCY").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would otherwise be silently adjusted.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.tasks.max_depth > 0, "tasks.max_depth must be at least 1");
        Ok(())
    }
}
