// ABOUTME: Application-wide error types for provisio.
// ABOUTME: Uses thiserror for configuration and CLI-level failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::provision::ProvisionError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("cloud template was not set")]
    TemplateNotSet,

    #[error("cloud template {template} was not found in cloud {cloud}")]
    UnknownTemplate { template: String, cloud: String },

    #[error("unknown provisioning driver: {0}")]
    UnknownDriver(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no agent found at {0}")]
    AgentNotFound(String),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
