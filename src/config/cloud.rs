// ABOUTME: Cloud descriptor: driver selection, login user, and machine templates.
// ABOUTME: Templates declare node capacity and where/how the agent gets installed.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use super::EnvValue;

#[derive(Debug, Clone, Deserialize)]
pub struct Cloud {
    pub name: String,

    pub configuration: CloudConfiguration,

    #[serde(default)]
    pub user: CloudUser,

    pub templates: BTreeMap<String, CloudTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfiguration {
    /// Name of the provisioning driver, e.g. `static-pool`.
    pub driver: String,

    /// Use the node's private address for installation and discovery.
    #[serde(default)]
    pub connect_to_private_ip: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudUser {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub key_file: Option<PathBuf>,

    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
}

impl Default for CloudUser {
    fn default() -> Self {
        Self {
            user: None,
            key_file: None,
            ssh_port: default_ssh_port(),
        }
    }
}

fn default_ssh_port() -> u16 {
    22
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudTemplate {
    pub machine_memory_mb: u64,

    #[serde(default = "default_cores")]
    pub number_of_cores: u32,

    pub remote_directory: String,

    #[serde(default)]
    pub local_directory: Option<String>,

    pub install_command: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub key_file: Option<PathBuf>,

    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    /// Driver-specific settings, passed through untouched.
    #[serde(default)]
    pub custom: HashMap<String, serde_yaml::Value>,
}

fn default_cores() -> u32 {
    1
}

impl CloudTemplate {
    /// Directory the management software lives in, as seen from the provisioner host.
    ///
    /// An explicit `local_directory` wins. Otherwise it mirrors `remote_directory`;
    /// on Windows hosts a path such as `/C$/agent` becomes `C:/agent`.
    pub fn local_directory(&self, windows_host: bool) -> String {
        if let Some(dir) = &self.local_directory {
            return dir.clone();
        }

        if !windows_host {
            return self.remote_directory.clone();
        }

        windows_local_directory(&self.remote_directory)
    }
}

fn windows_local_directory(remote: &str) -> String {
    let stripped = remote.replace('$', "");
    let stripped = stripped.strip_prefix('/').unwrap_or(&stripped);

    let mut chars = stripped.chars();
    match (chars.next(), chars.next()) {
        (Some(drive), Some('/')) if drive.is_ascii_alphabetic() => {
            format!("{}:{}", drive, &stripped[1..])
        }
        _ => stripped.to_string(),
    }
}
