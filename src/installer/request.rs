// ABOUTME: Installation request derived from node details and the bound template.
// ABOUTME: Renders the remote script that installs and starts the cluster agent.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::{ProvisioningConfig, resolve_env_map};
use crate::driver::NodeDetails;
use crate::error::{Error, Result};
use crate::types::NodeAddress;

pub const ENV_LOCATORS: &str = "CLUSTER_LOCATORS";
pub const ENV_GROUPS: &str = "CLUSTER_GROUPS";
pub const ENV_ZONES: &str = "AGENT_ZONES";
pub const ENV_MACHINE_IP: &str = "MACHINE_IP_ADDRESS";
pub const ENV_PUBLIC_IP: &str = "PUBLIC_IP_ADDRESS";
pub const ENV_PRIVATE_IP: &str = "PRIVATE_IP_ADDRESS";
pub const ENV_WORKING_DIR: &str = "WORKING_HOME_DIRECTORY";
/// The working directory as the provisioning host names it.
pub const ENV_LOCAL_DIR: &str = "LOCAL_DIRECTORY";

/// What the installer needs to put an agent on one node.
#[derive(Clone, PartialEq, Eq)]
pub struct InstallationRequest {
    /// Address the installer connects to.
    pub address: NodeAddress,
    pub ssh_port: u16,
    pub username: String,
    pub key_file: Option<PathBuf>,
    pub remote_directory: String,
    pub local_directory: String,
    pub install_command: String,
    /// Exported before `install_command` runs.
    pub environment: BTreeMap<String, String>,
}

impl InstallationRequest {
    /// Build the request for `node`, connecting to `address`.
    pub fn build(
        node: &NodeDetails,
        address: &NodeAddress,
        config: &ProvisioningConfig,
    ) -> Result<Self> {
        let template = config.resolve_template()?;
        let cloud_user = &config.cloud.user;

        let username = node
            .remote_username
            .clone()
            .or_else(|| template.username.clone())
            .or_else(|| cloud_user.user.clone())
            .ok_or_else(|| {
                Error::InvalidConfig(format!("no login user for node {}", address))
            })?;

        let key_file = node
            .key_file
            .clone()
            .or_else(|| template.key_file.clone())
            .or_else(|| cloud_user.key_file.clone());

        let local_directory = template.local_directory(config.windows_host);
        let mut environment = resolve_env_map(&template.env)?;
        environment.insert(ENV_LOCATORS.to_string(), config.discovery.locators_string());
        environment.insert(ENV_GROUPS.to_string(), config.discovery.groups.join(","));
        environment.insert(ENV_ZONES.to_string(), config.zones.join(","));
        environment.insert(ENV_MACHINE_IP.to_string(), address.to_string());
        environment.insert(
            ENV_WORKING_DIR.to_string(),
            template.remote_directory.clone(),
        );
        environment.insert(ENV_LOCAL_DIR.to_string(), local_directory.clone());
        if let Some(public) = &node.public_address {
            environment.insert(ENV_PUBLIC_IP.to_string(), public.to_string());
        }
        if let Some(private) = &node.private_address {
            environment.insert(ENV_PRIVATE_IP.to_string(), private.to_string());
        }

        Ok(Self {
            address: address.clone(),
            ssh_port: cloud_user.ssh_port,
            username,
            key_file,
            remote_directory: template.remote_directory.clone(),
            local_directory,
            install_command: template.install_command.clone(),
            environment,
        })
    }

    /// Shell script run on the node.
    pub fn script(&self) -> String {
        let mut lines = vec![
            "set -e".to_string(),
            format!("mkdir -p {}", shell_quote(&self.remote_directory)),
            format!("cd {}", shell_quote(&self.remote_directory)),
        ];
        for (key, value) in &self.environment {
            lines.push(format!("export {}={}", key, shell_quote(value)));
        }
        lines.push(self.install_command.clone());
        lines.join("\n")
    }
}

// Environment values may carry credentials, so Debug prints keys only.
impl fmt::Debug for InstallationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationRequest")
            .field("address", &self.address)
            .field("ssh_port", &self.ssh_port)
            .field("username", &self.username)
            .field("key_file", &self.key_file)
            .field("remote_directory", &self.remote_directory)
            .field("local_directory", &self.local_directory)
            .field("install_command", &self.install_command)
            .field("environment", &self.environment.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
