// ABOUTME: Configuration types and parsing for provisio.yml.
// ABOUTME: Handles YAML parsing, file discovery, and template resolution.

mod cloud;
mod deserialize;
mod env_value;
mod init;

pub use cloud::{Cloud, CloudConfiguration, CloudTemplate, CloudUser};
pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;

use crate::error::{Error, Result};
use crate::types::{Locator, locators_string};
use deserialize::{deserialize_locators, deserialize_zones};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "provisio.yml";
pub const CONFIG_FILENAME_ALT: &str = "provisio.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".provisio/config.yml";

/// Everything one machine provisioner needs at setup time.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    pub cloud: Cloud,

    /// Name of the cloud template new nodes are created from.
    #[serde(default)]
    pub template: Option<String>,

    /// Isolation zone tags handed to installed agents.
    #[serde(default, deserialize_with = "deserialize_zones")]
    pub zones: Vec<String>,

    pub discovery: DiscoverySeed,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default = "default_cleanup_timeout", with = "humantime_serde")]
    pub cleanup_timeout: Duration,

    /// The provisioner itself runs on Windows (affects local directory derivation).
    #[serde(default)]
    pub windows_host: bool,
}

/// Seed addresses of the cluster registry.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySeed {
    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(deserialize_with = "deserialize_locators")]
    pub locators: NonEmpty<Locator>,
}

impl DiscoverySeed {
    pub fn new(locators: NonEmpty<Locator>) -> Self {
        Self {
            groups: Vec::new(),
            locators,
        }
    }

    /// `host:port,host:port` form passed on to installed agents.
    pub fn locators_string(&self) -> String {
        let locators: Vec<Locator> = self.locators.iter().cloned().collect();
        locators_string(&locators)
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_cleanup_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

impl ProvisioningConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// The configured template name, or an error if none was set.
    pub fn template_name(&self) -> Result<&str> {
        self.template
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or(Error::TemplateNotSet)
    }

    /// The template new nodes are created from.
    pub fn resolve_template(&self) -> Result<&CloudTemplate> {
        let name = self.template_name()?;
        self.cloud
            .templates
            .get(name)
            .ok_or_else(|| Error::UnknownTemplate {
                template: name.to_string(),
                cloud: self.cloud.name.clone(),
            })
    }

    /// Fail fast on anything that would otherwise surface mid-provisioning.
    pub fn validate(&self) -> Result<()> {
        let template = self.resolve_template()?;

        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }

        if template.remote_directory.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "template {} has an empty remote_directory",
                self.template_name()?
            )));
        }

        if template.install_command.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "template {} has an empty install_command",
                self.template_name()?
            )));
        }

        Ok(())
    }

    pub fn template() -> Self {
        let mut custom = HashMap::new();
        custom.insert(
            "nodes".to_string(),
            serde_yaml::Value::Sequence(vec![
                serde_yaml::Value::String("10.0.0.11".to_string()),
                serde_yaml::Value::String("10.0.0.12".to_string()),
            ]),
        );

        let mut templates = BTreeMap::new();
        templates.insert(
            "small".to_string(),
            CloudTemplate {
                machine_memory_mb: 2048,
                number_of_cores: 2,
                remote_directory: "/opt/cluster-agent".to_string(),
                local_directory: None,
                install_command: "./install.sh".to_string(),
                username: None,
                key_file: None,
                env: HashMap::new(),
                custom,
            },
        );

        ProvisioningConfig {
            cloud: Cloud {
                name: "my-cloud".to_string(),
                configuration: CloudConfiguration {
                    driver: "static-pool".to_string(),
                    connect_to_private_ip: true,
                },
                user: CloudUser {
                    user: Some("root".to_string()),
                    ..CloudUser::default()
                },
                templates,
            },
            template: Some("small".to_string()),
            zones: vec![],
            discovery: DiscoverySeed::new(NonEmpty::new(Locator::new(
                "10.0.0.10",
                crate::types::DEFAULT_LOCATOR_PORT,
            ))),
            poll_interval: default_poll_interval(),
            cleanup_timeout: default_cleanup_timeout(),
            windows_host: false,
        }
    }
}
