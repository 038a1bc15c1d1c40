// ABOUTME: Config scaffolding for new provisioner setups.
// ABOUTME: Creates provisio.yml with a static-pool cloud and one template.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Locator;

use super::{CONFIG_FILENAME, ProvisioningConfig};

pub fn init_config(dir: &Path, locator: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = ProvisioningConfig::template();

    if let Some(l) = locator {
        let parsed: Locator = l.parse().map_err(|e| Error::InvalidConfig(format!("{l}: {e}")))?;
        config.discovery.locators = nonempty::NonEmpty::new(parsed);
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &ProvisioningConfig) -> String {
    format!(
        r#"cloud:
  name: {}
  configuration:
    driver: {}
    connect_to_private_ip: {}
  user:
    user: {}
    # key_file: ~/.ssh/id_ed25519
  templates:
    small:
      machine_memory_mb: 2048
      number_of_cores: 2
      remote_directory: /opt/cluster-agent
      install_command: ./install.sh
      custom:
        nodes:
          - 10.0.0.11
          - 10.0.0.12

template: small
zones: []

discovery:
  groups: []
  locators:
    - {}

poll_interval: 1s
cleanup_timeout: 5m
"#,
        config.cloud.name,
        config.cloud.configuration.driver,
        config.cloud.configuration.connect_to_private_ip,
        config.cloud.user.user.as_deref().unwrap_or("root"),
        config.discovery.locators.first(),
    )
}
