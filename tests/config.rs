// ABOUTME: Integration tests for configuration parsing, discovery and validation.
// ABOUTME: Tests YAML shapes, defaults, template resolution and the init scaffold.

use provisio::config::*;
use provisio::error::Error;
use std::fs;
use std::time::Duration;

const MINIMAL: &str = r#"
cloud:
  name: lab
  configuration:
    driver: static-pool
  templates:
    small:
      machine_memory_mb: 4096
      number_of_cores: 4
      remote_directory: /opt/agent
      install_command: ./install.sh
      custom:
        nodes: [10.1.0.1]
template: small
discovery:
  locators:
    - 10.1.0.100
"#;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config_with_defaults() {
        let config = ProvisioningConfig::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.cloud.name, "lab");
        assert!(!config.cloud.configuration.connect_to_private_ip);
        assert_eq!(config.template_name().unwrap(), "small");
        assert!(config.zones.is_empty());
        assert!(config.discovery.groups.is_empty());
        assert_eq!(config.discovery.locators_string(), "10.1.0.100:4174");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.cleanup_timeout, Duration::from_secs(300));
        assert!(!config.windows_host);
        config.validate().unwrap();
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
cloud:
  name: lab
  configuration:
    driver: static-pool
    connect_to_private_ip: true
  user:
    user: deploy
    key_file: /keys/lab
    ssh_port: 2222
  templates:
    big:
      machine_memory_mb: 16384
      number_of_cores: 8
      remote_directory: /C$/agent
      install_command: install.cmd
      username: admin
      env:
        AGENT_OPTS: -Xmx1g
        TOKEN:
          env: PROVISIO_TEST_UNSET_TOKEN
          default: none
template: big
zones: [" web ", "eu", "web", ""]
discovery:
  groups: [prod]
  locators:
    - registry-1:4000
    - host: registry-2
    - host: registry-3
      port: 4001
poll_interval: 250ms
cleanup_timeout: 2m
windows_host: true
"#;
        let config = ProvisioningConfig::from_yaml(yaml).unwrap();

        assert!(config.cloud.configuration.connect_to_private_ip);
        assert_eq!(config.cloud.user.ssh_port, 2222);
        assert_eq!(config.zones, vec!["web".to_string(), "eu".to_string()]);
        assert_eq!(config.discovery.groups, vec!["prod".to_string()]);
        assert_eq!(
            config.discovery.locators_string(),
            "registry-1:4000,registry-2:4174,registry-3:4001"
        );
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.cleanup_timeout, Duration::from_secs(120));

        let template = config.resolve_template().unwrap();
        assert_eq!(template.number_of_cores, 8);
        assert_eq!(template.local_directory(config.windows_host), "C:/agent");
        assert_eq!(
            resolve_env_map(&template.env).unwrap()["TOKEN"],
            "none".to_string()
        );
    }

    #[test]
    fn cores_default_to_one() {
        let yaml = MINIMAL.replace("      number_of_cores: 4\n", "");
        let config = ProvisioningConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.resolve_template().unwrap().number_of_cores, 1);
    }

    #[test]
    fn empty_locator_list_is_rejected() {
        let yaml = MINIMAL.replace("  locators:\n    - 10.1.0.100\n", "  locators: []\n");
        let err = ProvisioningConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("locator"));
    }

    #[test]
    fn bad_locator_port_is_rejected() {
        let yaml = MINIMAL.replace("10.1.0.100", "10.1.0.100:http");
        assert!(ProvisioningConfig::from_yaml(&yaml).is_err());
    }
}

mod templates {
    use super::*;

    #[test]
    fn missing_template_name() {
        let yaml = MINIMAL.replace("template: small\n", "");
        let config = ProvisioningConfig::from_yaml(&yaml).unwrap();
        assert!(matches!(config.resolve_template(), Err(Error::TemplateNotSet)));
    }

    #[test]
    fn blank_template_name_counts_as_missing() {
        let yaml = MINIMAL.replace("template: small", "template: \"  \"");
        let config = ProvisioningConfig::from_yaml(&yaml).unwrap();
        assert!(matches!(config.template_name(), Err(Error::TemplateNotSet)));
    }

    #[test]
    fn unknown_template_names_the_cloud() {
        let yaml = MINIMAL.replace("template: small", "template: large");
        let config = ProvisioningConfig::from_yaml(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::UnknownTemplate { .. }));
        assert!(err.to_string().contains("large"));
        assert!(err.to_string().contains("lab"));
    }

    #[test]
    fn zero_poll_interval_is_invalid() {
        let yaml = format!("{}poll_interval: 0s\n", MINIMAL);
        let config = ProvisioningConfig::from_yaml(&yaml).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}

mod discovery {
    use super::*;

    #[test]
    fn finds_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("provisio.yml"), MINIMAL).unwrap();
        let config = ProvisioningConfig::discover(dir.path()).unwrap();
        assert_eq!(config.cloud.name, "lab");
    }

    #[test]
    fn finds_yaml_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("provisio.yaml"), MINIMAL).unwrap();
        assert!(ProvisioningConfig::discover(dir.path()).is_ok());
    }

    #[test]
    fn finds_dot_directory_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".provisio")).unwrap();
        fs::write(dir.path().join(".provisio/config.yml"), MINIMAL).unwrap();
        assert!(ProvisioningConfig::discover(dir.path()).is_ok());
    }

    #[test]
    fn primary_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("provisio.yml"), MINIMAL).unwrap();
        fs::write(
            dir.path().join("provisio.yaml"),
            MINIMAL.replace("name: lab", "name: other"),
        )
        .unwrap();
        let config = ProvisioningConfig::discover(dir.path()).unwrap();
        assert_eq!(config.cloud.name, "lab");
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProvisioningConfig::discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}

mod init {
    use super::*;

    #[test]
    fn scaffold_is_a_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), Some("10.2.0.1:5000"), false).unwrap();

        let config = ProvisioningConfig::discover(dir.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.discovery.locators_string(), "10.2.0.1:5000");
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "existing").unwrap();

        let err = init_config(dir.path(), None, false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));

        init_config(dir.path(), None, true).unwrap();
        assert!(ProvisioningConfig::discover(dir.path()).is_ok());
    }
}
