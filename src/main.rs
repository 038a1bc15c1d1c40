// ABOUTME: Entry point for the provisio CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use provisio::config::{self, CONFIG_FILENAME, ProvisioningConfig};
use provisio::driver::{self, DriverContextRegistry, ProvisioningDriver};
use provisio::error::{Error, Result};
use provisio::installer::SshInstaller;
use provisio::output::Output;
use provisio::provision::{FailureKind, MachineProvisioner};
use provisio::registry::{HttpClusterRegistry, RegistryHandleCache};
use provisio::types::NodeAddress;
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type CliProvisioner =
    MachineProvisioner<Box<dyn ProvisioningDriver>, SshInstaller, HttpClusterRegistry>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(cli.output_mode());
    if let Err(e) = run(cli, &mut output).await {
        output.error(&e.to_string());
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(err: &Error) -> i32 {
    match err {
        Error::Provision(e) => match e.kind() {
            FailureKind::Fatal => 2,
            FailureKind::Provisioning => 1,
            FailureKind::Timeout => 3,
            FailureKind::Interrupted => 130,
        },
        Error::AgentNotFound(_) => 1,
        _ => 2,
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;

    if let Commands::Init { locator, force } = &cli.command {
        config::init_config(&cwd, locator.as_deref(), *force)?;
        output.success(&format!("Created {}", CONFIG_FILENAME));
        return Ok(());
    }

    let mut config = load_config(cli.config.as_deref(), &cwd)?;
    if let Some(template) = cli.template {
        config.template = Some(template);
    }

    if let Commands::Validate = cli.command {
        return validate(&config, output);
    }

    let contexts = DriverContextRegistry::new();
    let registries = RegistryHandleCache::new(HttpClusterRegistry::connect);
    let provisioner: CliProvisioner =
        MachineProvisioner::from_config(SshInstaller::new(), config, &contexts, &registries)?;

    match cli.command {
        Commands::Init { .. } | Commands::Validate => Ok(()),
        Commands::Capacity => {
            let capacity = provisioner.single_node_capacity()?;
            output.data("capacity", &capacity, || {
                println!("Template: {}", provisioner.template());
                println!("Memory:   {} MB", capacity.memory_mb);
                println!("Cores:    {}", capacity.cpu_cores);
            });
            Ok(())
        }
        Commands::Start { timeout } => start(&provisioner, timeout, output).await,
        Commands::Stop { address, timeout } => stop(&provisioner, &address, timeout, output).await,
        Commands::Agents => {
            let agents = provisioner.discovered_agents().await?;
            output.data("agents", &agents, || {
                if agents.is_empty() {
                    println!("No agents registered");
                }
                for agent in &agents {
                    println!(
                        "{}\t{}\t{}\t{}",
                        agent.id,
                        agent.host_address,
                        agent.host_name.as_deref().unwrap_or("-"),
                        agent.zones.join(",")
                    );
                }
            });
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>, cwd: &Path) -> Result<ProvisioningConfig> {
    match path {
        Some(path) => ProvisioningConfig::load(path),
        None => ProvisioningConfig::discover(cwd),
    }
}

fn validate(config: &ProvisioningConfig, output: &Output) -> Result<()> {
    config.validate()?;
    let name = config.template_name()?;
    let template = config.resolve_template()?;
    driver::driver_for(&config.cloud.configuration.driver)?;

    output.progress(&format!(
        "Cloud:    {} ({})",
        config.cloud.name, config.cloud.configuration.driver
    ));
    output.progress(&format!(
        "Template: {} ({} MB, {} cores)",
        name, template.machine_memory_mb, template.number_of_cores
    ));
    output.progress(&format!(
        "Locators: {}",
        config.discovery.locators_string()
    ));
    output.success("Configuration is valid");
    Ok(())
}

async fn start(provisioner: &CliProvisioner, timeout: Duration, output: &mut Output) -> Result<()> {
    let cancel = provisioner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    output.start_timer();
    output.progress(&format!(
        "Starting a {} node (timeout {})...",
        provisioner.template(),
        humantime::format_duration(timeout)
    ));

    let result = provisioner.start_node(timeout).await;
    if let Err(e) = provisioner.close().await {
        output.warning(&e.to_string());
    }
    let agent = result?;

    output.success(&format!(
        "Agent {} joined from {}",
        agent.id, agent.host_address
    ));
    Ok(())
}

async fn stop(
    provisioner: &CliProvisioner,
    address: &str,
    timeout: Duration,
    output: &mut Output,
) -> Result<()> {
    let address = NodeAddress::new(address)
        .map_err(|e| Error::InvalidConfig(format!("{address}: {e}")))?;

    let agent = provisioner
        .find_agent(&address)
        .await?
        .ok_or_else(|| Error::AgentNotFound(address.to_string()))?;

    output.start_timer();
    output.progress(&format!("Stopping agent {}...", agent));

    let report = provisioner.stop_node_with_report(&agent, timeout).await?;
    for warning in report.diagnostics.warnings() {
        output.warning(&warning.message);
    }

    if report.destroyed {
        output.success(&format!("Node {} destroyed", address));
    } else {
        output.warning(&format!("Driver declined to destroy node {}", address));
    }
    Ok(())
}
