// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use provisio::output::OutputMode;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "provisio")]
#[command(about = "Provision cluster nodes, install their agents, and roll back on failure")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: discovered in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Template to use instead of the one named in the configuration
    #[arg(short, long, global = true)]
    pub template: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new provisio.yml configuration file
    Init {
        /// Discovery locator of the cluster registry (host[:port])
        #[arg(short, long)]
        locator: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Check the configuration and the selected template
    Validate,

    /// Show the memory and cores of a single node
    Capacity,

    /// Provision one node and wait for its agent to join
    Start {
        /// Time allowed for create, install and join
        #[arg(long, default_value = "10m", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },

    /// Shut down the agent at an address and destroy its node
    Stop {
        /// Address or host name of the node
        address: String,

        /// Time allowed for shutdown and destroy
        #[arg(long, default_value = "5m", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },

    /// List agents known to the cluster registry
    Agents,
}
