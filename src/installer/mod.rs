// ABOUTME: Installer capability trait and the SSH-based implementation.
// ABOUTME: An installer puts the cluster agent on a fresh node and starts it.

mod request;
mod ssh;

pub use request::{
    ENV_GROUPS, ENV_LOCATORS, ENV_MACHINE_IP, ENV_PRIVATE_IP, ENV_PUBLIC_IP, ENV_WORKING_DIR,
    ENV_ZONES, InstallationRequest,
};
pub use ssh::SshInstaller;

use async_trait::async_trait;
use std::time::Duration;

/// Installs and starts the management agent on a node.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install within `timeout`. Callers never pass a zero timeout.
    async fn install(
        &self,
        request: &InstallationRequest,
        timeout: Duration,
    ) -> Result<(), InstallError>;
}

/// Errors from agent installation.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("failed to connect to {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("install command exited with status {exit_code}: {stderr}")]
    CommandFailed { exit_code: u32, stderr: String },

    #[error("installation timed out after {0:?}")]
    Timeout(Duration),

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),
}
