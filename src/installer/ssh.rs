// ABOUTME: Installer that runs the template's install command over SSH.
// ABOUTME: Connection and command share the caller's remaining time.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

use super::{InstallError, InstallationRequest, Installer};
use crate::ssh::{self, Session, SessionConfig};

/// Installs the agent by executing [`InstallationRequest::script`] on the node.
#[derive(Debug, Clone)]
pub struct SshInstaller {
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl Default for SshInstaller {
    fn default() -> Self {
        Self {
            trust_on_first_use: true,
            known_hosts_path: None,
        }
    }
}

impl SshInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    fn session_config(&self, request: &InstallationRequest, timeout: Duration) -> SessionConfig {
        let mut config = SessionConfig::new(request.address.as_str(), &request.username)
            .port(request.ssh_port)
            .trust_on_first_use(self.trust_on_first_use)
            .connect_timeout(timeout);
        if let Some(key) = &request.key_file {
            config = config.key_path(key);
        }
        if let Some(known_hosts) = &self.known_hosts_path {
            config = config.known_hosts_path(known_hosts);
        }
        config
    }
}

fn classify(err: ssh::Error, address: &str, limit: Duration) -> InstallError {
    match err {
        e if e.is_timeout() => InstallError::Timeout(limit),
        ssh::Error::Connection(reason) => InstallError::Connection {
            address: address.to_string(),
            reason,
        },
        other => InstallError::Ssh(other),
    }
}

#[async_trait]
impl Installer for SshInstaller {
    async fn install(
        &self,
        request: &InstallationRequest,
        timeout: Duration,
    ) -> Result<(), InstallError> {
        let deadline = Instant::now() + timeout;
        let address = request.address.as_str();

        tracing::info!(
            address,
            user = %request.username,
            directory = %request.remote_directory,
            "installing agent over ssh"
        );

        let session = Session::connect(self.session_config(request, timeout))
            .await
            .map_err(|e| classify(e, address, timeout))?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            if let Err(e) = session.disconnect().await {
                tracing::warn!(address, "ssh disconnect after connect timeout failed: {}", e);
            }
            return Err(InstallError::Timeout(timeout));
        }

        let output = session.run_script(&request.script(), remaining).await;

        if let Err(e) = session.disconnect().await {
            tracing::warn!(address, "ssh disconnect after install failed: {}", e);
        }

        let output = output.map_err(|e| classify(e, address, timeout))?;
        if !output.success() {
            return Err(InstallError::CommandFailed {
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        tracing::info!(address, "agent installation finished");
        Ok(())
    }
}
