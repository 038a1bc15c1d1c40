// ABOUTME: SSH session used to reach freshly provisioned nodes.
// ABOUTME: Handles host key checks, key/agent authentication, and bounded command execution.

use super::error::{Error, Result};
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// Default keys tried when neither a key file nor an agent is available.
const DEFAULT_KEYS: [&str; 3] = [".ssh/id_ed25519", ".ssh/id_rsa", ".ssh/id_ecdsa"];

/// How to reach a node over SSH.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Private key file. If None, the SSH agent then the default keys are tried.
    pub key_path: Option<PathBuf>,
    /// Accept and record unknown host keys. New nodes are unknown by definition,
    /// so the installer turns this on.
    pub trust_on_first_use: bool,
    /// known_hosts file; None means ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Upper bound on TCP connect plus authentication.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            connect_timeout: Duration::from_secs(30),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Result of a remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// russh client handler: verifies the node's host key.
pub(crate) struct HostKeyCheck {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl HostKeyCheck {
    fn learn(&self, key: &ssh_key::PublicKey) {
        let learned = match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            tracing::warn!(host = %self.host, "failed to record host key: {}", e);
        }
    }
}

impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let known = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match known {
            Ok(true) => Ok(true),
            // A changed key is never accepted, even with trust-on-first-use.
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::warn!(host = %self.host, port = self.port, "host key changed, refusing");
                Ok(false)
            }
            Ok(false) | Err(_) if self.trust_on_first_use => {
                tracing::warn!(
                    host = %self.host,
                    port = self.port,
                    "trust-on-first-use: accepting unknown host key"
                );
                self.learn(server_public_key);
                Ok(true)
            }
            Ok(false) | Err(_) => Ok(false),
        }
    }
}

enum Credentials {
    Agent(AgentClient<UnixStream>),
    Key(Arc<ssh_key::PrivateKey>),
}

/// An authenticated SSH session to one node.
pub struct Session {
    config: SessionConfig,
    handle: Handle<HostKeyCheck>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("user", &self.config.user)
            .finish()
    }
}

impl Session {
    /// Connect and authenticate within `config.connect_timeout`.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let limit = config.connect_timeout;
        tokio::time::timeout(limit, Self::establish(config))
            .await
            .map_err(|_| Error::ConnectTimeout(limit))?
    }

    async fn establish(config: SessionConfig) -> Result<Self> {
        let credentials = Self::credentials(&config).await?;

        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let handler = HostKeyCheck {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        };

        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        )
        .await
        .map_err(|e| Error::Connection(format!("{}:{}: {}", config.host, config.port, e)))?;

        if !Self::authenticate(&mut handle, &config.user, credentials).await? {
            return Err(Error::Rejected(config.user.clone()));
        }

        tracing::debug!(host = %config.host, user = %config.user, "ssh session established");
        Ok(Self { config, handle })
    }

    async fn credentials(config: &SessionConfig) -> Result<Credentials> {
        if let Some(key_path) = &config.key_path {
            let key = load_secret_key(key_path, None).map_err(|e| Error::Key {
                path: key_path.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Credentials::Key(Arc::new(key)));
        }

        if let Ok(agent) = AgentClient::connect_env().await {
            return Ok(Credentials::Agent(agent));
        }

        let home = std::env::var("HOME")
            .map_err(|_| Error::NoCredentials("no agent, no key file and HOME is unset"))?;
        DEFAULT_KEYS
            .iter()
            .find_map(|rel| load_secret_key(format!("{}/{}", home, rel), None).ok())
            .map(|key| Credentials::Key(Arc::new(key)))
            .ok_or(Error::NoCredentials("no agent, no key file and no default key in ~/.ssh"))
    }

    async fn authenticate(
        handle: &mut Handle<HostKeyCheck>,
        user: &str,
        credentials: Credentials,
    ) -> Result<bool> {
        match credentials {
            Credentials::Agent(mut agent) => {
                let identities = agent.request_identities().await?;
                if identities.is_empty() {
                    return Err(Error::NoCredentials("ssh agent holds no keys"));
                }

                for key in identities {
                    if let Ok(result) = handle
                        .authenticate_publickey_with(user, key, None, &mut agent)
                        .await
                        && result.success()
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Credentials::Key(key) => {
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await?
                    .flatten();
                let result = handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await?;
                Ok(result.success())
            }
        }
    }

    /// Run a shell script, giving up after `limit`.
    pub async fn run_script(&self, script: &str, limit: Duration) -> Result<CommandOutput> {
        tokio::time::timeout(limit, self.run(script))
            .await
            .map_err(|_| Error::CommandTimeout(limit))?
    }

    async fn run(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(format!("open session: {}", e)))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::Channel(format!("exec: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;
        let mut eof = false;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                // Extended data stream 1 is stderr.
                ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status);
                    if eof {
                        break;
                    }
                }
                ChannelMsg::Eof => {
                    eof = true;
                    if exit_code.is_some() {
                        break;
                    }
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        let exit_code = exit_code.ok_or(Error::ChannelClosed)?;
        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
