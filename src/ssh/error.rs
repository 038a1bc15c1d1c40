// ABOUTME: Errors from SSH sessions to provisioned nodes.
// ABOUTME: Time limits are separate variants so the installer can report them as timeouts.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("no session within {0:?}")]
    ConnectTimeout(Duration),

    #[error("node rejected every key offered for user {0}")]
    Rejected(String),

    #[error("no usable credentials: {0}")]
    NoCredentials(&'static str),

    #[error("cannot load key {path}: {reason}")]
    Key { path: PathBuf, reason: String },

    #[error("ssh agent: {0}")]
    Agent(#[from] russh::keys::Error),

    #[error("channel: {0}")]
    Channel(String),

    #[error("command still running after {0:?}")]
    CommandTimeout(Duration),

    #[error("channel closed before the command reported an exit status")]
    ChannelClosed,

    #[error(transparent)]
    Protocol(#[from] russh::Error),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ConnectTimeout(_) | Error::CommandTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
