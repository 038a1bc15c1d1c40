// ABOUTME: Unified failure type for node lifecycle operations, SNAFU style.
// ABOUTME: Callers branch on kind() to tell configuration faults from timeouts and interrupts.

use chrono::{DateTime, Utc};
use snafu::Snafu;

use crate::driver::ProvisioningError;
use crate::installer::InstallError;
use crate::registry::RegistryError;
use crate::types::NodeAddress;

/// The single terminal error of a start or stop request.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProvisionError {
    #[snafu(display("configuration error: {message}"))]
    Configuration { message: String },

    #[snafu(display("failed to create node: {source}"))]
    CreateNode { source: ProvisioningError },

    #[snafu(display("failed to destroy node {address}: {source}"))]
    DestroyNode {
        address: NodeAddress,
        source: ProvisioningError,
    },

    #[snafu(display("failed to close driver: {source}"))]
    CloseDriver { source: ProvisioningError },

    #[snafu(display("failed to install agent on {address}: {source}"))]
    Installation {
        address: NodeAddress,
        source: InstallError,
    },

    #[snafu(display("cluster registry failure: {source}"))]
    Registry { source: RegistryError },

    #[snafu(display("timed out while {phase} (deadline {deadline})"))]
    Timeout {
        phase: &'static str,
        deadline: DateTime<Utc>,
    },

    #[snafu(display("interrupted while {phase}"))]
    Interrupted { phase: &'static str },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad or missing configuration. Retrying will not help.
    Fatal,
    /// The driver, installer or registry failed.
    Provisioning,
    /// The request's deadline passed.
    Timeout,
    /// The request was cancelled.
    Interrupted,
}

impl ProvisionError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> FailureKind {
        match self {
            ProvisionError::Configuration { .. } => FailureKind::Fatal,
            ProvisionError::CreateNode { .. }
            | ProvisionError::DestroyNode { .. }
            | ProvisionError::CloseDriver { .. }
            | ProvisionError::Installation { .. }
            | ProvisionError::Registry { .. } => FailureKind::Provisioning,
            ProvisionError::Timeout { .. } => FailureKind::Timeout,
            ProvisionError::Interrupted { .. } => FailureKind::Interrupted,
        }
    }

    pub(crate) fn configuration(message: impl std::fmt::Display) -> Self {
        ProvisionError::Configuration {
            message: message.to_string(),
        }
    }
}

impl From<RegistryError> for ProvisionError {
    fn from(source: RegistryError) -> Self {
        ProvisionError::Registry { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            ProvisionError::configuration("template missing").kind(),
            FailureKind::Fatal
        );
        assert_eq!(
            ProvisionError::CreateNode {
                source: ProvisioningError::NoCapacity("pool".into())
            }
            .kind(),
            FailureKind::Provisioning
        );
        assert_eq!(
            ProvisionError::Installation {
                address: NodeAddress::new("10.0.0.1").unwrap(),
                source: InstallError::Timeout(Duration::from_secs(1)),
            }
            .kind(),
            FailureKind::Provisioning
        );
        assert_eq!(
            ProvisionError::Interrupted { phase: "polling" }.kind(),
            FailureKind::Interrupted
        );
    }

    #[test]
    fn cause_chain_keeps_driver_message() {
        let err = ProvisionError::CreateNode {
            source: ProvisioningError::Backend("quota exceeded".into()),
        };
        assert!(err.to_string().contains("quota exceeded"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
