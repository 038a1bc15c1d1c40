// ABOUTME: Errors reported by provisioning drivers.
// ABOUTME: The orchestrator wraps these, keeping the driver's message in the cause chain.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("driver is not configured: {0}")]
    NotConfigured(String),

    #[error("invalid driver configuration: {0}")]
    InvalidConfig(String),

    #[error("no capacity left: {0}")]
    NoCapacity(String),

    #[error("driver operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend error: {0}")]
    Backend(String),
}
