// ABOUTME: Provisioning driver capability trait and built-in drivers.
// ABOUTME: A driver creates and destroys machines for one infrastructure backend.

mod context;
mod error;
mod node;
mod static_pool;

pub use context::{DriverContext, DriverContextRegistry};
pub use error::ProvisioningError;
pub use node::NodeDetails;
pub use static_pool::{STATIC_POOL_DRIVER, StaticPoolDriver};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Cloud;
use crate::types::NodeAddress;

/// Creates and destroys nodes for a specific infrastructure backend.
///
/// Retry and backoff against the backend are the driver's business; the
/// orchestrator calls each operation exactly once.
#[async_trait]
pub trait ProvisioningDriver: Send + Sync {
    /// Identity used to key the shared [`DriverContext`].
    fn driver_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Receive the context shared by all instances of this driver.
    fn bind_context(&mut self, _context: Arc<DriverContext>) {}

    /// Bind the cloud descriptor and the template nodes are created from.
    fn bind_config(&mut self, cloud: &Cloud, template: &str) -> Result<(), ProvisioningError>;

    /// Create a node within `timeout`.
    async fn create_node(&self, timeout: Duration) -> Result<NodeDetails, ProvisioningError>;

    /// Destroy the node at `address`. `Ok(false)` means the backend declined.
    async fn destroy_node(
        &self,
        address: &NodeAddress,
        timeout: Duration,
    ) -> Result<bool, ProvisioningError>;

    /// Release driver resources.
    async fn close(&self) -> Result<(), ProvisioningError> {
        Ok(())
    }
}

#[async_trait]
impl<T: ProvisioningDriver + ?Sized> ProvisioningDriver for Box<T> {
    fn driver_name(&self) -> &'static str {
        (**self).driver_name()
    }

    fn bind_context(&mut self, context: Arc<DriverContext>) {
        (**self).bind_context(context)
    }

    fn bind_config(&mut self, cloud: &Cloud, template: &str) -> Result<(), ProvisioningError> {
        (**self).bind_config(cloud, template)
    }

    async fn create_node(&self, timeout: Duration) -> Result<NodeDetails, ProvisioningError> {
        (**self).create_node(timeout).await
    }

    async fn destroy_node(
        &self,
        address: &NodeAddress,
        timeout: Duration,
    ) -> Result<bool, ProvisioningError> {
        (**self).destroy_node(address, timeout).await
    }

    async fn close(&self) -> Result<(), ProvisioningError> {
        (**self).close().await
    }
}

/// Instantiate a built-in driver by its configured name.
pub fn driver_for(name: &str) -> crate::error::Result<Box<dyn ProvisioningDriver>> {
    match name {
        STATIC_POOL_DRIVER => Ok(Box::new(StaticPoolDriver::new())),
        other => Err(crate::error::Error::UnknownDriver(other.to_string())),
    }
}
