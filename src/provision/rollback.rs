// ABOUTME: Best-effort unwinding of a node launch that failed part way.
// ABOUTME: Shuts down any agent, destroys the node, and reports problems as warnings.

use std::time::Duration;

use crate::diagnostics::{Diagnostics, Warning};
use crate::driver::ProvisioningDriver;
use crate::registry::ClusterRegistry;

use super::launch::NodeLaunch;

impl<S> NodeLaunch<S> {
    /// Undo everything this launch created.
    ///
    /// Runs to completion whatever fails along the way. The agent shutdown is
    /// advisory; the node is always handed to the driver for destruction,
    /// bounded by `cleanup_timeout` rather than the request deadline.
    pub async fn rollback<D, R>(
        self,
        driver: &D,
        registry: &R,
        cleanup_timeout: Duration,
    ) -> Diagnostics
    where
        D: ProvisioningDriver + ?Sized,
        R: ClusterRegistry + ?Sized,
    {
        let mut diagnostics = Diagnostics::default();
        tracing::info!(node = %self.node, "rolling back node launch");

        if let Some(address) = &self.address {
            let lookup =
                tokio::time::timeout(cleanup_timeout, registry.find_agent_by_address(address))
                    .await;
            match lookup {
                Ok(Ok(Some(agent))) => {
                    match tokio::time::timeout(cleanup_timeout, registry.shutdown_agent(&agent))
                        .await
                    {
                        Ok(Ok(())) => tracing::info!(agent = %agent, "agent shut down"),
                        Ok(Err(e)) => diagnostics.warn(Warning::agent_shutdown(format!(
                            "failed to shut down agent {}: {}",
                            agent, e
                        ))),
                        Err(_) => diagnostics.warn(Warning::agent_shutdown(format!(
                            "shutting down agent {} timed out after {:?}",
                            agent, cleanup_timeout
                        ))),
                    }
                }
                Ok(Ok(None)) => tracing::debug!(%address, "no agent registered on node"),
                Ok(Err(e)) => diagnostics.warn(Warning::agent_shutdown(format!(
                    "agent lookup on {} failed: {}",
                    address, e
                ))),
                Err(_) => diagnostics.warn(Warning::agent_shutdown(format!(
                    "agent lookup on {} timed out after {:?}",
                    address, cleanup_timeout
                ))),
            }
        }

        let Some(target) = self.destroy_target() else {
            diagnostics.warn(Warning::node_destroy(format!(
                "node {} has no address; it cannot be destroyed",
                self.node
            )));
            return diagnostics;
        };

        let destroyed =
            tokio::time::timeout(cleanup_timeout, driver.destroy_node(target, cleanup_timeout))
                .await;
        match destroyed {
            Ok(Ok(true)) => tracing::info!(address = %target, "node destroyed"),
            Ok(Ok(false)) => diagnostics.warn(Warning::node_destroy(format!(
                "driver declined to destroy node {}",
                target
            ))),
            Ok(Err(e)) => diagnostics.warn(Warning::node_destroy(format!(
                "failed to destroy node {}: {}",
                target, e
            ))),
            Err(_) => diagnostics.warn(Warning::node_destroy(format!(
                "destroying node {} timed out after {:?}",
                target, cleanup_timeout
            ))),
        }

        diagnostics
    }
}
