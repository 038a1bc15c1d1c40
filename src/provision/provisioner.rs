// ABOUTME: Machine provisioner driving one node at a time through driver, installer and registry.
// ABOUTME: Owns the request deadline, the cancellation token and rollback on failure.

use snafu::ResultExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::ProvisioningConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::driver::{self, DriverContextRegistry, ProvisioningDriver};
use crate::installer::Installer;
use crate::registry::{AgentHandle, ClusterRegistry, RegistryHandleCache};
use crate::types::{NodeAddress, NodeCapacity};

use super::deadline::Deadline;
use super::error::{CloseDriverSnafu, DestroyNodeSnafu, ProvisionError};
use super::launch::NodeLaunch;


/// Outcome of [`MachineProvisioner::stop_node_with_report`].
#[derive(Debug)]
pub struct StopReport {
    /// What the driver answered to the destroy request.
    pub destroyed: bool,
    /// Advisory steps that failed along the way.
    pub diagnostics: Diagnostics,
}

/// Starts and stops nodes of one cloud template.
///
/// Generic over the three collaborators so each can be swapped for a fake.
/// The registry handle is shared process-wide through a [`RegistryHandleCache`].
pub struct MachineProvisioner<D, I, R> {
    driver: D,
    installer: I,
    registry: Arc<R>,
    config: ProvisioningConfig,
    template: String,
    cancel: CancellationToken,
    span: tracing::Span,
}

impl<D, I, R> std::fmt::Debug for MachineProvisioner<D, I, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineProvisioner")
            .field("cloud", &self.config.cloud.name)
            .field("template", &self.template)
            .field("zones", &self.config.zones)
            .finish_non_exhaustive()
    }
}

impl<I, R> MachineProvisioner<Box<dyn ProvisioningDriver>, I, R>
where
    I: Installer,
    R: ClusterRegistry,
{
    /// Set up with the driver named in the cloud configuration.
    pub fn from_config(
        installer: I,
        config: ProvisioningConfig,
        contexts: &DriverContextRegistry,
        registries: &RegistryHandleCache<R>,
    ) -> Result<Self, ProvisionError> {
        let driver = driver::driver_for(&config.cloud.configuration.driver)
            .map_err(ProvisionError::configuration)?;
        Self::setup(driver, installer, config, contexts, registries)
    }
}

impl<D, I, R> MachineProvisioner<D, I, R>
where
    D: ProvisioningDriver,
    I: Installer,
    R: ClusterRegistry,
{
    /// Bind `driver` to the configured template and attach the shared registry.
    ///
    /// Fails fast with a fatal error when the template is unset or unknown.
    pub fn setup(
        mut driver: D,
        installer: I,
        config: ProvisioningConfig,
        contexts: &DriverContextRegistry,
        registries: &RegistryHandleCache<R>,
    ) -> Result<Self, ProvisionError> {
        config.validate().map_err(ProvisionError::configuration)?;
        let template = config
            .template_name()
            .map_err(ProvisionError::configuration)?
            .to_string();
        config
            .resolve_template()
            .map_err(ProvisionError::configuration)?;

        driver.bind_context(contexts.get_or_create(driver.driver_name()));
        driver
            .bind_config(&config.cloud, &template)
            .map_err(ProvisionError::configuration)?;

        let registry = registries.get_or_create(&config.discovery)?;

        let span = tracing::info_span!(
            "provisioner",
            cloud = %config.cloud.name,
            template = %template,
            zones = %config.zones.join(",")
        );
        span.in_scope(|| {
            tracing::info!(
                driver = driver.driver_name(),
                locators = %config.discovery.locators_string(),
                "provisioner ready"
            )
        });

        Ok(Self {
            driver,
            installer,
            registry,
            config,
            template,
            cancel: CancellationToken::new(),
            span,
        })
    }

    /// Replace the cancellation token, e.g. with a child of a process-wide one.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that interrupts in-flight requests when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Provision one node and wait until its agent joins the cluster.
    ///
    /// Any failure after the driver created the node rolls the node back
    /// before the error is returned.
    pub async fn start_node(&self, budget: Duration) -> Result<AgentHandle, ProvisionError> {
        self.launch(budget).instrument(self.span.clone()).await
    }

    async fn launch(&self, budget: Duration) -> Result<AgentHandle, ProvisionError> {
        let deadline = Deadline::after(budget);
        tracing::info!(budget = ?budget, deadline = %deadline, "starting node");

        let created = NodeLaunch::create(
            &self.driver,
            self.config.cloud.configuration.connect_to_private_ip,
            deadline,
            &self.cancel,
        )
        .await?;

        let installed = match created
            .install(&self.installer, &self.config, &self.cancel)
            .await
        {
            Ok(launch) => launch,
            Err((launch, err)) => return Err(self.unwind(launch, err).await),
        };

        let joined = match installed
            .await_agent(&*self.registry, self.config.poll_interval, &self.cancel)
            .await
        {
            Ok(launch) => launch,
            Err((launch, err)) => return Err(self.unwind(launch, err).await),
        };

        Ok(joined.finish())
    }

    async fn unwind<S>(&self, launch: NodeLaunch<S>, err: ProvisionError) -> ProvisionError {
        tracing::warn!(error = %err, kind = ?err.kind(), "node start failed, rolling back");
        let diagnostics = launch
            .rollback(&self.driver, &*self.registry, self.config.cleanup_timeout)
            .await;
        if diagnostics.has_warnings() {
            tracing::warn!(
                warnings = diagnostics.warnings().len(),
                "rollback finished with warnings"
            );
        }
        err
    }

    /// Shut down `agent` and destroy its node, returning the driver's answer.
    pub async fn stop_node(
        &self,
        agent: &AgentHandle,
        budget: Duration,
    ) -> Result<bool, ProvisionError> {
        Ok(self.stop_node_with_report(agent, budget).await?.destroyed)
    }

    /// Like [`Self::stop_node`], also returning the advisory failures.
    pub async fn stop_node_with_report(
        &self,
        agent: &AgentHandle,
        budget: Duration,
    ) -> Result<StopReport, ProvisionError> {
        self.decommission(agent, budget)
            .instrument(self.span.clone())
            .await
    }

    async fn decommission(
        &self,
        agent: &AgentHandle,
        budget: Duration,
    ) -> Result<StopReport, ProvisionError> {
        let deadline = Deadline::after(budget);
        let address = agent.host_address.clone();
        let mut diagnostics = Diagnostics::default();
        tracing::info!(agent = %agent, deadline = %deadline, "stopping node");

        let advisory = advisory_limit(deadline.remaining(), self.config.cleanup_timeout);
        let shutdown = tokio::time::timeout(advisory, self.registry.shutdown_agent(agent)).await;
        match shutdown {
            Ok(Ok(())) => {}
            Ok(Err(e)) => diagnostics.warn(Warning::agent_shutdown(format!(
                "failed to shut down agent {}: {}",
                agent, e
            ))),
            Err(_) => diagnostics.warn(Warning::agent_shutdown(format!(
                "agent {} did not acknowledge shutdown within {:?}",
                agent, advisory
            ))),
        }

        // The node is destroyed even when the budget is already spent.
        let remaining = match deadline.remaining() {
            left if left.is_zero() => self.config.cleanup_timeout,
            left => left,
        };
        let destroyed = self
            .driver
            .destroy_node(&address, remaining)
            .await
            .context(DestroyNodeSnafu {
                address: address.clone(),
            })?;

        tracing::info!(%address, destroyed, "node stop finished");
        Ok(StopReport {
            destroyed,
            diagnostics,
        })
    }

    /// Memory and cores of one node of the bound template.
    pub fn single_node_capacity(&self) -> Result<NodeCapacity, ProvisionError> {
        let template = self
            .config
            .resolve_template()
            .map_err(ProvisionError::configuration)?;
        Ok(NodeCapacity::new(
            template.machine_memory_mb,
            template.number_of_cores,
        ))
    }

    /// Every agent the registry currently knows about.
    pub async fn discovered_agents(&self) -> Result<Vec<AgentHandle>, ProvisionError> {
        Ok(self.registry.list_agents().await?)
    }

    /// The agent running at `address`, if any.
    pub async fn find_agent(
        &self,
        address: &NodeAddress,
    ) -> Result<Option<AgentHandle>, ProvisionError> {
        Ok(self.registry.find_agent_by_address(address).await?)
    }

    /// Interrupt every in-flight request of this provisioner.
    ///
    /// Permanent: later calls to [`Self::start_node`] fail with `Interrupted`
    /// before asking the driver for a node.
    pub fn interrupt(&self) {
        self.cancel.cancel();
    }

    /// Close the driver. The shared registry handle stays open for other provisioners.
    pub async fn close(&self) -> Result<(), ProvisionError> {
        self.driver.close().await.context(CloseDriverSnafu)
    }
}

/// Time the advisory agent shutdown may take out of a stop budget.
///
/// At most half of what is left, so the driver always gets the other half.
fn advisory_limit(remaining: Duration, cleanup_timeout: Duration) -> Duration {
    (remaining / 2).min(cleanup_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_shutdown_takes_at_most_half_the_budget() {
        let cleanup = Duration::from_secs(300);
        assert_eq!(
            advisory_limit(Duration::from_secs(60), cleanup),
            Duration::from_secs(30)
        );
        assert_eq!(advisory_limit(Duration::from_secs(3600), cleanup), cleanup);
        assert_eq!(advisory_limit(Duration::ZERO, cleanup), Duration::ZERO);
    }
}
