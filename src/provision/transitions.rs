// ABOUTME: State transition methods for node launches.
// ABOUTME: Each method consumes self and returns the next state, or itself plus the error.

use snafu::ResultExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ProvisioningConfig;
use crate::driver::ProvisioningDriver;
use crate::installer::{InstallationRequest, Installer};
use crate::registry::{AgentHandle, ClusterRegistry};
use crate::types::NodeAddress;

use super::deadline::Deadline;
use super::error::{CreateNodeSnafu, InstallationSnafu, InterruptedSnafu, ProvisionError};
use super::launch::NodeLaunch;
use super::state::{Created, Installed, Joined};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<NodeLaunch<T>, (NodeLaunch<S>, ProvisionError)>;

const PHASE_CREATE: &str = "creating node";
const PHASE_INSTALL: &str = "installing agent";
const PHASE_AWAIT: &str = "waiting for agent to join";

impl<S> NodeLaunch<S> {
    fn transition<T>(self, state: T) -> NodeLaunch<T> {
        NodeLaunch {
            node: self.node,
            address: self.address,
            deadline: self.deadline,
            state,
        }
    }
}

// =============================================================================
// driver -> Created
// =============================================================================

impl NodeLaunch<Created> {
    /// Ask the driver for a node.
    ///
    /// Nothing exists yet if this fails, so the error is returned as is.
    /// A request that is already cancelled never reaches the driver.
    pub async fn create<D: ProvisioningDriver + ?Sized>(
        driver: &D,
        connect_to_private_ip: bool,
        deadline: Deadline,
        cancel: &CancellationToken,
    ) -> Result<Self, ProvisionError> {
        if cancel.is_cancelled() {
            return InterruptedSnafu { phase: PHASE_CREATE }.fail();
        }
        let timeout = deadline.time_left(PHASE_CREATE)?;
        let node = driver.create_node(timeout).await.context(CreateNodeSnafu)?;
        let address = node.select_address(connect_to_private_ip).cloned();

        tracing::info!(
            node = %node,
            address = address.as_ref().map(NodeAddress::as_str),
            "node created"
        );

        Ok(NodeLaunch {
            node,
            address,
            deadline,
            state: Created,
        })
    }

    /// Install and start the agent, unless the node already runs one.
    #[must_use = "launch state must be used"]
    pub async fn install<I: Installer + ?Sized>(
        self,
        installer: &I,
        config: &ProvisioningConfig,
        cancel: &CancellationToken,
    ) -> TransitionResult<Installed, Created> {
        if let Err(e) = self.deadline.check(PHASE_CREATE) {
            return Err((self, e));
        }

        if self.node.agent_running {
            tracing::info!("agent already running on node, skipping installation");
            return Ok(self.transition(Installed));
        }

        let request = match self.installation_request(config) {
            Ok(request) => request,
            Err(e) => return Err((self, e)),
        };

        match run_installer(installer, &request, &self.deadline, cancel).await {
            Ok(()) => Ok(self.transition(Installed)),
            Err(e) => Err((self, e)),
        }
    }

    fn installation_request(
        &self,
        config: &ProvisioningConfig,
    ) -> Result<InstallationRequest, ProvisionError> {
        let address = self
            .address
            .as_ref()
            .ok_or_else(|| ProvisionError::configuration("node has no usable address"))?;
        InstallationRequest::build(&self.node, address, config)
            .map_err(ProvisionError::configuration)
    }
}

async fn run_installer<I: Installer + ?Sized>(
    installer: &I,
    request: &InstallationRequest,
    deadline: &Deadline,
    cancel: &CancellationToken,
) -> Result<(), ProvisionError> {
    let remaining = deadline.time_left(PHASE_INSTALL)?;
    tracing::info!(address = %request.address, remaining = ?remaining, "installing agent");

    let install = tokio::time::timeout(remaining, installer.install(request, remaining));
    tokio::select! {
        _ = cancel.cancelled() => InterruptedSnafu { phase: PHASE_INSTALL }.fail(),
        outcome = install => match outcome {
            Ok(result) => result.context(InstallationSnafu {
                address: request.address.clone(),
            }),
            Err(_) => Err(deadline.expired(PHASE_INSTALL)),
        },
    }
}

// =============================================================================
// Installed -> Joined
// =============================================================================

impl NodeLaunch<Installed> {
    /// Poll the registry until the node's agent registers.
    #[must_use = "launch state must be used"]
    pub async fn await_agent<R: ClusterRegistry + ?Sized>(
        self,
        registry: &R,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> TransitionResult<Joined, Installed> {
        if let Err(e) = self.deadline.check(PHASE_INSTALL) {
            return Err((self, e));
        }

        let Some(address) = self.address.clone() else {
            let err = ProvisionError::configuration(format!(
                "node {} reported no usable address",
                self.node
            ));
            return Err((self, err));
        };

        match wait_for_agent(registry, &address, &self.deadline, poll_interval, cancel).await {
            Ok(agent) => Ok(self.transition(Joined { agent })),
            Err(e) => Err((self, e)),
        }
    }
}

/// Poll `registry` for an agent at `address` until one appears or `deadline` passes.
///
/// Sleeps `interval` between lookups, clamped to the time remaining. An
/// already expired deadline means no lookup at all. Lookup failures count as
/// "not yet".
pub async fn wait_for_agent<R: ClusterRegistry + ?Sized>(
    registry: &R,
    address: &NodeAddress,
    deadline: &Deadline,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<AgentHandle, ProvisionError> {
    let mut attempt: u32 = 0;

    while !deadline.is_expired() {
        attempt += 1;

        let find = tokio::time::timeout(
            deadline.remaining(),
            registry.find_agent_by_address(address),
        );
        let lookup = tokio::select! {
            _ = cancel.cancelled() => return InterruptedSnafu { phase: PHASE_AWAIT }.fail(),
            lookup = find => lookup,
        };

        match lookup {
            Ok(Ok(Some(agent))) => {
                tracing::info!(agent = %agent, attempt, "agent joined the cluster");
                return Ok(agent);
            }
            Ok(Ok(None)) => tracing::debug!(%address, attempt, "agent not registered yet"),
            Ok(Err(e)) => tracing::warn!(%address, attempt, "registry lookup failed: {}", e),
            Err(_) => break,
        }

        let pause = interval.min(deadline.remaining());
        tokio::select! {
            _ = cancel.cancelled() => return InterruptedSnafu { phase: PHASE_AWAIT }.fail(),
            _ = tokio::time::sleep(pause) => {}
        }
    }

    tracing::warn!(%address, attempts = attempt, "agent did not join before the deadline");
    Err(deadline.expired(PHASE_AWAIT))
}
