// ABOUTME: Generic node launch struct parameterized by state marker.
// ABOUTME: Carries the node, its selected address and the request deadline through every phase.

use crate::driver::NodeDetails;
use crate::registry::AgentHandle;
use crate::types::NodeAddress;

use super::deadline::Deadline;
use super::state::Joined;

/// One node on its way into the cluster, parameterized by its current state.
///
/// Every state keeps the [`NodeDetails`] returned by the driver so a failure
/// at any point can unwind what exists so far.
#[derive(Debug)]
pub struct NodeLaunch<S> {
    pub(crate) node: NodeDetails,
    pub(crate) address: Option<NodeAddress>,
    pub(crate) deadline: Deadline,
    pub(crate) state: S,
}

impl<S> NodeLaunch<S> {
    /// Details reported by the driver.
    pub fn node(&self) -> &NodeDetails {
        &self.node
    }

    /// Address the orchestrator talks to, private or public per the cloud.
    pub fn address(&self) -> Option<&NodeAddress> {
        self.address.as_ref()
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Address handed to the driver when the node must go away.
    pub(crate) fn destroy_target(&self) -> Option<&NodeAddress> {
        self.address
            .as_ref()
            .or(self.node.private_address.as_ref())
            .or(self.node.public_address.as_ref())
    }
}

impl NodeLaunch<Joined> {
    pub fn agent(&self) -> &AgentHandle {
        &self.state.agent
    }

    /// Finish the launch, handing the registered agent to the caller.
    pub fn finish(self) -> AgentHandle {
        self.state.agent
    }
}
