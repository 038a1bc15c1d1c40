// ABOUTME: Details of a machine returned by a provisioning driver.
// ABOUTME: Immutable for the rest of the lifecycle call that created it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::types::{MachineId, NodeAddress};

/// A freshly provisioned machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDetails {
    /// Driver-assigned identifier, if the backend has one.
    pub machine_id: Option<MachineId>,
    pub public_address: Option<NodeAddress>,
    pub private_address: Option<NodeAddress>,
    /// The image already runs a management agent; installation is skipped.
    pub agent_running: bool,
    /// Login user for installation, overriding the cloud default.
    pub remote_username: Option<String>,
    /// Private key for installation, overriding the cloud default.
    pub key_file: Option<PathBuf>,
    /// Anything else the driver wants to report.
    pub metadata: BTreeMap<String, String>,
}

impl NodeDetails {
    /// A node reachable at the same address publicly and privately.
    pub fn at(address: NodeAddress) -> Self {
        Self {
            public_address: Some(address.clone()),
            private_address: Some(address),
            ..Self::default()
        }
    }

    pub fn with_agent_running(mut self, running: bool) -> Self {
        self.agent_running = running;
        self
    }

    /// The address the rest of the lifecycle uses.
    pub fn select_address(&self, connect_to_private_ip: bool) -> Option<&NodeAddress> {
        if connect_to_private_ip {
            self.private_address.as_ref()
        } else {
            self.public_address.as_ref()
        }
    }
}

impl fmt::Display for NodeDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_none<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map(T::to_string).unwrap_or_else(|| "-".to_string())
        }
        write!(
            f,
            "[id={} public={} private={} agent_running={}]",
            or_none(&self.machine_id),
            or_none(&self.public_address),
            or_none(&self.private_address),
            self.agent_running
        )
    }
}
