// ABOUTME: Cluster registry capability trait and agent handles.
// ABOUTME: The registry is where installed agents announce themselves.

mod cache;
mod http;

pub use crate::config::DiscoverySeed;
pub use cache::RegistryHandleCache;
pub use http::HttpClusterRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AgentId, NodeAddress};

/// An agent discovered through the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHandle {
    pub id: AgentId,
    pub host_address: NodeAddress,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub zones: Vec<String>,
}

impl AgentHandle {
    pub fn new(id: impl Into<String>, host_address: NodeAddress) -> Self {
        Self {
            id: AgentId::new(id),
            host_address,
            host_name: None,
            zones: Vec::new(),
        }
    }

    /// Whether this agent runs on the node known as `address` (IP or host name).
    pub fn matches(&self, address: &NodeAddress) -> bool {
        &self.host_address == address || self.host_name.as_deref() == Some(address.as_str())
    }
}

impl fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.host_address)
    }
}

/// Read access to cluster membership, plus agent shutdown.
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    /// Every agent currently registered.
    async fn list_agents(&self) -> Result<Vec<AgentHandle>, RegistryError>;

    /// The agent running on `address`, if one has registered.
    async fn find_agent_by_address(
        &self,
        address: &NodeAddress,
    ) -> Result<Option<AgentHandle>, RegistryError> {
        Ok(self
            .list_agents()
            .await?
            .into_iter()
            .find(|agent| agent.matches(address)))
    }

    /// Ask the agent to shut down.
    async fn shutdown_agent(&self, agent: &AgentHandle) -> Result<(), RegistryError>;
}

/// Errors from registry lookups and agent shutdown.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no discovery locators configured")]
    NoLocators,

    #[error("registry at {locator} unreachable: {reason}")]
    Unreachable { locator: String, reason: String },

    #[error("registry at {locator} answered {status}: {body}")]
    Status {
        locator: String,
        status: u16,
        body: String,
    },

    #[error("malformed registry response: {0}")]
    Decode(String),

    #[error("registry request timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_by_address_or_host_name() {
        let mut agent = AgentHandle::new("gsa-1", NodeAddress::new("10.0.0.5").unwrap());
        agent.host_name = Some("node-5.internal".to_string());

        assert!(agent.matches(&NodeAddress::new("10.0.0.5").unwrap()));
        assert!(agent.matches(&NodeAddress::new("node-5.internal").unwrap()));
        assert!(!agent.matches(&NodeAddress::new("10.0.0.6").unwrap()));
    }

    #[test]
    fn decodes_registry_listing() {
        let json = r#"[{"id":"a1","host_address":"10.0.0.5","zones":["web"]}]"#;
        let agents: Vec<AgentHandle> = serde_json::from_str(json).unwrap();
        assert_eq!(agents[0].id.as_str(), "a1");
        assert_eq!(agents[0].host_name, None);
        assert_eq!(agents[0].zones, vec!["web".to_string()]);
    }
}
