// ABOUTME: Bring-your-own-node driver backed by a fixed list of hosts.
// ABOUTME: The allocation table lives in the driver context, shared by every instance.

use async_trait::async_trait;
use nonempty::NonEmpty;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use super::{DriverContext, NodeDetails, ProvisioningDriver, ProvisioningError};
use crate::config::Cloud;
use crate::types::{MachineId, NodeAddress};

pub const STATIC_POOL_DRIVER: &str = "static-pool";

/// Template `custom` key holding the host list.
const NODES_KEY: &str = "nodes";

/// A host of the pool, optionally with its own login user (`user@host`).
#[derive(Debug, Clone, PartialEq, Eq)]
struct PoolNode {
    address: NodeAddress,
    user: Option<String>,
}

impl PoolNode {
    fn parse(entry: &str) -> Result<Self, String> {
        let entry = entry.trim();
        let (user, host) = match entry.split_once('@') {
            Some((user, host)) if !user.is_empty() => (Some(user.to_string()), host),
            Some(_) => return Err(format!("empty user in pool entry: {}", entry)),
            None => (None, entry),
        };
        let address = NodeAddress::new(host).map_err(|e| format!("{}: {}", entry, e))?;
        Ok(Self { address, user })
    }
}

/// Free and allocated hosts of one template.
#[derive(Debug)]
struct NodePool {
    free: VecDeque<PoolNode>,
    allocated: HashMap<NodeAddress, PoolNode>,
}

impl NodePool {
    fn new(nodes: &NonEmpty<PoolNode>) -> Self {
        Self {
            free: nodes.iter().cloned().collect(),
            allocated: HashMap::new(),
        }
    }

    fn allocate(&mut self) -> Option<PoolNode> {
        let node = self.free.pop_front()?;
        self.allocated.insert(node.address.clone(), node.clone());
        Some(node)
    }

    fn release(&mut self, address: &NodeAddress) -> bool {
        match self.allocated.remove(address) {
            Some(node) => {
                self.free.push_back(node);
                true
            }
            None => false,
        }
    }
}

/// Hands out hosts from the template's `custom.nodes` list.
#[derive(Debug, Default)]
pub struct StaticPoolDriver {
    context: Option<Arc<DriverContext>>,
    pool: Option<Arc<Mutex<NodePool>>>,
}

impl StaticPoolDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn pool(&self) -> Result<&Arc<Mutex<NodePool>>, ProvisioningError> {
        self.pool.as_ref().ok_or_else(|| {
            ProvisioningError::NotConfigured("static pool has no template bound".to_string())
        })
    }

    /// Number of hosts currently free.
    pub fn available(&self) -> usize {
        self.pool.as_ref().map(|p| p.lock().free.len()).unwrap_or(0)
    }
}

fn parse_nodes(value: &serde_yaml::Value) -> Result<NonEmpty<PoolNode>, ProvisioningError> {
    let entries: NonEmpty<String> = serde_yaml::from_value(value.clone()).map_err(|e| {
        ProvisioningError::InvalidConfig(format!(
            "custom.{} must be a non-empty list: {}",
            NODES_KEY, e
        ))
    })?;

    let nodes = entries
        .iter()
        .map(|entry| PoolNode::parse(entry))
        .collect::<Result<Vec<_>, _>>()
        .map_err(ProvisioningError::InvalidConfig)?;

    NonEmpty::from_vec(nodes).ok_or_else(|| {
        ProvisioningError::InvalidConfig(format!("custom.{} cannot be empty", NODES_KEY))
    })
}

#[async_trait]
impl ProvisioningDriver for StaticPoolDriver {
    fn driver_name(&self) -> &'static str {
        STATIC_POOL_DRIVER
    }

    fn bind_context(&mut self, context: Arc<DriverContext>) {
        self.context = Some(context);
    }

    fn bind_config(&mut self, cloud: &Cloud, template: &str) -> Result<(), ProvisioningError> {
        let cloud_template = cloud.templates.get(template).ok_or_else(|| {
            ProvisioningError::InvalidConfig(format!("template {} not found", template))
        })?;

        let value = cloud_template.custom.get(NODES_KEY).ok_or_else(|| {
            ProvisioningError::InvalidConfig(format!(
                "template {} has no custom.{} list",
                template, NODES_KEY
            ))
        })?;
        let nodes = parse_nodes(value)?;

        let pool = match &self.context {
            Some(context) => {
                let key = format!("pool/{}/{}", cloud.name, template);
                context.get_or_create(&key, || Mutex::new(NodePool::new(&nodes)))
            }
            None => Arc::new(Mutex::new(NodePool::new(&nodes))),
        };

        tracing::debug!(
            cloud = %cloud.name,
            template,
            free = pool.lock().free.len(),
            "static pool bound"
        );
        self.pool = Some(pool);
        Ok(())
    }

    async fn create_node(&self, _timeout: Duration) -> Result<NodeDetails, ProvisioningError> {
        let node = self
            .pool()?
            .lock()
            .allocate()
            .ok_or_else(|| {
                ProvisioningError::NoCapacity("all pool hosts are allocated".to_string())
            })?;

        tracing::info!(address = %node.address, "allocated host from static pool");

        let mut details = NodeDetails::at(node.address.clone());
        details.machine_id = Some(MachineId::new(node.address.as_str()));
        details.remote_username = node.user;
        Ok(details)
    }

    async fn destroy_node(
        &self,
        address: &NodeAddress,
        _timeout: Duration,
    ) -> Result<bool, ProvisioningError> {
        let released = self.pool()?.lock().release(address);
        if released {
            tracing::info!(%address, "returned host to static pool");
        } else {
            tracing::warn!(%address, "host is not allocated from this pool");
        }
        Ok(released)
    }
}
