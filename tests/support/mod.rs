// ABOUTME: Test support utilities.
// ABOUTME: Recording fakes for the driver, installer and registry, plus provisioner setup.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use provisio::config::{Cloud, ProvisioningConfig};
use provisio::driver::{DriverContextRegistry, NodeDetails, ProvisioningDriver, ProvisioningError};
use provisio::installer::{InstallError, InstallationRequest, Installer};
use provisio::provision::{MachineProvisioner, ProvisionError};
use provisio::registry::{AgentHandle, ClusterRegistry, RegistryError, RegistryHandleCache};
use provisio::types::NodeAddress;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("provisio=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn addr(s: &str) -> NodeAddress {
    NodeAddress::new(s).unwrap()
}

/// Node with distinct public and private addresses.
pub fn node(public: &str, private: &str) -> NodeDetails {
    NodeDetails {
        public_address: Some(addr(public)),
        private_address: Some(addr(private)),
        ..NodeDetails::default()
    }
}

// =============================================================================
// Driver
// =============================================================================

#[derive(Clone)]
pub enum CreateOutcome {
    Node(NodeDetails),
    Fail(String),
    /// Take this long, then return the node.
    Slow(NodeDetails, Duration),
}

#[derive(Default)]
pub struct DriverLog {
    pub creates: Mutex<Vec<Duration>>,
    pub destroys: Mutex<Vec<(NodeAddress, Duration)>>,
    pub closed: AtomicBool,
}

impl DriverLog {
    pub fn destroyed(&self) -> Vec<NodeAddress> {
        self.destroys.lock().iter().map(|(a, _)| a.clone()).collect()
    }
}

pub struct FakeDriver {
    create: CreateOutcome,
    destroy: Option<bool>,
    log: Arc<DriverLog>,
}

impl FakeDriver {
    pub fn returning(node: NodeDetails) -> Self {
        Self {
            create: CreateOutcome::Node(node),
            destroy: Some(true),
            log: Arc::default(),
        }
    }

    pub fn slow(node: NodeDetails, delay: Duration) -> Self {
        Self {
            create: CreateOutcome::Slow(node, delay),
            destroy: Some(true),
            log: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            create: CreateOutcome::Fail(message.to_string()),
            destroy: Some(true),
            log: Arc::default(),
        }
    }

    /// Destroy answers `result`; `None` makes it fail.
    pub fn destroy_returns(mut self, result: Option<bool>) -> Self {
        self.destroy = result;
        self
    }

    pub fn log(&self) -> Arc<DriverLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl ProvisioningDriver for FakeDriver {
    fn driver_name(&self) -> &'static str {
        "fake"
    }

    fn bind_config(&mut self, _cloud: &Cloud, _template: &str) -> Result<(), ProvisioningError> {
        Ok(())
    }

    async fn create_node(&self, timeout: Duration) -> Result<NodeDetails, ProvisioningError> {
        self.log.creates.lock().push(timeout);
        match &self.create {
            CreateOutcome::Node(node) => Ok(node.clone()),
            CreateOutcome::Fail(message) => Err(ProvisioningError::Backend(message.clone())),
            CreateOutcome::Slow(node, delay) => {
                tokio::time::sleep(*delay).await;
                Ok(node.clone())
            }
        }
    }

    async fn destroy_node(
        &self,
        address: &NodeAddress,
        timeout: Duration,
    ) -> Result<bool, ProvisioningError> {
        self.log.destroys.lock().push((address.clone(), timeout));
        self.destroy
            .ok_or_else(|| ProvisioningError::Backend("destroy refused".to_string()))
    }

    async fn close(&self) -> Result<(), ProvisioningError> {
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Installer
// =============================================================================

#[derive(Clone, Copy)]
pub enum InstallOutcome {
    Succeed,
    Fail,
    /// Take this long, then succeed.
    Slow(Duration),
}

pub struct FakeInstaller {
    outcome: InstallOutcome,
    pub requests: Arc<Mutex<Vec<(InstallationRequest, Duration)>>>,
}

impl FakeInstaller {
    pub fn new(outcome: InstallOutcome) -> Self {
        Self {
            outcome,
            requests: Arc::default(),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<(InstallationRequest, Duration)>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl Installer for FakeInstaller {
    async fn install(
        &self,
        request: &InstallationRequest,
        timeout: Duration,
    ) -> Result<(), InstallError> {
        assert!(!timeout.is_zero(), "installer called with zero timeout");
        self.requests.lock().push((request.clone(), timeout));
        match self.outcome {
            InstallOutcome::Succeed => Ok(()),
            InstallOutcome::Fail => Err(InstallError::CommandFailed {
                exit_code: 1,
                stderr: "install.sh: not found".to_string(),
            }),
            InstallOutcome::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct FakeRegistry {
    agents: Mutex<Vec<AgentHandle>>,
    /// Lookups answered with "not found" before agents become visible.
    hidden_for: AtomicUsize,
    pub lookups: AtomicUsize,
    pub shutdowns: Mutex<Vec<AgentHandle>>,
    fail_shutdown: AtomicBool,
    /// Shutdown requests hang this long before answering.
    shutdown_delay: Option<Duration>,
}

impl FakeRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_agent(agent: AgentHandle) -> Self {
        let registry = Self::default();
        registry.agents.lock().push(agent);
        registry
    }

    /// Agents only show up on lookup number `lookups + 1`.
    pub fn hidden_for(self, lookups: usize) -> Self {
        self.hidden_for.store(lookups, Ordering::SeqCst);
        self
    }

    pub fn failing_shutdown(self) -> Self {
        self.fail_shutdown.store(true, Ordering::SeqCst);
        self
    }

    pub fn hanging_shutdown(mut self, delay: Duration) -> Self {
        self.shutdown_delay = Some(delay);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterRegistry for FakeRegistry {
    async fn list_agents(&self) -> Result<Vec<AgentHandle>, RegistryError> {
        Ok(self.agents.lock().clone())
    }

    async fn find_agent_by_address(
        &self,
        address: &NodeAddress,
    ) -> Result<Option<AgentHandle>, RegistryError> {
        let n = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.hidden_for.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .agents
            .lock()
            .iter()
            .find(|a| a.matches(address))
            .cloned())
    }

    async fn shutdown_agent(&self, agent: &AgentHandle) -> Result<(), RegistryError> {
        self.shutdowns.lock().push(agent.clone());
        if let Some(delay) = self.shutdown_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_shutdown.load(Ordering::SeqCst) {
            return Err(RegistryError::Timeout);
        }
        Ok(())
    }
}

// =============================================================================
// Setup
// =============================================================================

/// Config from the sample template with a 1s poll interval.
pub fn config() -> ProvisioningConfig {
    ProvisioningConfig::template()
}

pub type TestProvisioner = MachineProvisioner<FakeDriver, FakeInstaller, FakeRegistry>;

/// Cache that hands out `registry` on first demand.
pub fn registry_cache(registry: FakeRegistry) -> RegistryHandleCache<FakeRegistry> {
    let slot = Mutex::new(Some(registry));
    RegistryHandleCache::new(move |_seed| slot.lock().take().ok_or(RegistryError::NoLocators))
}

pub fn provisioner(
    driver: FakeDriver,
    installer: FakeInstaller,
    registry: FakeRegistry,
) -> Result<TestProvisioner, ProvisionError> {
    provisioner_with(driver, installer, registry, config())
}

pub fn provisioner_with(
    driver: FakeDriver,
    installer: FakeInstaller,
    registry: FakeRegistry,
    config: ProvisioningConfig,
) -> Result<TestProvisioner, ProvisionError> {
    init_tracing();
    let contexts = DriverContextRegistry::new();
    let registries = registry_cache(registry);
    MachineProvisioner::setup(driver, installer, config, &contexts, &registries)
}
