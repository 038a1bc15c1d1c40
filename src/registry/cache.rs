// ABOUTME: Process-wide cache of the shared cluster registry handle.
// ABOUTME: Built once from the first caller's discovery seed, then reused by every provisioner.

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

use super::{DiscoverySeed, RegistryError};

type Connector<R> = Box<dyn Fn(&DiscoverySeed) -> Result<R, RegistryError> + Send + Sync>;

/// Holds the one registry handle of the process.
///
/// The first seed wins: once a handle exists, seeds passed by later callers
/// are ignored. One process serves one logical cluster.
pub struct RegistryHandleCache<R> {
    connector: Connector<R>,
    handle: OnceLock<Arc<R>>,
    init: Mutex<()>,
}

impl<R> std::fmt::Debug for RegistryHandleCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryHandleCache")
            .field("initialized", &self.handle.get().is_some())
            .finish()
    }
}

impl<R> RegistryHandleCache<R> {
    /// `connector` builds the handle the first time one is requested.
    pub fn new<F>(connector: F) -> Self
    where
        F: Fn(&DiscoverySeed) -> Result<R, RegistryError> + Send + Sync + 'static,
    {
        Self {
            connector: Box::new(connector),
            handle: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Return the shared handle, building it from `seed` if none exists yet.
    ///
    /// A failed build leaves the cache empty so a later caller can retry.
    pub fn get_or_create(&self, seed: &DiscoverySeed) -> Result<Arc<R>, RegistryError> {
        if let Some(handle) = self.handle.get() {
            return Ok(Arc::clone(handle));
        }

        let _guard = self.init.lock();
        if let Some(handle) = self.handle.get() {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new((self.connector)(seed)?);
        tracing::info!(
            locators = %seed.locators_string(),
            groups = ?seed.groups,
            "created shared cluster registry handle"
        );
        Ok(Arc::clone(self.handle.get_or_init(|| handle)))
    }

    /// The handle, if one has been built.
    pub fn get(&self) -> Option<Arc<R>> {
        self.handle.get().cloned()
    }
}
