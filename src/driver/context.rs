// ABOUTME: Per-driver-implementation shared context and its process-wide registry.
// ABOUTME: Lets stateless driver instances share long-lived state such as node pools.

use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type Entry = Arc<dyn Any + Send + Sync>;

/// State shared by every instance of one driver implementation.
///
/// Entries are keyed by name and type, so two drivers storing different
/// types under the same name never see each other's values.
pub struct DriverContext {
    driver: &'static str,
    entries: Mutex<HashMap<(String, TypeId), Entry>>,
}

impl std::fmt::Debug for DriverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverContext")
            .field("driver", &self.driver)
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

impl DriverContext {
    fn new(driver: &'static str) -> Self {
        Self {
            driver,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Identity of the driver implementation this context belongs to.
    pub fn driver(&self) -> &'static str {
        self.driver
    }

    /// Return the entry stored under `key`, creating it with `init` on first use.
    ///
    /// `init` runs with the context lock held and must not call back into the context.
    pub fn get_or_create<T, F>(&self, key: &str, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let map_key = (key.to_string(), TypeId::of::<T>());
        let mut entries = self.entries.lock();

        if let Some(existing) = entries
            .get(&map_key)
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
        {
            return existing;
        }

        let value = Arc::new(init());
        entries.insert(map_key, Arc::clone(&value) as Entry);
        value
    }
}

/// Process-wide map from driver identity to its [`DriverContext`].
///
/// Contexts are never removed: drivers may park pooled resources in them
/// for the lifetime of the process.
#[derive(Debug, Default)]
pub struct DriverContextRegistry {
    contexts: RwLock<HashMap<&'static str, Arc<DriverContext>>>,
}

impl DriverContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the context for `driver`, creating it on first demand.
    pub fn get_or_create(&self, driver: &'static str) -> Arc<DriverContext> {
        if let Some(context) = self.contexts.read().get(driver) {
            return Arc::clone(context);
        }

        let mut contexts = self.contexts.write();
        let context = contexts.entry(driver).or_insert_with(|| {
            tracing::debug!(driver, "creating driver context");
            Arc::new(DriverContext::new(driver))
        });
        Arc::clone(context)
    }

    /// Number of driver implementations with a context.
    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}
