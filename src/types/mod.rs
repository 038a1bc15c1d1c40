// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod address;
mod capacity;
mod id;
mod locator;

pub use address::{NodeAddress, NodeAddressError};
pub use capacity::NodeCapacity;
pub use id::{AgentId, MachineId};
pub use locator::{DEFAULT_LOCATOR_PORT, Locator, LocatorError, locators_string};
