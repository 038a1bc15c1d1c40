// ABOUTME: Node lifecycle orchestration using the type state pattern.
// ABOUTME: Exports the provisioner, launch states, deadline and failure types.

mod deadline;
mod error;
mod launch;
mod provisioner;
mod rollback;
mod state;
mod transitions;

pub use deadline::Deadline;
pub use error::{FailureKind, ProvisionError};
pub use launch::NodeLaunch;
pub use provisioner::{MachineProvisioner, StopReport};
pub use state::{Created, Installed, Joined};
pub use transitions::{TransitionResult, wait_for_agent};
