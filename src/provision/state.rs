// ABOUTME: Launch state marker types for the type state pattern.
// ABOUTME: A node moves Created -> Installed -> Joined; each state exposes only its next step.

use crate::registry::AgentHandle;

/// Node exists at the driver.
/// Available actions: `install()`, `rollback()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Created;

/// Agent software installed, or found already running.
/// Available actions: `await_agent()`, `rollback()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Installed;

/// Agent registered with the cluster.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Joined {
    pub(crate) agent: AgentHandle,
}
