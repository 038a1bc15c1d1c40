// ABOUTME: Capacity of a single provisioned node.
// ABOUTME: Value object reported to the elastic scaler.

use serde::Serialize;
use std::fmt;

/// Memory and CPU a single node contributes to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeCapacity {
    /// Memory in megabytes.
    pub memory_mb: u64,
    /// Number of CPU cores.
    pub cpu_cores: u32,
}

impl NodeCapacity {
    pub fn new(memory_mb: u64, cpu_cores: u32) -> Self {
        Self {
            memory_mb,
            cpu_cores,
        }
    }
}

impl fmt::Display for NodeCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}MB RAM, {} CPU", self.memory_mb, self.cpu_cores)
    }
}
