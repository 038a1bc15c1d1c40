// ABOUTME: Library root for provisio - exposes the provisioning core and its backends.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod installer;
pub mod output;
pub mod provision;
pub mod registry;
pub mod ssh;
pub mod types;
