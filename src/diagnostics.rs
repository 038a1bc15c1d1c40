// ABOUTME: Diagnostics accumulator for non-fatal warnings during rollback and stop.
// ABOUTME: Collects cleanup problems that must not replace the error the caller sees.

use serde::Serialize;

/// Collects non-fatal warnings during cleanup operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Warnings of one kind.
    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// A non-fatal warning collected during cleanup.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// The agent could not be found or asked to shut down.
    pub fn agent_shutdown(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::AgentShutdown,
            message: message.into(),
        }
    }

    /// The driver did not destroy the node.
    pub fn node_destroy(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::NodeDestroy,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Advisory agent shutdown failed; the node may still be destroyed.
    AgentShutdown,
    /// Node destruction failed or was declined; the machine may leak.
    NodeDestroy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::agent_shutdown("registry unreachable"));
        diag.warn(Warning::node_destroy("driver declined"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
        assert_eq!(diag.of_kind(WarningKind::NodeDestroy).count(), 1);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(
            Warning::agent_shutdown("test").kind,
            WarningKind::AgentShutdown
        );
        assert_eq!(Warning::node_destroy("test").kind, WarningKind::NodeDestroy);
    }

    #[test]
    fn warnings_serialize_with_snake_case_kind() {
        let json = serde_json::to_string(&Warning::node_destroy("x")).unwrap();
        assert_eq!(json, r#"{"kind":"node_destroy","message":"x"}"#);
    }
}
