// ABOUTME: What the provisio CLI prints for the operator or a calling scaler.
// ABOUTME: Human text in normal and quiet modes, one JSON object per line in json mode.

use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    fn duration_secs(&self) -> Option<f64> {
        self.start_time.map(|t| t.elapsed().as_secs_f64())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => match self.duration_secs() {
                Some(elapsed) => println!("{message} ({:.1}s)", elapsed),
                None => println!("{message}"),
            },
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.json_line("success", message, false),
        }
    }

    /// Print a non-fatal warning (shown in every mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.json_line("warning", message, true),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.json_line("error", message, true),
        }
    }

    /// Emit structured data: one JSON line in json mode, `human` otherwise.
    pub fn data<T: Serialize>(&self, event: &str, data: &T, human: impl FnOnce()) {
        match self.mode {
            OutputMode::Json => emit(&DataEvent { event, data }, false),
            OutputMode::Normal | OutputMode::Quiet => human(),
        }
    }

    fn json_line(&self, event: &str, message: &str, to_stderr: bool) {
        let line = JsonEvent {
            event,
            message,
            duration_secs: self.duration_secs(),
        };
        emit(&line, to_stderr);
    }
}

fn emit<T: Serialize>(line: &T, to_stderr: bool) {
    let Ok(json) = serde_json::to_string(line) else {
        return;
    };
    if to_stderr {
        eprintln!("{json}");
    } else {
        println!("{json}");
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct DataEvent<'a, T> {
    event: &'a str,
    data: &'a T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_event_nests_payload() {
        let capacity = crate::types::NodeCapacity::new(2048, 2);
        let line = DataEvent {
            event: "capacity",
            data: &capacity,
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["event"], "capacity");
        assert_eq!(json["data"]["cpu_cores"], 2);
    }

    #[test]
    fn json_event_omits_missing_duration() {
        let line = JsonEvent {
            event: "warning",
            message: "agent shutdown failed",
            duration_secs: None,
        };
        let json = serde_json::to_string(&line).unwrap();
        assert!(!json.contains("duration_secs"));
    }

    #[test]
    fn human_callback_skipped_in_json_mode() {
        let mut called = false;
        Output::new(OutputMode::Json).data("agents", &Vec::<String>::new(), || called = true);
        assert!(!called);

        Output::new(OutputMode::Quiet).data("agents", &Vec::<String>::new(), || called = true);
        assert!(called);
    }
}
