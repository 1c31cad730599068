//! Run identity, status snapshots, and outcome mapping.

use std::fmt;

use serde_json::Value;

/// States that end a run. Everything else, including strings outside the
/// vocabulary, keeps the poll loop going.
const TERMINAL_STATES: [&str; 4] = ["success", "failed", "upstream_failed", "skipped"];

/// Whether a lowercased state string ends monitoring.
#[must_use]
pub fn is_terminal(state: &str) -> bool {
    TERMINAL_STATES.contains(&state)
}

/// Identifies one triggered DAG run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub dag_id: String,
    pub run_id: String,
}

/// One status snapshot fetched from the orchestrator. Superseded by the
/// next poll; never persisted.
#[derive(Debug, Clone)]
pub struct RunStatus {
    /// State string as reported. Compared case-insensitively.
    pub state: String,
    /// Logical execution timestamp, when reported.
    pub execution_date: Option<String>,
    /// Full response payload, for fields the tool does not model.
    pub payload: Value,
}

impl RunStatus {
    /// Build a snapshot from a raw dag-run payload.
    #[must_use]
    pub fn from_payload(payload: Value) -> Self {
        let state = payload["state"].as_str().unwrap_or("unknown").to_string();
        let execution_date = payload["execution_date"].as_str().map(String::from);
        Self {
            state,
            execution_date,
            payload,
        }
    }
}

/// Final outcome of a monitored run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed,
    UpstreamFailed,
    Skipped,
    /// Terminal label outside the known vocabulary.
    Unexpected(String),
}

impl RunOutcome {
    /// Classify a terminal state string, case-insensitively.
    #[must_use]
    pub fn from_state(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "upstream_failed" => Self::UpstreamFailed,
            "skipped" => Self::Skipped,
            other => Self::Unexpected(other.to_string()),
        }
    }

    /// Process exit code for this outcome: 0 success, 1 failure, 2 for
    /// anything ambiguous.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed | Self::UpstreamFailed => 1,
            Self::Skipped | Self::Unexpected(_) => 2,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
            Self::UpstreamFailed => f.write_str("upstream_failed"),
            Self::Skipped => f.write_str("skipped"),
            Self::Unexpected(label) => f.write_str(label),
        }
    }
}

/// Render whole seconds as `XmYs`, the format of the final report.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_vocabulary() {
        assert!(is_terminal("success"));
        assert!(is_terminal("failed"));
        assert!(is_terminal("upstream_failed"));
        assert!(is_terminal("skipped"));
        assert!(!is_terminal("running"));
        assert!(!is_terminal("queued"));
        assert!(!is_terminal("unknown"));
        assert!(!is_terminal("weird_state"));
    }

    #[test]
    fn outcome_exit_codes() {
        assert_eq!(RunOutcome::from_state("success").exit_code(), 0);
        assert_eq!(RunOutcome::from_state("failed").exit_code(), 1);
        assert_eq!(RunOutcome::from_state("upstream_failed").exit_code(), 1);
        assert_eq!(RunOutcome::from_state("skipped").exit_code(), 2);
        assert_eq!(RunOutcome::from_state("weird_state").exit_code(), 2);
    }

    #[test]
    fn unrecognized_label_is_preserved() {
        let outcome = RunOutcome::from_state("weird_state");
        assert_eq!(outcome, RunOutcome::Unexpected("weird_state".to_string()));
        assert_eq!(outcome.to_string(), "weird_state");
    }

    #[test]
    fn outcome_classification_is_case_insensitive() {
        assert_eq!(RunOutcome::from_state("SUCCESS"), RunOutcome::Success);
        assert_eq!(RunOutcome::from_state("Failed"), RunOutcome::Failed);
    }

    #[test]
    fn status_snapshot_defaults_to_unknown() {
        let status = RunStatus::from_payload(serde_json::json!({ "dag_run_id": "x" }));
        assert_eq!(status.state, "unknown");
        assert!(status.execution_date.is_none());
    }

    #[test]
    fn status_snapshot_keeps_raw_payload() {
        let payload = serde_json::json!({
            "state": "running",
            "execution_date": "2024-05-01T00:00:00+00:00",
            "external_trigger": true
        });
        let status = RunStatus::from_payload(payload);
        assert_eq!(status.state, "running");
        assert_eq!(
            status.execution_date.as_deref(),
            Some("2024-05-01T00:00:00+00:00")
        );
        assert_eq!(status.payload["external_trigger"], true);
    }

    #[test]
    fn elapsed_renders_minutes_and_seconds() {
        assert_eq!(format_elapsed(125), "2m 5s");
        assert_eq!(format_elapsed(59), "0m 59s");
        assert_eq!(format_elapsed(0), "0m 0s");
        assert_eq!(format_elapsed(3600), "60m 0s");
    }
}
