// Error types shared by the API client, the run poller and the step loop.
// `CliError::is_recoverable` decides whether the loop re-enters the current
// step or aborts the session.

use crate::api::RunStatus;
use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("terminal prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
    #[error("session has no {0}")]
    MissingContext(&'static str),
    #[error("the models catalog is empty")]
    EmptyCatalog,
    #[error("the assistant did not reply with text")]
    NoTextReply,
    #[error("run {run_id} ended with status {status}{}", detail_suffix(.detail))]
    RunNotCompleted {
        run_id: String,
        status: RunStatus,
        detail: Option<String>,
    },
    #[error("run {run_id} did not finish within {secs}s")]
    RunTimedOut { run_id: String, secs: u64 },
    #[error("run {0} cancelled")]
    RunCancelled(String),
}

impl CliError {
    /// Errors after which the session can carry on at the same step.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CliError::NoTextReply
                | CliError::RunNotCompleted { .. }
                | CliError::RunTimedOut { .. }
                | CliError::RunCancelled(_)
        )
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}
