// Create-and-poll for assistant runs, bounded by a timeout and interruptible
// through a caller-supplied cancellation check.

use crate::api::{AssistantsApi, CreateRunRequest, Run, RunStatus};
use crate::config::Config;
use crate::error::CliError;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Longest wait for a cancelled run to leave `cancelling`, capped by the
/// policy's own timeout.
pub const CANCEL_GRACE: Duration = Duration::from_secs(30);

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        PollPolicy {
            interval: config.poll_interval,
            timeout: config.run_timeout,
        }
    }
}

/// Start a run of `assistant_id` on `thread_id` and block until it reaches a
/// terminal status. `cancelled` is checked before every poll.
///
/// A run that is cancelled, times out or stops at `requires_action` is
/// cancelled remotely and waited on until the thread accepts new messages
/// again, so the caller can keep using the same thread.
pub fn create_and_poll<A, F>(
    api: &A,
    thread_id: &str,
    assistant_id: &str,
    policy: &PollPolicy,
    mut cancelled: F,
) -> Result<Run, CliError>
where
    A: AssistantsApi + ?Sized,
    F: FnMut() -> bool,
{
    let req = CreateRunRequest {
        assistant_id: assistant_id.to_string(),
    };
    let mut run = api.create_run(thread_id, &req)?;
    debug!(run_id = %run.id, status = %run.status, "run created");
    let started = Instant::now();

    while !run.status.is_terminal() {
        if cancelled() {
            abandon(api, thread_id, &run.id, policy)?;
            return Err(CliError::RunCancelled(run.id));
        }
        if started.elapsed() >= policy.timeout {
            abandon(api, thread_id, &run.id, policy)?;
            return Err(CliError::RunTimedOut {
                run_id: run.id,
                secs: policy.timeout.as_secs(),
            });
        }
        thread::sleep(policy.interval);
        run = api.retrieve_run(thread_id, &run.id)?;
        debug!(run_id = %run.id, status = %run.status, "run polled");
    }

    if run.status == RunStatus::RequiresAction {
        // Tool calls are never submitted, so the run would block the thread.
        abandon(api, thread_id, &run.id, policy)?;
    }

    if run.status != RunStatus::Completed {
        let detail = run
            .last_error
            .as_ref()
            .and_then(|e| e.message.clone().or_else(|| e.code.clone()));
        return Err(CliError::RunNotCompleted {
            run_id: run.id,
            status: run.status,
            detail,
        });
    }
    Ok(run)
}

/// Cancel the run remotely and wait until it is no longer active. A failed
/// cancel request is only logged: the run may have finished on its own.
fn abandon<A: AssistantsApi + ?Sized>(
    api: &A,
    thread_id: &str,
    run_id: &str,
    policy: &PollPolicy,
) -> Result<(), CliError> {
    let mut status = match api.cancel_run(thread_id, run_id) {
        Ok(run) => run.status,
        Err(e) => {
            warn!(run_id, error = %e, "could not cancel run");
            RunStatus::Cancelling
        }
    };
    let grace = policy.timeout.min(CANCEL_GRACE);
    let started = Instant::now();
    while is_active(status) {
        if started.elapsed() >= grace {
            warn!(run_id, status = %status, "run still active after cancelling");
            return Ok(());
        }
        thread::sleep(policy.interval);
        status = api.retrieve_run(thread_id, run_id)?.status;
        debug!(run_id, status = %status, "waiting for cancelled run");
    }
    Ok(())
}

/// Statuses during which the thread rejects new messages and runs.
fn is_active(status: RunStatus) -> bool {
    !status.is_terminal() || status == RunStatus::RequiresAction
}
