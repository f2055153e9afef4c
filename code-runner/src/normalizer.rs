//! Collapses local runs, remote answers and errors into [`ExecutionOutcome`].
//!
//! Success is decided from stderr alone plus the absence of limit hits or
//! crashes. A program that exits nonzero without writing to stderr is
//! reported as successful; callers depending on exit codes must not rely on
//! `succeeded`.

use remote_runner::RemoteOutput;

use crate::{
    error::Error,
    executor::{LocalRun, RunState},
    types::{ExecutionOutcome, FailureReason},
};

pub fn normalize_local(run: LocalRun) -> ExecutionOutcome {
    let stdout = run.stdout.trim().to_string();
    let stderr = run.stderr;

    match run.state {
        RunState::Completed if stderr.trim().is_empty() => ExecutionOutcome::success(stdout),
        RunState::Completed => ExecutionOutcome::failure(FailureReason::RuntimeFailure, stdout, stderr),
        RunState::TimedOut => ExecutionOutcome::failure(FailureReason::Timeout, stdout, stderr),
        RunState::OutputLimited => {
            ExecutionOutcome::failure(FailureReason::OutputLimitExceeded, stdout, stderr)
        }
        RunState::CrashedOnCompile => {
            let stderr = if stderr.trim().is_empty() {
                match run.exit_code {
                    Some(code) => format!("compiler exited with status {}", code),
                    None => "compiler terminated abnormally".to_string(),
                }
            } else {
                stderr
            };
            ExecutionOutcome::failure(FailureReason::CompileFailure, String::new(), stderr)
        }
        RunState::CrashedOnRun => {
            let stderr = match run.signal {
                _ if !stderr.trim().is_empty() => stderr,
                Some(signal) => format!("process terminated by signal {}", signal),
                None => "process exited but left background work holding its output open"
                    .to_string(),
            };
            ExecutionOutcome::failure(FailureReason::RuntimeFailure, stdout, stderr)
        }
        RunState::Idle | RunState::Compiling | RunState::Running => ExecutionOutcome::failure(
            FailureReason::Internal,
            stdout,
            format!("execution stopped in state {:?}", run.state),
        ),
    }
}

pub fn normalize_remote(output: RemoteOutput) -> ExecutionOutcome {
    let stdout = output.output.trim().to_string();
    if output.success && output.error.trim().is_empty() {
        ExecutionOutcome::success(stdout)
    } else {
        ExecutionOutcome::failure(FailureReason::RuntimeFailure, stdout, output.error)
    }
}

pub fn normalize_error(error: &Error) -> ExecutionOutcome {
    ExecutionOutcome::failure(error.failure_reason(), String::new(), error.to_string())
}
