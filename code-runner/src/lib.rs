//! # Code Runner
//!
//! Runs user-submitted source code in one of several languages and returns
//! its captured output.
//!
//! A request goes through a textual denylist, a language registry lookup,
//! source materialization into a shared scratch directory, an optional
//! compile step and a run step under fixed resource limits. Scratch files are
//! removed on every path. When the local toolchain is unavailable, or the
//! service is configured for it, execution is delegated to a remote provider
//! instead.
//!
//! ```rust,no_run
//! use code_runner::{CodeExecutionService, ExecutionMode, ExecutionRequest, RunnerConfig};
//!
//! # async fn run() -> Result<(), code_runner::Error> {
//! let service = CodeExecutionService::new(RunnerConfig::new(ExecutionMode::Local)).await?;
//! let outcome = service
//!     .execute(ExecutionRequest::new("python", "print(input())").with_stdin("hello\n"))
//!     .await;
//! assert_eq!(outcome.stdout, "hello");
//! # Ok(())
//! # }
//! ```

mod config;
mod denylist;
mod error;
mod executor;
mod languages;
mod normalizer;
mod reaper;
mod sandbox;
mod scratch;
mod service;
mod types;

#[cfg(test)]
mod tests;

pub use config::{ExecutionMode, RunnerConfig};
pub use denylist::{DenylistMatch, DenylistScanner, RuleCategory};
pub use error::Error;
pub use executor::{CodeExecutor, LocalRun, RunState};
pub use languages::{LanguageRegistry, TemplateContext, ToolchainDescriptor};
pub use sandbox::{ProcessOutput, Sandbox, Termination};
pub use scratch::{ArtifactSet, ScratchSpace};
pub use service::{CodeExecutionService, LanguageInfo};
pub use types::{ExecutionOutcome, ExecutionRequest, FailureReason, Language, ResourceLimits};

pub use remote_runner::{PrimaryConfig, RemoteJob, RemoteOutput, RemoteProvider, SecondaryConfig};

/// Result type for code execution operations
pub type Result<T> = std::result::Result<T, Error>;
