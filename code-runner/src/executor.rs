use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    error::Error,
    languages::{LanguageRegistry, TemplateContext, ToolchainDescriptor},
    sandbox::{ProcessOutput, Sandbox, Termination},
    scratch::{ArtifactSet, ScratchSpace},
    types::Language,
};

/// Stages of one local execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Compiling,
    Running,
    Completed,
    TimedOut,
    OutputLimited,
    CrashedOnCompile,
    CrashedOnRun,
}

/// Raw result of the local pipeline, before normalization
#[derive(Debug, Clone)]
pub struct LocalRun {
    pub state: RunState,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

impl LocalRun {
    fn from_output(state: RunState, output: ProcessOutput) -> Self {
        Self {
            state,
            exit_code: output.exit_code(),
            signal: output.exit_signal(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Runs code on this host: materialize, compile if needed, run, clean up
pub struct CodeExecutor {
    registry: Arc<LanguageRegistry>,
    scratch: ScratchSpace,
    sandbox: Sandbox,
}

impl CodeExecutor {
    pub fn new(registry: Arc<LanguageRegistry>, scratch: ScratchSpace, sandbox: Sandbox) -> Self {
        Self {
            registry,
            scratch,
            sandbox,
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    /// Whether every host tool needed for `language` is installed
    pub fn is_available(&self, language: Language) -> bool {
        self.registry
            .get(language)
            .map(ToolchainDescriptor::is_available)
            .unwrap_or(false)
    }

    pub async fn execute(&self, language: Language, code: &str, stdin: &str) -> Result<LocalRun, Error> {
        let toolchain = self
            .registry
            .get(language)
            .ok_or_else(|| Error::UnsupportedLanguage(language.to_string()))?;

        let missing = toolchain.missing_tools();
        if !missing.is_empty() {
            return Err(Error::ToolchainUnavailable(format!(
                "{} needs {}",
                language,
                missing.join(", ")
            )));
        }

        let id = self.scratch.allocate_id();
        let mut artifacts = ArtifactSet::new();
        let result = self
            .execute_in_scratch(&id, toolchain, code, stdin, &mut artifacts)
            .await;
        artifacts.cleanup();
        result
    }

    async fn execute_in_scratch(
        &self,
        id: &str,
        toolchain: &ToolchainDescriptor,
        code: &str,
        stdin: &str,
        artifacts: &mut ArtifactSet,
    ) -> Result<LocalRun, Error> {
        let mut state = RunState::Idle;

        let source = self
            .scratch
            .materialize(id, &toolchain.extension, code, artifacts)
            .await?;
        let home = self.scratch.create_home(id, artifacts).await?;
        let ctx = TemplateContext {
            id: id.to_string(),
            dir: self.scratch.root().to_path_buf(),
            binary: self.scratch.binary_path(id),
            home,
            source,
        };

        // Owned before the compiler runs so partial outputs are removed too.
        for artifact in &toolchain.artifacts {
            artifacts.push(ctx.render(artifact).into());
        }

        let sandbox = self.sandbox.scoped(ctx.home.clone(), ctx.render_env(&toolchain.env));

        if let Some(compile) = &toolchain.compile {
            state = transition(id, state, RunState::Compiling);
            let output = sandbox.execute(&ctx.render_all(compile), None).await?;

            let failed = match output.termination {
                Termination::TimedOut => Some(RunState::TimedOut),
                Termination::OutputLimitExceeded => Some(RunState::OutputLimited),
                Termination::Detached => Some(RunState::CrashedOnCompile),
                Termination::Exited(status)
                    if !status.success() || !output.stderr.trim().is_empty() =>
                {
                    Some(RunState::CrashedOnCompile)
                }
                Termination::Exited(_) => None,
            };

            if let Some(terminal) = failed {
                transition(id, state, terminal);
                return Ok(LocalRun {
                    state: terminal,
                    exit_code: output.exit_code(),
                    signal: output.exit_signal(),
                    stdout: String::new(),
                    stderr: output.stderr,
                });
            }
        }

        state = transition(id, state, RunState::Running);
        let output = match sandbox
            .execute(&ctx.render_all(&toolchain.run), Some(stdin))
            .await
        {
            Ok(output) => output,
            // The program itself is a build product; failing to start it is
            // the program's failure, not a missing toolchain.
            Err(e @ (Error::Spawn(_) | Error::ToolchainUnavailable(_)))
                if toolchain.runs_build_product() =>
            {
                transition(id, state, RunState::CrashedOnRun);
                return Ok(LocalRun {
                    state: RunState::CrashedOnRun,
                    stdout: String::new(),
                    stderr: format!("failed to start compiled program: {}", e),
                    exit_code: None,
                    signal: None,
                });
            }
            Err(e) => return Err(e),
        };

        let terminal = match output.termination {
            Termination::TimedOut => RunState::TimedOut,
            Termination::OutputLimitExceeded => RunState::OutputLimited,
            Termination::Detached => RunState::CrashedOnRun,
            Termination::Exited(_) if output.exit_signal().is_some() => RunState::CrashedOnRun,
            Termination::Exited(status) => {
                if !status.success() && output.stderr.trim().is_empty() {
                    warn!(
                        "Run {} exited with {} but wrote nothing to stderr; reported as success",
                        id, status
                    );
                }
                RunState::Completed
            }
        };
        transition(id, state, terminal);

        Ok(LocalRun::from_output(terminal, output))
    }
}

fn transition(id: &str, from: RunState, to: RunState) -> RunState {
    debug!("Run {}: {:?} -> {:?}", id, from, to);
    to
}
