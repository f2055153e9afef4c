use remote_runner::{PrimaryClient, RemoteJob, RemoteProvider, SecondaryClient};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::{
    config::{ExecutionMode, RunnerConfig},
    denylist::DenylistScanner,
    error::Error,
    executor::CodeExecutor,
    languages::LanguageRegistry,
    normalizer::{normalize_error, normalize_local, normalize_remote},
    sandbox::Sandbox,
    scratch::ScratchSpace,
    types::{ExecutionOutcome, ExecutionRequest, Language},
};

/// Availability of one configured language
#[derive(Debug, Clone, Serialize)]
pub struct LanguageInfo {
    pub name: Language,
    pub compiled: bool,
    /// Toolchain present on this host
    pub local: bool,
}

/// Entry point for running submitted code.
///
/// Cheap to clone; all state is shared and read-only apart from the
/// concurrency permits.
#[derive(Clone)]
pub struct CodeExecutionService {
    mode: ExecutionMode,
    registry: Arc<LanguageRegistry>,
    denylist: Arc<DenylistScanner>,
    executor: Arc<CodeExecutor>,
    primary: Option<Arc<dyn RemoteProvider>>,
    secondary: Option<Arc<dyn RemoteProvider>>,
    semaphore: Arc<Semaphore>,
}

impl CodeExecutionService {
    pub async fn new(config: RunnerConfig) -> Result<Self, Error> {
        let registry = match &config.toolchains {
            Some(path) => LanguageRegistry::from_file(path)?,
            None => LanguageRegistry::builtin()?,
        };
        let registry = Arc::new(registry);

        let scratch = ScratchSpace::new(config.scratch_dir.clone()).await?;
        let sandbox = Sandbox::new(scratch.root().to_path_buf(), config.limits.clone());
        let executor = CodeExecutor::new(registry.clone(), scratch, sandbox);

        let primary = match config.primary {
            Some(primary) => Some(Arc::new(PrimaryClient::new(primary)?) as Arc<dyn RemoteProvider>),
            None => None,
        };
        let secondary = match config.secondary {
            Some(secondary) => {
                Some(Arc::new(SecondaryClient::new(secondary)?) as Arc<dyn RemoteProvider>)
            }
            None => None,
        };

        info!(
            "Code execution service ready: mode={}, scratch={}, primary={}, secondary={}",
            config.mode,
            executor.scratch().root().display(),
            primary.is_some(),
            secondary.is_some()
        );

        Ok(Self {
            mode: config.mode,
            registry,
            denylist: Arc::new(DenylistScanner::new()?),
            executor: Arc::new(executor),
            primary,
            secondary,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// Replaces the primary remote provider
    pub fn with_primary(mut self, provider: Arc<dyn RemoteProvider>) -> Self {
        self.primary = Some(provider);
        self
    }

    /// Replaces the secondary remote provider
    pub fn with_secondary(mut self, provider: Arc<dyn RemoteProvider>) -> Self {
        self.secondary = Some(provider);
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn get_available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Child processes started by this service so far
    pub fn spawned_processes(&self) -> usize {
        self.executor.sandbox().spawned_processes()
    }

    pub fn languages(&self) -> Vec<LanguageInfo> {
        self.registry
            .languages()
            .into_iter()
            .filter_map(|name| {
                self.registry.get(name).map(|toolchain| LanguageInfo {
                    name,
                    compiled: toolchain.is_compiled(),
                    local: toolchain.is_available(),
                })
            })
            .collect()
    }

    /// Runs one request. Every failure is folded into the returned outcome.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let started = Instant::now();
        let language = request.language.clone();

        match self.try_execute(request).await {
            Ok(outcome) => {
                info!(
                    "Execution finished: language={}, succeeded={}, reason={:?}, elapsed={:?}",
                    language,
                    outcome.succeeded,
                    outcome.failure_reason,
                    started.elapsed()
                );
                outcome
            }
            Err(e) => {
                match &e {
                    Error::Scratch(_) | Error::Io(_) | Error::Spawn(_) | Error::System(_) => {
                        error!("Code execution failed: {}", e)
                    }
                    _ => info!("Code execution refused: {}", e),
                }
                normalize_error(&e)
            }
        }
    }

    async fn try_execute(&self, request: ExecutionRequest) -> Result<ExecutionOutcome, Error> {
        if request.code.trim().is_empty() || request.language.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "Code and language are required".to_string(),
            ));
        }

        self.denylist.check(&request.code)?;
        let (language, toolchain) = self.registry.resolve(&request.language)?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| Error::System(format!("Failed to acquire execution permit: {}", e)))?;

        debug!("Starting code execution for language: {} ({})", language, self.mode);

        // Remote runners get the identifier as submitted; the primary
        // provider is addressed through the dialect instead.
        let mut job = RemoteJob::new(request.language.trim(), &request.code, &request.stdin);
        if let Some(dialect) = &toolchain.primary {
            job = job.with_dialect(dialect.clone());
        }

        match self.mode {
            ExecutionMode::Local => {
                let run = self
                    .executor
                    .execute(language, &request.code, &request.stdin)
                    .await?;
                Ok(normalize_local(run))
            }
            ExecutionMode::RemotePrimary => {
                run_remote(self.primary.as_deref(), "primary provider", &job).await
            }
            ExecutionMode::RemoteSecondary => {
                run_remote(self.secondary.as_deref(), "remote runner", &job).await
            }
            ExecutionMode::Auto => {
                match self
                    .executor
                    .execute(language, &request.code, &request.stdin)
                    .await
                {
                    Ok(run) => Ok(normalize_local(run)),
                    Err(e) if e.is_local_unavailable() => {
                        warn!("Local execution unavailable ({}), using remote providers", e);
                        self.run_remote_chain(&job).await
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Primary first, secondary only when the primary fails
    async fn run_remote_chain(&self, job: &RemoteJob) -> Result<ExecutionOutcome, Error> {
        let primary_error =
            match run_remote(self.primary.as_deref(), "primary provider", job).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => e,
            };

        match &self.secondary {
            Some(_) => {
                warn!("Primary provider failed ({}), falling back to remote runner", primary_error);
                run_remote(self.secondary.as_deref(), "remote runner", job).await
            }
            None => Err(primary_error),
        }
    }
}

async fn run_remote(
    provider: Option<&dyn RemoteProvider>,
    name: &'static str,
    job: &RemoteJob,
) -> Result<ExecutionOutcome, Error> {
    let provider =
        provider.ok_or(Error::Provider(remote_runner::Error::NotConfigured { provider: name }))?;

    debug!("Delegating {} job to {}", job.language, provider.name());
    let output = provider.execute(job).await?;
    Ok(normalize_remote(output))
}
