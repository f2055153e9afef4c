pub mod defaults {
    use crate::ResourceLimits;
    use tokio::time::Duration;

    pub fn default_test_limits() -> ResourceLimits {
        ResourceLimits {
            wall_clock_timeout: Duration::from_secs(10),
            max_output_bytes: 64 * 1024, // 64KB
            cpu_time: 10,
            file_size: 10 * 1024 * 1024, // 10MB
        }
    }

    pub fn short_timeout_limits() -> ResourceLimits {
        ResourceLimits {
            wall_clock_timeout: Duration::from_secs(1),
            ..default_test_limits()
        }
    }

    /// Allowed slack on top of the wall-clock timeout
    pub fn timeout_overhead() -> Duration {
        Duration::from_secs(3)
    }
}

pub mod services {
    use crate::{CodeExecutionService, ExecutionMode, ResourceLimits, Result, RunnerConfig};
    use tempfile::TempDir;

    /// A service plus the temporary directories it lives in
    pub struct TestService {
        pub service: CodeExecutionService,
        pub scratch: TempDir,
        _toolchains: Option<TempDir>,
    }

    impl TestService {
        /// Everything still present in the scratch directory. The directory
        /// belongs to this service alone, so after a request it must be empty.
        pub fn leftover_artifacts(&self) -> Vec<String> {
            std::fs::read_dir(self.scratch.path())
                .map(|entries| {
                    entries
                        .filter_map(|entry| entry.ok())
                        .map(|entry| entry.file_name().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    fn config(mode: ExecutionMode, limits: ResourceLimits, scratch: &TempDir) -> RunnerConfig {
        RunnerConfig::new(mode)
            .with_scratch_dir(scratch.path().to_path_buf())
            .with_limits(limits)
            .with_max_concurrent(4)
    }

    /// Service using the built-in toolchain table
    pub async fn builtin_service(mode: ExecutionMode, limits: ResourceLimits) -> Result<TestService> {
        let scratch = TempDir::new()?;
        let service = CodeExecutionService::new(config(mode, limits, &scratch)).await?;

        Ok(TestService {
            service,
            scratch,
            _toolchains: None,
        })
    }

    /// Service using a toolchain table given as TOML text
    pub async fn service_with_toolchains(
        mode: ExecutionMode,
        limits: ResourceLimits,
        toolchains: &str,
    ) -> Result<TestService> {
        customized_service(mode, limits, toolchains, |config| config).await
    }

    /// Like [`service_with_toolchains`], with a final say over the config
    pub async fn customized_service(
        mode: ExecutionMode,
        limits: ResourceLimits,
        toolchains: &str,
        customize: impl FnOnce(RunnerConfig) -> RunnerConfig,
    ) -> Result<TestService> {
        let scratch = TempDir::new()?;
        let table_dir = TempDir::new()?;
        let table = table_dir.path().join("toolchains.toml");
        std::fs::write(&table, toolchains)?;

        let config = customize(config(mode, limits, &scratch).with_toolchains(table));
        let service = CodeExecutionService::new(config).await?;

        Ok(TestService {
            service,
            scratch,
            _toolchains: Some(table_dir),
        })
    }
}

pub fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| which::which(**tool).is_err())
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}
