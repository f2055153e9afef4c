use remote_runner::{PrimaryConfig, SecondaryConfig};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::ResourceLimits;

/// Which execution paths are attempted, and in what order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Local first; remote primary then secondary when local is unavailable
    #[default]
    Auto,
    Local,
    RemotePrimary,
    RemoteSecondary,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(ExecutionMode::Auto),
            "local" => Ok(ExecutionMode::Local),
            "remote-primary" | "primary" | "jdoodle" => Ok(ExecutionMode::RemotePrimary),
            "remote-secondary" | "secondary" | "remote" => Ok(ExecutionMode::RemoteSecondary),
            other => Err(format!("Unknown execution mode: {}", other)),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionMode::Auto => "auto",
            ExecutionMode::Local => "local",
            ExecutionMode::RemotePrimary => "remote-primary",
            ExecutionMode::RemoteSecondary => "remote-secondary",
        })
    }
}

/// Service configuration, read once at startup
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub mode: ExecutionMode,

    /// Shared directory for per-request scratch files
    pub scratch_dir: PathBuf,

    /// Maximum number of executions in flight
    pub max_concurrent: usize,

    pub limits: ResourceLimits,

    /// Replacement toolchain table; the built-in one is used when unset
    pub toolchains: Option<PathBuf>,

    pub primary: Option<PrimaryConfig>,

    pub secondary: Option<SecondaryConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Auto,
            scratch_dir: std::env::temp_dir().join("code-runner"),
            max_concurrent: 10,
            limits: ResourceLimits::default(),
            toolchains: None,
            primary: None,
            secondary: None,
        }
    }
}

impl RunnerConfig {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_scratch_dir(mut self, scratch_dir: PathBuf) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_toolchains(mut self, path: PathBuf) -> Self {
        self.toolchains = Some(path);
        self
    }

    pub fn with_primary(mut self, primary: PrimaryConfig) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn with_secondary(mut self, secondary: SecondaryConfig) -> Self {
        self.secondary = Some(secondary);
        self
    }
}
