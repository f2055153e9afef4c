use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Java,
    C,
    Cpp,
    Go,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Python,
        Language::JavaScript,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::Go,
    ];

    /// Canonical lowercase name, also the key used in the toolchain table
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Go => "go",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" | "nodejs" => Ok(Language::JavaScript),
            "java" => Ok(Language::Java),
            "c" => Ok(Language::C),
            "cpp" | "c++" => Ok(Language::Cpp),
            "go" | "golang" => Ok(Language::Go),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

/// Code execution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Language identifier as submitted; resolved through the registry
    pub language: String,
    /// Source code to execute
    pub code: String,
    /// Bytes fed to the program's standard input
    #[serde(default)]
    pub stdin: String,
}

impl ExecutionRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            stdin: String::new(),
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = stdin.into();
        self
    }
}

/// Why an execution did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidRequest,
    UnsupportedLanguage,
    RejectedUnsafeInput,
    CompileFailure,
    RuntimeFailure,
    Timeout,
    OutputLimitExceeded,
    IoFailure,
    ProviderUnavailable,
    Internal,
}

impl FailureReason {
    /// Fallback text when no diagnostic output is available
    pub fn description(&self) -> &'static str {
        match self {
            FailureReason::InvalidRequest => "Code and language are required",
            FailureReason::UnsupportedLanguage => "unsupported language",
            FailureReason::RejectedUnsafeInput => "code rejected for safety",
            FailureReason::CompileFailure => "compilation failed",
            FailureReason::RuntimeFailure => "program exited abnormally",
            FailureReason::Timeout => "execution timed out",
            FailureReason::OutputLimitExceeded => "output limit exceeded",
            FailureReason::IoFailure => "scratch storage failure",
            FailureReason::ProviderUnavailable => "no execution provider available",
            FailureReason::Internal => "internal error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Result of one execution, whichever path produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Program output (stdout), trimmed
    pub stdout: String,
    /// Program errors (stderr), verbatim
    pub stderr: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
}

impl ExecutionOutcome {
    pub fn success(stdout: String) -> Self {
        Self {
            stdout,
            stderr: String::new(),
            succeeded: true,
            failure_reason: None,
        }
    }

    pub fn failure(reason: FailureReason, stdout: String, stderr: String) -> Self {
        Self {
            stdout,
            stderr,
            succeeded: false,
            failure_reason: Some(reason),
        }
    }

    /// Human-readable error text; empty on success.
    ///
    /// Limit hits always report the limit, everything else prefers the
    /// captured diagnostics.
    pub fn error_message(&self) -> String {
        match self.failure_reason {
            None => self.stderr.clone(),
            Some(reason @ (FailureReason::Timeout | FailureReason::OutputLimitExceeded)) => {
                reason.description().to_string()
            }
            Some(reason) if self.stderr.trim().is_empty() => reason.description().to_string(),
            Some(_) => self.stderr.clone(),
        }
    }
}

/// Resource limits applied to every compile and run step.
///
/// These are system-wide; requests cannot raise them.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Wall-clock deadline per process
    pub wall_clock_timeout: Duration,
    /// Captured bytes per output stream
    pub max_output_bytes: usize,
    /// Maximum CPU time (seconds), enforced with RLIMIT_CPU
    pub cpu_time: u64,
    /// Maximum file size (bytes) a child may write
    pub file_size: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            wall_clock_timeout: Duration::from_secs(10),
            max_output_bytes: 256 * 1024, // 256KB
            cpu_time: 10,
            file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}
