use thiserror::Error;

use crate::types::FailureReason;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Code rejected for safety: {0}")]
    RejectedUnsafeInput(String),

    #[error("Toolchain unavailable: {0}")]
    ToolchainUnavailable(String),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("Invalid toolchain registry: {0}")]
    Registry(String),

    #[error("Scratch storage error: {0}")]
    Scratch(String),

    #[error("{0}")]
    Provider(#[from] remote_runner::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("System error: {0}")]
    System(String),
}

impl Error {
    /// Errors meaning the local pipeline could not run at all, as opposed to
    /// the submitted program failing.
    pub fn is_local_unavailable(&self) -> bool {
        matches!(self, Error::ToolchainUnavailable(_) | Error::Spawn(_))
    }

    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Error::InvalidRequest(_) => FailureReason::InvalidRequest,
            Error::UnsupportedLanguage(_) => FailureReason::UnsupportedLanguage,
            Error::RejectedUnsafeInput(_) => FailureReason::RejectedUnsafeInput,
            Error::ToolchainUnavailable(_) | Error::Provider(_) => {
                FailureReason::ProviderUnavailable
            }
            Error::Scratch(_) | Error::Io(_) => FailureReason::IoFailure,
            Error::Spawn(_) | Error::Registry(_) | Error::System(_) => FailureReason::Internal,
        }
    }
}
