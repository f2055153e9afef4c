use serde::{Deserialize, Serialize};

/// Language name and version index understood by the primary provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub language: String,
    pub version_index: String,
}

/// One program to run remotely
#[derive(Debug, Clone)]
pub struct RemoteJob {
    /// Canonical language name, sent as-is to the secondary runner
    pub language: String,
    /// Primary provider mapping; `None` means the primary cannot run it
    pub dialect: Option<Dialect>,
    pub code: String,
    pub stdin: String,
}

impl RemoteJob {
    pub fn new(language: &str, code: &str, stdin: &str) -> Self {
        Self {
            language: language.to_string(),
            dialect: None,
            code: code.to_string(),
            stdin: stdin.to_string(),
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }
}

/// Normalized answer from a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOutput {
    pub output: String,
    pub error: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrimaryPayload<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub script: &'a str,
    pub stdin: &'a str,
    pub language: &'a str,
    pub version_index: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SecondaryPayload<'a> {
    pub language: &'a str,
    pub code: &'a str,
    pub stdin: &'a str,
}

/// Loose response body; providers disagree on field names.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProviderBody {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}
