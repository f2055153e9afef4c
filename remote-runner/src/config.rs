use std::time::Duration;

pub const DEFAULT_PRIMARY_ENDPOINT: &str = "https://api.jdoodle.com/v1/execute";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials and endpoint for the primary (JDoodle-compatible) provider
#[derive(Debug, Clone)]
pub struct PrimaryConfig {
    /// Execute endpoint
    pub endpoint: String,

    pub client_id: String,

    pub client_secret: String,

    /// Upper bound for a single HTTP round trip
    pub timeout: Duration,
}

impl PrimaryConfig {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            endpoint: DEFAULT_PRIMARY_ENDPOINT.to_string(),
            client_id,
            client_secret,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Builds a config only when both halves of the credential pair are present
    /// and non-empty.
    pub fn from_parts(client_id: Option<String>, client_secret: Option<String>) -> Option<Self> {
        match (client_id, client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(Self::new(id, secret))
            }
            _ => None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Endpoint and optional bearer key for the secondary generic runner
#[derive(Debug, Clone)]
pub struct SecondaryConfig {
    pub endpoint: String,

    pub api_key: Option<String>,

    pub timeout: Duration,
}

impl SecondaryConfig {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            api_key: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_parts(endpoint: Option<String>, api_key: Option<String>) -> Option<Self> {
        let endpoint = endpoint.filter(|e| !e.is_empty())?;
        let config = Self::new(endpoint);
        Some(match api_key.filter(|k| !k.is_empty()) {
            Some(key) => config.with_api_key(key),
            None => config,
        })
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
