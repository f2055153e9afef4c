use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::{
    config::{PrimaryConfig, SecondaryConfig},
    error::Error,
    types::{PrimaryPayload, ProviderBody, RemoteJob, RemoteOutput, SecondaryPayload},
};

/// A remote service able to run a [`RemoteJob`]
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    /// Short provider name used in logs and error messages
    fn name(&self) -> &'static str;

    async fn execute(&self, job: &RemoteJob) -> Result<RemoteOutput, Error>;
}

/// Client for the primary, JDoodle-compatible provider
pub struct PrimaryClient {
    client: Client,
    config: PrimaryConfig,
}

impl PrimaryClient {
    pub fn new(config: PrimaryConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl RemoteProvider for PrimaryClient {
    fn name(&self) -> &'static str {
        "primary provider"
    }

    async fn execute(&self, job: &RemoteJob) -> Result<RemoteOutput, Error> {
        let dialect = job
            .dialect
            .as_ref()
            .ok_or_else(|| Error::UnsupportedLanguage(job.language.clone()))?;

        debug!(
            "Submitting {} job to {} as {}/{}",
            job.language, self.config.endpoint, dialect.language, dialect.version_index
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .json(&PrimaryPayload {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                script: &job.code,
                stdin: &job.stdin,
                language: &dialect.language,
                version_index: &dialect.version_index,
            })
            .send()
            .await?;

        let body = read_body(self.name(), response).await?;

        Ok(RemoteOutput {
            output: body.output.unwrap_or_default().trim().to_string(),
            error: String::new(),
            success: true,
        })
    }
}

/// Client for the secondary, generic remote runner
pub struct SecondaryClient {
    client: Client,
    config: SecondaryConfig,
}

impl SecondaryClient {
    pub fn new(config: SecondaryConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl RemoteProvider for SecondaryClient {
    fn name(&self) -> &'static str {
        "remote runner"
    }

    async fn execute(&self, job: &RemoteJob) -> Result<RemoteOutput, Error> {
        debug!("Submitting {} job to {}", job.language, self.config.endpoint);

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .json(&SecondaryPayload {
                language: &job.language,
                code: &job.code,
                stdin: &job.stdin,
            });

        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let body = read_body(self.name(), request.send().await?).await?;

        let output = body.output.or(body.stdout).unwrap_or_default();
        let error = body.error.or(body.stderr).unwrap_or_default();
        let error = error.trim().to_string();

        Ok(RemoteOutput {
            output: output.trim().to_string(),
            success: error.is_empty(),
            error,
        })
    }
}

/// Turns a provider response into its body, or into [`Error::Api`] for
/// non-2xx answers. Error bodies are parsed leniently; success bodies must be
/// JSON objects.
async fn read_body(provider: &'static str, response: Response) -> Result<ProviderBody, Error> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let body: ProviderBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body
            .error
            .filter(|m| !m.is_empty())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Run failed".to_string());

        return Err(Error::Api {
            status_code: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| Error::MalformedResponse {
        provider,
        message: e.to_string(),
    })
}
