use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{provider} not configured")]
    NotConfigured { provider: &'static str },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("{message}")]
    Api { status_code: u16, message: String },

    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },
}
