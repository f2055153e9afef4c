//! # Remote Runner
//!
//! HTTP clients for sandboxed-execution APIs, used when code cannot be run on
//! the local host.
//!
//! Two providers are supported:
//!
//! - [`PrimaryClient`]: a JDoodle-compatible `execute` endpoint. It needs a
//!   client id/secret pair and a provider-specific language dialect.
//! - [`SecondaryClient`]: a generic remote runner accepting
//!   `{language, code, stdin}` with an optional bearer key.
//!
//! Both implement [`RemoteProvider`] and return a [`RemoteOutput`]. Transport
//! failures, non-2xx answers and unreadable bodies come back as [`Error`];
//! nothing panics on bad input from the network.
//!
//! ## Example
//!
//! ```rust,no_run
//! use remote_runner::{RemoteJob, RemoteProvider, SecondaryClient, SecondaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SecondaryConfig::new("https://runner.example.com/run".to_string());
//!     let client = SecondaryClient::new(config)?;
//!
//!     let job = RemoteJob::new("python", r#"print("ok")"#, "");
//!     let output = client.execute(&job).await?;
//!     println!("{}", output.output);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod types;

pub use client::{PrimaryClient, RemoteProvider, SecondaryClient};
pub use config::{PrimaryConfig, SecondaryConfig};
pub use error::Error;
pub use types::*;

/// Result type for remote execution operations
pub type Result<T> = std::result::Result<T, Error>;
