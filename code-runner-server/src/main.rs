use clap::Parser;
use code_runner::{ExecutionMode, PrimaryConfig, ResourceLimits, RunnerConfig, SecondaryConfig};
use code_runner_server::{create_app, run_server};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, env = "CODE_RUNNER_ADDR", default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// Execution mode: auto, local, remote-primary or remote-secondary
    #[arg(long, env = "CODE_RUN_MODE", default_value = "auto")]
    mode: ExecutionMode,

    /// Maximum number of concurrent executions
    #[arg(
        short,
        long,
        env = "CODE_RUNNER_MAX_CONCURRENT",
        default_value = "10",
        value_parser = at_least_one()
    )]
    max_concurrent: usize,

    /// Directory for per-request scratch files
    #[arg(long, env = "CODE_RUNNER_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// TOML file replacing the built-in toolchain table
    #[arg(long, env = "CODE_RUNNER_TOOLCHAINS")]
    toolchains: Option<PathBuf>,

    /// Wall-clock limit per compile or run step, in seconds
    #[arg(
        long,
        env = "CODE_RUNNER_TIMEOUT_SECS",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,

    /// Captured bytes per output stream
    #[arg(
        long,
        env = "CODE_RUNNER_MAX_OUTPUT_BYTES",
        default_value = "262144", // 256KB
        value_parser = at_least_one()
    )]
    max_output_bytes: usize,

    /// CPU time limit in seconds
    #[arg(long, default_value = "10")]
    cpu_time_limit: u64,

    /// File size limit in bytes
    #[arg(long, default_value = "10485760")] // 10MB
    file_size_limit: u64,

    #[arg(long, env = "JDOODLE_CLIENT_ID", hide_env_values = true)]
    jdoodle_client_id: Option<String>,

    #[arg(long, env = "JDOODLE_CLIENT_SECRET", hide_env_values = true)]
    jdoodle_client_secret: Option<String>,

    /// Primary provider endpoint override
    #[arg(long, env = "JDOODLE_ENDPOINT")]
    jdoodle_endpoint: Option<String>,

    /// Secondary remote runner endpoint
    #[arg(long, env = "RUNNER_API_URL")]
    runner_api_url: Option<String>,

    #[arg(long, env = "RUNNER_API_KEY", hide_env_values = true)]
    runner_api_key: Option<String>,
}

fn at_least_one() -> clap::builder::RangedU64ValueParser<usize> {
    clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
}

impl Args {
    fn runner_config(self) -> RunnerConfig {
        let limits = ResourceLimits {
            wall_clock_timeout: Duration::from_secs(self.timeout_secs),
            max_output_bytes: self.max_output_bytes,
            cpu_time: self.cpu_time_limit,
            file_size: self.file_size_limit,
        };

        let mut config = RunnerConfig::new(self.mode)
            .with_max_concurrent(self.max_concurrent)
            .with_limits(limits);

        if let Some(dir) = self.scratch_dir {
            config = config.with_scratch_dir(dir);
        }
        if let Some(path) = self.toolchains {
            config = config.with_toolchains(path);
        }

        match PrimaryConfig::from_parts(self.jdoodle_client_id, self.jdoodle_client_secret) {
            Some(primary) => {
                let primary = match self.jdoodle_endpoint {
                    Some(endpoint) => primary.with_endpoint(endpoint),
                    None => primary,
                };
                config = config.with_primary(primary);
            }
            None => info!("Primary provider credentials not set, primary provider disabled"),
        }

        match SecondaryConfig::from_parts(self.runner_api_url, self.runner_api_key) {
            Some(secondary) => config = config.with_secondary(secondary),
            None => info!("RUNNER_API_URL not set, remote runner disabled"),
        }

        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let addr = args.addr;

    let app = create_app(args.runner_config()).await?;
    run_server(app, addr).await?;

    Ok(())
}
