//! Concurrent URL fan-out fetch service.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /api/v1/handle ["url", ...]
//!         │
//!         ▼
//!     ┌──────────┐   ┌───────────┐   ┌────────────────────────────┐
//!     │   http   │──▶│ admission │──▶│ logging → metrics → fanout │
//!     │ (decode) │   │ (permits) │   │  validate, one task / URL  │
//!     └──────────┘   └───────────┘   └─────────────┬──────────────┘
//!         ▲                                        │
//!         │        ordered bodies or one error     ▼
//!         └─────────────────────────────────  upstream origins
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use fanout_fetch::config;
use fanout_fetch::lifecycle;
use fanout_fetch::observability::logging;

#[derive(Parser)]
#[command(name = "fanout-fetch", version, about = "Fetch batches of URLs concurrently", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fanout-fetch: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fanout-fetch starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_urls = config.limits.max_urls,
        admission_capacity = config.limits.admission_capacity,
        request_timeout_ms = config.timeouts.request_ms,
        fetch_timeout_ms = config.timeouts.fetch_ms,
        "Configuration loaded"
    );

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fanout-fetch exited with error");
            ExitCode::FAILURE
        }
    }
}
