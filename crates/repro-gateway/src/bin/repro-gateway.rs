//! Repro Gateway Binary
//!
//! # Usage
//! ```bash
//! repro-gateway [--port 8090] [--host 127.0.0.1] [--verbose]
//! ```

use clap::Parser;
use repro_core::ReproConfig;
use repro_gateway::{Gateway, GatewayConfig};

/// Repro Gateway - automated bug reproduction service
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = repro_gateway::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = repro_gateway::DEFAULT_HOST)]
    host: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = GatewayConfig::default()
        .with_host(args.host.clone())
        .with_port(args.port);
    let repro = ReproConfig::from_env();

    tracing::info!(
        provider = %repro.llm_provider,
        model = %repro.llm_model,
        max_attempts = repro.max_attempts,
        data_dir = %repro.data_dir.display(),
        "configuration loaded"
    );
    println!("repro-gateway listening on http://{}:{}", args.host, args.port);
    println!("  POST /reproduce                         submit a bug report");
    println!("  GET  /result/{{job_id}}                   job status / result");
    println!("  GET  /result/{{job_id}}/script            final script");
    println!("  GET  /result/{{job_id}}/screenshot/{{f}}    captured screenshot");
    println!("  GET  /health                            health check");

    let gateway = Gateway::new(config, repro)?;
    gateway.start().await?;

    Ok(())
}
