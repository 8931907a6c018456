use clap::Parser;
use cyclone_dns_domain::{CliOverrides, Destination};
use cyclone_dns_engine::DnsServer;
use std::sync::Arc;
use tracing::info;

mod bootstrap;
mod forwarder;

#[derive(Parser)]
#[command(name = "cyclone-dns")]
#[command(version)]
#[command(about = "Cyclone DNS - cycle-driven DNS forwarding server")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// UDP listen port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Upstream resolver, e.g. udp://8.8.8.8:53
    #[arg(short = 'u', long)]
    upstream: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        udp_port: cli.port,
        bind_address: cli.bind.clone(),
        upstream: cli.upstream.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting Cyclone DNS v{}", env!("CARGO_PKG_VERSION"));

    let upstream: Destination = config
        .forward
        .upstream
        .parse()
        .map_err(anyhow::Error::msg)?;
    info!(upstream = %upstream, "forwarding to upstream resolver");

    let mut server = DnsServer::new(config)?;
    server.set_handler(Arc::new(forwarder::ForwardHandler::new(upstream)))?;
    server.listen().await?;

    info!("Server ready");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    server.pause()?;
    Ok(())
}
