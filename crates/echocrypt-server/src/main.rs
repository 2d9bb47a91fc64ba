//! EchoCrypt server binary.
//!
//! # Usage
//!
//! ```bash
//! echocrypt-server --bind 0.0.0.0:8080 --log-level debug
//! ```

use clap::Parser;
use echocrypt_server::{Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// EchoCrypt relay server
#[derive(Parser, Debug)]
#[command(name = "echocrypt-server")]
#[command(about = "Ciphertext relay and membership server for EchoCrypt")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("EchoCrypt server starting");

    let server = Server::bind(ServerRuntimeConfig { bind_address: args.bind }).await?;

    tracing::info!("server bound to {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
