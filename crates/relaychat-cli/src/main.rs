//! Relaychat terminal client.
//!
//! # Usage
//!
//! ```bash
//! # Local relay, stored or generated name
//! relaychat
//!
//! # Remote relay with an explicit name
//! relaychat --url wss://chat.example.com --name Alice
//! ```
//!
//! Diagnostics go to stderr so they never interleave with the conversation.

use clap::Parser;
use relaychat_cli::{Args, TerminalFrontend, args::DATABASE_FILE};
use relaychat_client::{Runtime, SystemEnv, WsTransport, open_data_dir};
use relaychat_core::{ConnectionManager, EndpointConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let backoff = args.backoff_config()?;

    let storage = open_data_dir(&args.data_dir, DATABASE_FILE)?;

    let env = SystemEnv::new();
    let endpoint = EndpointConfig::resolve(args.url, args.name, &storage, &env)?;
    tracing::info!("Connecting to {} as {}", endpoint.url, endpoint.display_name);

    let manager = ConnectionManager::new(env, storage, endpoint, backoff);
    Runtime::new(manager, WsTransport::new(), TerminalFrontend::stdio()).run().await?;

    tracing::info!("Relaychat stopped");
    Ok(())
}
