//! CLI for keysub
//!
//! Usage: `keysub <PORT>`

use std::process::ExitCode;

use clap::Parser;
use keysub::broker::Broker;
use keysub::config::load_config;
use keysub::transport::start_websocket_server;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "keysub", about = "Keyword-aware publish/subscribe broker")]
struct Args {
    /// Port to listen on
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    keysub::utils::logging::init("info");

    let args = Args::parse();

    match run_server(args.port).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_config(port)?;
    let broker = Broker::shared();

    tokio::spawn(Broker::start_liveness_loop(
        broker.clone(),
        settings.broker.liveness_interval(),
    ));

    tokio::select! {
        result = start_websocket_server(broker, settings) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}
