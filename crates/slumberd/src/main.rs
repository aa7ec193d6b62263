use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use slumberd::Config;
use slumberd::Engine;
use slumberd::api;
use tracing_subscriber::filter::LevelFilter;

/// Bed monitoring daemon
#[derive(Parser)]
#[command(name = "slumberd", version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "slumberd.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)?;

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(config.logging.level))
        .init();

    tracing::info!("slumberd starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    // Build the engine and register all configured integrations
    let mut engine = Engine::new();
    engine.register_integrations_from_config(&config)?;
    let engine = Arc::new(engine);

    // Run the engine event loop in the background
    let engine_task = {
        let engine = engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.run().await {
                tracing::error!("Engine stopped with error: {}", e);
            }
        })
    };

    // Start the HTTP API
    let (api_shutdown_tx, api_shutdown_rx) = tokio::sync::oneshot::channel();
    let api_task = {
        let engine = engine.clone();
        let listen = config.api.listen.clone();
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = api::serve(listen, port, engine, api_shutdown_rx).await {
                tracing::error!("API server error: {}", e);
            }
        })
    };

    tracing::info!("slumberd running, press Ctrl+C to exit");

    // Wait for Ctrl+C
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received shutdown signal");
        }
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    let _ = api_shutdown_tx.send(());
    let _ = api_task.await;
    engine_task.abort();

    tracing::info!("slumberd shutdown complete");

    Ok(())
}
