// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use serial_telemetry_monitor::application::bridge_service::BridgeService;
use serial_telemetry_monitor::domain::telemetry::ConnectionInfo;
use serial_telemetry_monitor::infrastructure::config::load_monitor_config;
use serial_telemetry_monitor::infrastructure::serial_link::{
    CommandWriter, DisconnectedWriter, SerialLink, available_port_names,
};
use serial_telemetry_monitor::presentation::app_state::AppState;
use serial_telemetry_monitor::presentation::router::build_router;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const LINE_QUEUE: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration; positional arguments are `<port> <baud>`
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_monitor_config(&args)?;

    // Open the device (infrastructure layer). The server still starts without it.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(LINE_QUEUE);
    let writer: Arc<dyn CommandWriter> = match SerialLink::open(&config.serial) {
        Ok(link) => Arc::new(link.start(line_tx)?),
        Err(e) => {
            tracing::error!("{:#}", e);
            tracing::info!("Available serial ports: {:?}", available_port_names());
            Arc::new(DisconnectedWriter {
                port: config.serial.port.clone(),
            })
        }
    };

    // Create services (application layer)
    let bridge = Arc::new(BridgeService::new(
        ConnectionInfo::new(config.serial.port.clone(), config.serial.baud),
        config.serial.columns.clone(),
        &config.stream,
        writer,
    ));

    let pump = bridge.clone();
    tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            pump.ingest_line(&line).await;
        }
        tracing::warn!("Serial line stream closed");
    });

    let state = Arc::new(AppState { bridge });

    // Build router (presentation layer)
    let router = build_router(state, &config.server.static_dir);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting serial-telemetry-monitor on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
