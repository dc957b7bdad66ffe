//! roulette-gateway server entry point.
//!
//! Connects the bus, starts the event relay and serves the WebSocket and
//! HTTP endpoints until Ctrl-C.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use roulette_gateway::api;
use roulette_gateway::app_state::AppState;
use roulette_gateway::config::{BusBackend, GatewayConfig, LogFormat};
use roulette_gateway::domain::SessionRegistry;
use roulette_gateway::queue::{MemoryWorkQueue, RedisWorkQueue, WorkQueue};
use roulette_gateway::rpc::{Broker, RpcClient};
use roulette_gateway::service::{BetService, EventRelay, RoundResolver};
use roulette_gateway::transport::{MemoryTransport, RedisTransport, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config =
        GatewayConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, backend = ?config.bus_backend, "starting roulette-gateway");

    // Connect the bus and the work queue
    let (transport, queue): (Arc<dyn Transport>, Arc<dyn WorkQueue>) = match config.bus_backend {
        BusBackend::Redis => {
            let transport =
                RedisTransport::connect(&config.redis_url, config.event_bus_capacity).await?;
            let queue = RedisWorkQueue::connect(
                &config.redis_url,
                &config.queue_key_prefix,
                &config.bet_queue_name,
            )
            .await?;
            let transport: Arc<dyn Transport> = Arc::new(transport);
            let queue: Arc<dyn WorkQueue> = Arc::new(queue);
            (transport, queue)
        }
        BusBackend::Memory => {
            tracing::warn!("in-memory bus selected: no other instance or worker can join");
            let transport: Arc<dyn Transport> =
                Arc::new(MemoryTransport::new(config.event_bus_capacity));
            let queue: Arc<dyn WorkQueue> = Arc::new(MemoryWorkQueue::new());
            (transport, queue)
        }
    };

    // Build service layer
    let broker: Arc<dyn Broker> = Arc::new(RpcClient::start(
        Arc::clone(&transport),
        config.rpc_settings(),
    ));
    let sessions = Arc::new(SessionRegistry::new());
    let rounds = RoundResolver::new(Arc::clone(&broker), config.round_cache_ttl_secs);
    let bet_service = BetService::new(rounds, queue, Arc::clone(&sessions));
    let relay = EventRelay::new(broker, Arc::clone(&sessions)).start().await?;

    // Build application state and router
    let app = api::build_app(AppState {
        bet_service,
        sessions,
        bus: transport,
    });

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    relay.abort();
    tracing::info!("roulette-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
