//! In-process gateway wired to the in-memory bus and queue.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use roulette_gateway::api;
use roulette_gateway::app_state::AppState;
use roulette_gateway::domain::SessionRegistry;
use roulette_gateway::queue::{MemoryWorkQueue, WorkQueue};
use roulette_gateway::rpc::{Broker, RpcClient, RpcEnvelope, RpcSettings, shard_channel};
use roulette_gateway::service::{BetService, EventRelay, RoundResolver};
use roulette_gateway::transport::{MemoryTransport, Transport};
use tokio::task::JoinHandle;

/// Handles on the collaborators of a test gateway.
pub struct Gateway {
    pub app: Router,
    pub bus: Arc<MemoryTransport>,
    pub queue: Arc<MemoryWorkQueue>,
    pub sessions: Arc<SessionRegistry>,
    pub relay: JoinHandle<()>,
}

/// Builds the full application over an in-memory bus.
pub async fn gateway() -> Gateway {
    let bus = Arc::new(MemoryTransport::default());
    let queue = Arc::new(MemoryWorkQueue::new());
    let transport: Arc<dyn Transport> = Arc::clone(&bus) as Arc<dyn Transport>;
    let broker: Arc<dyn Broker> = Arc::new(RpcClient::start(
        Arc::clone(&transport),
        RpcSettings::default(),
    ));
    let sessions = Arc::new(SessionRegistry::new());

    let rounds = RoundResolver::new(Arc::clone(&broker), 35);
    let bet_service = BetService::new(
        rounds,
        Arc::clone(&queue) as Arc<dyn WorkQueue>,
        Arc::clone(&sessions),
    );
    let Ok(relay) = EventRelay::new(broker, Arc::clone(&sessions)).start().await else {
        panic!("event relay should start");
    };

    let app = api::build_app(AppState {
        bet_service,
        sessions: Arc::clone(&sessions),
        bus: transport,
    });
    Gateway {
        app,
        bus,
        queue,
        sessions,
        relay,
    }
}

/// Serves `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind should succeed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener should have an address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Round service stand-in answering every `get-round` request with `round`.
pub async fn round_worker(bus: Arc<MemoryTransport>, round: serde_json::Value) -> JoinHandle<()> {
    let channel = shard_channel("get-round", 1);
    let _ = bus.subscribe(&channel).await;
    let mut feed = bus.messages();
    tokio::spawn(async move {
        while let Ok(message) = feed.recv().await {
            if message.channel != channel {
                continue;
            }
            let Ok(envelope) = serde_json::from_str::<RpcEnvelope>(&message.payload) else {
                continue;
            };
            let reply = serde_json::json!({
                "correlationId": envelope.correlation_id,
                "data": round.clone(),
            });
            let _ = bus
                .publish(&envelope.reply_channel, &reply.to_string())
                .await;
        }
    })
}

/// Polls `check` every 10 ms until it holds, failing after five seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check().await {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
