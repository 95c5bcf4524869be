//! HTTP/WebSocket server and the simulation tick loop

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vnsim_core::{TelemetryBatch, VehicleState};
use vnsim_uds::EcuSnapshot;

use crate::adapter::Connection;
use crate::protocol::ServerMessage;
use crate::state::AppState;

/// Create the router: WebSocket endpoint at `ws_path` plus inspection routes
pub fn create_router(state: AppState, ws_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/ecu", get(ecu_snapshot))
        .route("/vehicle", get(vehicle_state))
        .route(ws_path, get(upgrade_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ecu_snapshot(State(state): State<AppState>) -> Json<EcuSnapshot> {
    Json(state.engine.snapshot())
}

async fn vehicle_state(State(state): State<AppState>) -> Json<VehicleState> {
    Json(state.simulator.state())
}

async fn upgrade_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| client_loop(socket, state))
}

async fn client_loop(mut socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    let mut telemetry = state.broadcaster.subscribe();
    let (outbox, mut responses) = mpsc::unbounded_channel();
    let connection = Connection::new(id, state, outbox);
    info!(connection = %id, "Client connected");

    loop {
        tokio::select! {
            batch = next_batch(&mut telemetry, id) => {
                let Some(batch) = batch else {
                    break;
                };

                let mut delivered = true;
                for frame in batch.iter() {
                    if !send(&mut socket, &ServerMessage::CanMessage(frame.clone())).await {
                        delivered = false;
                        break;
                    }
                }
                if !delivered {
                    break;
                }
            }
            Some(response) = responses.recv() => {
                if !send(&mut socket, &response).await {
                    break;
                }
            }
            message = socket.recv() => {
                let Some(Ok(message)) = message else {
                    break;
                };

                match message {
                    Message::Text(text) => connection.handle_text(text.as_str()),
                    Message::Binary(_) => {
                        debug!(connection = %id, "Ignoring binary frame");
                    }
                    Message::Ping(_) | Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }
        }
    }

    info!(connection = %connection.id(), "Client disconnected");
}

/// Next telemetry batch for a client; a lagging client skips the frames it
/// missed and stays connected. `None` once the broadcaster is gone.
async fn next_batch(
    telemetry: &mut broadcast::Receiver<TelemetryBatch>,
    id: Uuid,
) -> Option<TelemetryBatch> {
    loop {
        match telemetry.recv().await {
            Ok(batch) => return Some(batch),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(connection = %id, skipped, "Client lagged behind; skipping telemetry");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Serialize and send; false once the socket is gone
async fn send(socket: &mut WebSocket, message: &ServerMessage) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "Failed to serialize server message");
            return true;
        }
    };
    socket.send(Message::Text(text.into())).await.is_ok()
}

/// Advance the simulator every period and publish the resulting frames
pub fn spawn_tick_loop(state: AppState, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = state.simulator.tick_period();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis() as u64, "Simulation started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let vehicle = state.simulator.tick();
                    let timestamp = chrono::Utc::now().timestamp_millis();
                    state.broadcaster.publish(&vehicle, timestamp);
                }
                _ = shutdown.changed() => break,
            }
        }

        info!("Simulation stopped");
    })
}

/// Builder for the simulator server
pub struct ServerBuilder {
    listen: SocketAddr,
    ws_path: String,
    state: AppState,
}

impl ServerBuilder {
    pub fn new(listen: SocketAddr, state: AppState) -> Self {
        Self {
            listen,
            ws_path: "/ws".to_string(),
            state,
        }
    }

    pub fn ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = path.into();
        self
    }

    /// Bind, start the tick loop and serve; returns a shutdown handle
    pub async fn spawn(self) -> anyhow::Result<ServerHandle> {
        let listener = TcpListener::bind(self.listen).await?;
        let local_addr = listener.local_addr()?;

        let app = create_router(self.state.clone(), &self.ws_path);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let ticker = spawn_tick_loop(self.state, shutdown_tx.subscribe());
        let server = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });
            if let Err(err) = serve.await {
                warn!(error = %err, "Server exited with error");
            }
        });

        info!(address = %local_addr, path = %self.ws_path, "Listening");
        Ok(ServerHandle {
            address: local_addr,
            shutdown: shutdown_tx,
            tasks: vec![ticker, server],
        })
    }
}

/// Handle for a running server
pub struct ServerHandle {
    address: SocketAddr,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Stop the tick loop and the server, then wait for both
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            task.await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use vnsim_core::{ControlCommand, TelemetryBroadcaster, VehicleSimulator};
    use vnsim_uds::tables::{default_dids, default_dtcs};
    use vnsim_uds::DiagnosticEngine;

    use crate::latency::ImmediateLatency;

    fn state() -> AppState {
        AppState::new(
            Arc::new(VehicleSimulator::new(Duration::from_millis(100))),
            Arc::new(DiagnosticEngine::new(default_dtcs(), default_dids())),
            TelemetryBroadcaster::new(16),
            Arc::new(ImmediateLatency),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_loop_publishes_each_period() {
        let state = state();
        state
            .simulator
            .apply(&ControlCommand::pressed("accelerate", true));
        let mut telemetry = state.broadcaster.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = spawn_tick_loop(state.clone(), shutdown_rx);

        let first = telemetry.recv().await.unwrap();
        assert_eq!(first.len(), 6);
        assert_eq!(first[0].raw_value, 2.0);
        assert_eq!(first[1].raw_value, 900.0);

        let second = telemetry.recv().await.unwrap();
        assert_eq!(second[0].raw_value, 4.0);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(state.simulator.state().speed, 4.0);
    }

    #[tokio::test]
    async fn test_lagging_client_skips_frames() {
        let broadcaster = TelemetryBroadcaster::new(1);
        let mut telemetry = broadcaster.subscribe();
        let id = Uuid::new_v4();

        let mut vehicle = VehicleState::default();
        for speed in [1.0, 2.0, 3.0] {
            vehicle.speed = speed;
            broadcaster.publish(&vehicle, 0);
        }

        // Only the newest batch survives a capacity of one
        let batch = next_batch(&mut telemetry, id).await.unwrap();
        assert_eq!(batch[0].raw_value, 3.0);

        vehicle.speed = 4.0;
        broadcaster.publish(&vehicle, 0);
        let batch = next_batch(&mut telemetry, id).await.unwrap();
        assert_eq!(batch[0].raw_value, 4.0);

        drop(broadcaster);
        assert!(next_batch(&mut telemetry, id).await.is_none());
    }
}
