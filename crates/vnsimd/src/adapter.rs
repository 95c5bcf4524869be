//! Per-connection transport adapter
//!
//! Routes client messages to the shared simulator and engine. Diagnostic
//! responses are computed on receipt and handed to a one-shot timer that
//! delivers them to this connection's outbox after the policy's delay.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;
use vnsim_uds::{DiagnosticRequest, DiagnosticResponse, NegativeResponseCode, UdsError};

use crate::protocol::{ClientMessage, MalformedUdsRequest, ServerMessage};
use crate::state::AppState;

/// Sending half of a connection's outbound queue
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// One client connection bound to the shared vehicle and ECU
pub struct Connection {
    id: Uuid,
    state: AppState,
    outbox: Outbox,
}

impl Connection {
    pub fn new(id: Uuid, state: AppState, outbox: Outbox) -> Self {
        Self { id, state, outbox }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle a raw text frame
    ///
    /// A `uds-request` with a readable service ID but an undecodable body is
    /// answered with IncorrectMessageLengthOrFormat. Anything else malformed is
    /// logged and dropped.
    pub fn handle_text(&self, text: &str) {
        let err = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => return self.handle(message),
            Err(err) => err,
        };
        match MalformedUdsRequest::salvage(text) {
            Some(malformed) => {
                warn!(
                    connection = %self.id,
                    service = format!("0x{:02X}", malformed.service_id),
                    error = %err,
                    "Undecodable diagnostic request"
                );
                let nrc = UdsError::negative(
                    malformed.service_id,
                    NegativeResponseCode::IncorrectMessageLengthOrFormat,
                );
                let response =
                    DiagnosticResponse::negative(&nrc).with_request_id(malformed.request_id);
                self.schedule(response);
            }
            None => {
                warn!(connection = %self.id, error = %err, "Invalid client message");
            }
        }
    }

    pub fn handle(&self, message: ClientMessage) {
        match message {
            ClientMessage::Control(command) => {
                debug!(connection = %self.id, action = %command.action, "Control received");
                self.state.simulator.apply(&command);
            }
            ClientMessage::UdsRequest(request) => self.submit(request),
        }
    }

    /// Process a diagnostic request and schedule delivery of its response
    fn submit(&self, request: DiagnosticRequest) {
        debug!(
            connection = %self.id,
            service = format!("0x{:02X}", request.service_id),
            "Diagnostic request received"
        );
        let response = self.state.engine.respond(&request);
        self.schedule(response);
    }

    /// Deliver a response to this connection once the policy's delay elapses
    fn schedule(&self, response: DiagnosticResponse) {
        let delay = self.state.latency.delay(&response);
        debug!(
            connection = %self.id,
            response = format!("0x{:02X}", response.service_id),
            delay_ms = delay.as_millis() as u64,
            "Scheduling diagnostic response"
        );

        let deadline = Instant::now() + delay;
        let outbox = self.outbox.clone();
        let id = self.id;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep_until(deadline).await;
            }
            if outbox.send(ServerMessage::UdsResponse(response)).is_err() {
                debug!(connection = %id, "Connection closed before response delivery");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::error::TryRecvError;
    use vnsim_core::{TelemetryBroadcaster, VehicleSimulator};
    use vnsim_uds::tables::{default_dids, default_dtcs};
    use vnsim_uds::{DiagnosticEngine, SecurityLevel};

    use crate::latency::{FixedLatency, LatencyPolicy, SimulatedLatency};

    /// Slow for ReadDTCInformation, fast for everything else
    struct PerServiceLatency;

    impl LatencyPolicy for PerServiceLatency {
        fn delay(&self, response: &DiagnosticResponse) -> Duration {
            if response.service_id == 0x59 {
                Duration::from_millis(100)
            } else {
                Duration::from_millis(10)
            }
        }
    }

    fn state(latency: Arc<dyn LatencyPolicy>) -> AppState {
        AppState::new(
            Arc::new(VehicleSimulator::default()),
            Arc::new(DiagnosticEngine::new(default_dtcs(), default_dids())),
            TelemetryBroadcaster::new(4),
            latency,
        )
    }

    fn connect(
        state: &AppState,
    ) -> (Connection, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(Uuid::new_v4(), state.clone(), tx), rx)
    }

    fn uds_response(message: ServerMessage) -> DiagnosticResponse {
        match message {
            ServerMessage::UdsResponse(response) => response,
            other => panic!("unexpected message: {other:?}"),
        }
    }

    /// Let spawned delivery tasks run without moving the paused clock
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_positive_response_delayed() {
        let state = state(Arc::new(SimulatedLatency::default()));
        let (conn, mut rx) = connect(&state);

        conn.handle(ClientMessage::UdsRequest(
            DiagnosticRequest::new(0x22).with_payload([0xF1, 0x90]),
        ));
        settle().await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        tokio::time::advance(Duration::from_millis(49)).await;
        settle().await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        tokio::time::advance(Duration::from_millis(101)).await;
        settle().await;
        let resp = uds_response(rx.try_recv().unwrap());
        assert_eq!(resp.service_id, 0x62);
        assert_eq!(&resp.data[..2], &[0xF1, 0x90]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_response_after_fixed_delay() {
        let state = state(Arc::new(SimulatedLatency::default()));
        let (conn, mut rx) = connect(&state);

        conn.handle(ClientMessage::UdsRequest(DiagnosticRequest::new(0x99)));
        tokio::time::advance(Duration::from_millis(49)).await;
        settle().await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        let resp = uds_response(rx.try_recv().unwrap());
        assert_eq!(resp.service_id, 0x7F);
        assert_eq!(resp.data, vec![0x99, 0x11]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_responses_may_complete_out_of_order() {
        let state = state(Arc::new(PerServiceLatency));
        let (conn, mut rx) = connect(&state);

        conn.handle(ClientMessage::UdsRequest(
            DiagnosticRequest::new(0x19)
                .with_sub_function(0x0A)
                .with_request_id(1),
        ));
        conn.handle(ClientMessage::UdsRequest(
            DiagnosticRequest::new(0x14).with_request_id(2),
        ));

        tokio::time::advance(Duration::from_millis(150)).await;
        settle().await;
        let first = uds_response(rx.try_recv().unwrap());
        let second = uds_response(rx.try_recv().unwrap());
        assert_eq!(first.request_id, Some(2));
        assert_eq!(second.request_id, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_only_to_originating_connection() {
        let state = state(Arc::new(FixedLatency(Duration::from_millis(5))));
        let (alice, mut alice_rx) = connect(&state);
        let (_bob, mut bob_rx) = connect(&state);

        alice.handle(ClientMessage::UdsRequest(DiagnosticRequest::new(0x14)));
        tokio::time::advance(Duration::from_millis(10)).await;
        settle().await;

        assert!(alice_rx.try_recv().is_ok());
        assert_eq!(bob_rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_connection_discards_response() {
        let state = state(Arc::new(FixedLatency(Duration::from_millis(5))));
        let (conn, rx) = connect(&state);

        conn.handle(ClientMessage::UdsRequest(DiagnosticRequest::new(0x14)));
        drop(rx);
        tokio::time::advance(Duration::from_millis(10)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_shared_across_connections() {
        let state = state(Arc::new(FixedLatency(Duration::ZERO)));
        let (alice, mut alice_rx) = connect(&state);
        let (bob, mut bob_rx) = connect(&state);

        alice.handle(ClientMessage::UdsRequest(
            DiagnosticRequest::new(0x27).with_sub_function(0x01),
        ));
        settle().await;
        let seed_resp = uds_response(alice_rx.try_recv().unwrap());
        let seed = u16::from_be_bytes([seed_resp.data[1], seed_resp.data[2]]);

        bob.handle(ClientMessage::UdsRequest(
            DiagnosticRequest::new(0x27)
                .with_sub_function(0x02)
                .with_payload(seed.wrapping_add(1).to_be_bytes()),
        ));
        settle().await;
        assert_eq!(uds_response(bob_rx.try_recv().unwrap()).data, vec![0x02]);
        assert_eq!(state.engine.session().security_level, SecurityLevel::Unlocked);
    }

    #[tokio::test]
    async fn test_control_routed_without_reply() {
        let state = state(Arc::new(FixedLatency(Duration::ZERO)));
        let (conn, mut rx) = connect(&state);

        conn.handle_text(r#"{"type":"control","data":{"action":"gear","value":"D"}}"#);
        conn.handle_text(r#"{"type":"control","data":{"action":"accelerate","pressed":true}}"#);
        settle().await;

        let vehicle = state.simulator.state();
        assert_eq!(vehicle.gear.as_str(), "D");
        assert!(vehicle.accelerating);
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn test_malformed_text_ignored() {
        let state = state(Arc::new(FixedLatency(Duration::ZERO)));
        let (conn, mut rx) = connect(&state);

        conn.handle_text("not json");
        conn.handle_text(r#"{"type":"uds-request","data":{"serviceId":"x"}}"#);
        conn.handle_text(r#"{"type":"control","data":{"value":"D"}}"#);
        settle().await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_request_answers_incorrect_length() {
        let state = state(Arc::new(SimulatedLatency::default()));
        let (conn, mut rx) = connect(&state);

        conn.handle_text(
            r#"{"type":"uds-request","data":{"serviceId":34,"payload":[241,400],"requestId":4}}"#,
        );
        conn.handle_text(
            r#"{"type":"uds-request","data":{"serviceId":39,"subFunction":2,"payload":"0102"}}"#,
        );
        conn.handle_text(r#"{"type":"uds-request","data":{"serviceId":16,"subFunction":259}}"#);

        tokio::time::advance(Duration::from_millis(49)).await;
        settle().await;
        assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        let mut responses: Vec<DiagnosticResponse> = (0..3)
            .map(|_| uds_response(rx.try_recv().unwrap()))
            .collect();
        responses.sort_by_key(|r| r.data[0]);

        assert_eq!(
            responses,
            vec![
                DiagnosticResponse {
                    service_id: 0x7F,
                    data: vec![0x10, 0x13],
                    request_id: None,
                },
                DiagnosticResponse {
                    service_id: 0x7F,
                    data: vec![0x22, 0x13],
                    request_id: Some(4),
                },
                DiagnosticResponse {
                    service_id: 0x7F,
                    data: vec![0x27, 0x13],
                    request_id: None,
                },
            ]
        );
        assert_eq!(state.engine.session().security_level, SecurityLevel::Locked);
    }
}
