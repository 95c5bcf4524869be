//! Telemetry frames and their fan-out to observers
//!
//! Every tick produces the same six frames in the same order. Frames of one
//! tick travel as a single batch so all observers see them in that order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;
use tracing::trace;

use crate::vehicle::{Gear, Headlights, TurnSignals, VehicleState};

/// Frame identifiers on the simulated bus
pub mod frame_id {
    pub const ENGINE_SPEED: u32 = 0x123;
    pub const ENGINE_RPM: u32 = 0x456;
    pub const STEERING_ANGLE: u32 = 0x789;
    pub const GEAR_POSITION: u32 = 0xABC;
    pub const LIGHTS_STATUS: u32 = 0xDEF;
    pub const TURN_SIGNALS: u32 = 0x321;
}

/// Label to raw-code tables for enumerated signals
const GEAR_CODES: &[(&str, u8)] = &[("P", 0), ("R", 1), ("N", 2), ("D", 3)];
const HEADLIGHT_CODES: &[(&str, u8)] = &[("off", 0), ("on", 1), ("high", 2)];
const TURN_SIGNAL_CODES: &[(&str, u8)] = &[("off", 0), ("left", 1), ("right", 2), ("hazard", 3)];

/// Raw code of a label; unmapped labels encode to 0
fn raw_code(table: &[(&str, u8)], label: &str) -> u8 {
    table
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, code)| *code)
        .unwrap_or(0)
}

pub fn gear_code(gear: Gear) -> u8 {
    raw_code(GEAR_CODES, gear.as_str())
}

pub fn headlight_code(headlights: Headlights) -> u8 {
    raw_code(HEADLIGHT_CODES, headlights.as_str())
}

pub fn turn_signal_code(signals: TurnSignals) -> u8 {
    raw_code(TURN_SIGNAL_CODES, signals.as_str())
}

/// One frame on the simulated vehicle bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryFrame {
    pub id: u32,
    pub name: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub data: Map<String, Value>,
    pub raw_value: f64,
}

impl TelemetryFrame {
    fn new(id: u32, name: &str, timestamp: i64, key: &str, value: Value, raw: f64) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), value);
        Self {
            id,
            name: name.to_string(),
            timestamp,
            data,
            raw_value: raw,
        }
    }
}

/// Encode a vehicle state as the frames of one tick, in bus order
pub fn encode_frames(state: &VehicleState, timestamp: i64) -> Vec<TelemetryFrame> {
    vec![
        TelemetryFrame::new(
            frame_id::ENGINE_SPEED,
            "Engine_Speed",
            timestamp,
            "speed",
            json!(state.speed),
            state.speed,
        ),
        TelemetryFrame::new(
            frame_id::ENGINE_RPM,
            "Engine_RPM",
            timestamp,
            "rpm",
            json!(state.rpm),
            state.rpm as f64,
        ),
        TelemetryFrame::new(
            frame_id::STEERING_ANGLE,
            "Steering_Angle",
            timestamp,
            "angle",
            json!(state.steering),
            state.steering,
        ),
        TelemetryFrame::new(
            frame_id::GEAR_POSITION,
            "Gear_Position",
            timestamp,
            "gear",
            json!(state.gear.as_str()),
            gear_code(state.gear) as f64,
        ),
        TelemetryFrame::new(
            frame_id::LIGHTS_STATUS,
            "Lights_Status",
            timestamp,
            "headlights",
            json!(state.headlights.as_str()),
            headlight_code(state.headlights) as f64,
        ),
        TelemetryFrame::new(
            frame_id::TURN_SIGNALS,
            "Turn_Signals",
            timestamp,
            "signals",
            json!(state.turn_signals.as_str()),
            turn_signal_code(state.turn_signals) as f64,
        ),
    ]
}

/// Frames of one tick, shared by all observers
pub type TelemetryBatch = Arc<[TelemetryFrame]>;

/// Fans telemetry batches out to every subscribed observer
#[derive(Clone)]
pub struct TelemetryBroadcaster {
    sender: broadcast::Sender<TelemetryBatch>,
}

impl TelemetryBroadcaster {
    /// `capacity` is the number of ticks an observer may fall behind
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryBatch> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Encode and publish one tick; returns the number of observers reached
    pub fn publish(&self, state: &VehicleState, timestamp: i64) -> usize {
        let batch: TelemetryBatch = encode_frames(state, timestamp).into();
        match self.sender.send(batch) {
            Ok(observers) => observers,
            Err(_) => {
                trace!("No telemetry observers");
                0
            }
        }
    }
}
