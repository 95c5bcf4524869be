//! vnsim-core - the simulated vehicle
//!
//! A [`VehicleSimulator`] owns the [`VehicleState`] and evolves it on a fixed
//! period from the latest driver [`ControlCommand`]s. After each tick the
//! [`TelemetryBroadcaster`] encodes the state as bus frames and fans them out
//! to every observer.

pub mod control;
pub mod simulator;
pub mod telemetry;
pub mod vehicle;

pub use control::{Control, ControlCommand};
pub use simulator::{VehicleSimulator, DEFAULT_TICK};
pub use telemetry::{encode_frames, TelemetryBatch, TelemetryBroadcaster, TelemetryFrame};
pub use vehicle::{Gear, Headlights, TurnSignals, VehicleState};
