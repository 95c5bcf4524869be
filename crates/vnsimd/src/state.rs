//! Application state shared by every connection

use std::sync::Arc;

use vnsim_core::{TelemetryBroadcaster, VehicleSimulator, VehicleState};
use vnsim_uds::DiagnosticEngine;

use crate::config::{Config, ConfigError};
use crate::latency::LatencyPolicy;

/// One vehicle and one ECU for the whole process
#[derive(Clone)]
pub struct AppState {
    pub simulator: Arc<VehicleSimulator>,
    pub engine: Arc<DiagnosticEngine>,
    pub broadcaster: TelemetryBroadcaster,
    pub latency: Arc<dyn LatencyPolicy>,
}

impl AppState {
    pub fn new(
        simulator: Arc<VehicleSimulator>,
        engine: Arc<DiagnosticEngine>,
        broadcaster: TelemetryBroadcaster,
        latency: Arc<dyn LatencyPolicy>,
    ) -> Self {
        Self {
            simulator,
            engine,
            broadcaster,
            latency,
        }
    }

    /// Build simulator, engine, broadcaster and latency policy from configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let vehicle = VehicleState::with_readings(
            config.simulation.initial_odometer_km,
            config.simulation.initial_fuel_percent,
        );
        let simulator = VehicleSimulator::with_state(vehicle, config.simulation.tick());
        let engine = DiagnosticEngine::from_config(&config.ecu)?;

        Ok(Self::new(
            Arc::new(simulator),
            Arc::new(engine),
            TelemetryBroadcaster::new(config.server.telemetry_buffer),
            config.latency.policy(),
        ))
    }
}
