//! Artificial delivery latency for diagnostic responses

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use vnsim_uds::DiagnosticResponse;

use crate::config::{LatencyConfig, LatencyMode};

/// Chooses how long a response waits before delivery
pub trait LatencyPolicy: Send + Sync {
    fn delay(&self, response: &DiagnosticResponse) -> Duration;
}

/// Random delay for positive responses, fixed delay for negative ones
#[derive(Debug, Clone)]
pub struct SimulatedLatency {
    positive_min: Duration,
    positive_max: Duration,
    negative: Duration,
}

impl SimulatedLatency {
    /// `positive_max` is exclusive; an empty range always yields `positive_min`
    pub fn new(positive_min: Duration, positive_max: Duration, negative: Duration) -> Self {
        Self {
            positive_min,
            positive_max,
            negative,
        }
    }
}

impl Default for SimulatedLatency {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(50),
            Duration::from_millis(150),
            Duration::from_millis(50),
        )
    }
}

impl LatencyPolicy for SimulatedLatency {
    fn delay(&self, response: &DiagnosticResponse) -> Duration {
        if response.is_negative() {
            return self.negative;
        }
        if self.positive_min >= self.positive_max {
            return self.positive_min;
        }
        rand::thread_rng().gen_range(self.positive_min..self.positive_max)
    }
}

/// Same delay for every response
#[derive(Debug, Clone, Copy)]
pub struct FixedLatency(pub Duration);

impl LatencyPolicy for FixedLatency {
    fn delay(&self, _response: &DiagnosticResponse) -> Duration {
        self.0
    }
}

/// No delay; delivery still happens off the request path
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateLatency;

impl LatencyPolicy for ImmediateLatency {
    fn delay(&self, _response: &DiagnosticResponse) -> Duration {
        Duration::ZERO
    }
}

impl LatencyConfig {
    /// Build the configured policy
    pub fn policy(&self) -> Arc<dyn LatencyPolicy> {
        match self.mode {
            LatencyMode::Simulated => Arc::new(SimulatedLatency::new(
                Duration::from_millis(self.positive_min_ms),
                Duration::from_millis(self.positive_max_ms),
                Duration::from_millis(self.negative_ms),
            )),
            LatencyMode::Fixed => Arc::new(FixedLatency(Duration::from_millis(self.fixed_ms))),
            LatencyMode::Immediate => Arc::new(ImmediateLatency),
        }
    }
}
