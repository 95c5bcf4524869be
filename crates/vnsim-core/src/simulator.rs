//! Vehicle state simulator
//!
//! Each tick applies exactly one longitudinal rule: accelerate, else brake,
//! else coast. Steering, gear and lights only change when a control command
//! arrives.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::control::{Control, ControlCommand};
use crate::vehicle::{VehicleState, RPM_IDLE, RPM_MAX, SPEED_MAX};

/// Default simulation period (10 Hz)
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

const ACCEL_SPEED_STEP: f64 = 2.0;
const ACCEL_RPM_STEP: u32 = 100;
const BRAKE_SPEED_STEP: f64 = 5.0;
const BRAKE_RPM_STEP: u32 = 200;
const COAST_SPEED_STEP: f64 = 0.5;
const COAST_RPM_STEP: u32 = 50;

/// Fuel burned per rpm per second, in percent of a full tank
const FUEL_PER_RPM_SECOND: f64 = 2.5e-6;

/// Owns the vehicle state and evolves it on every tick
pub struct VehicleSimulator {
    state: Mutex<VehicleState>,
    tick: Duration,
}

impl VehicleSimulator {
    pub fn new(tick: Duration) -> Self {
        Self::with_state(VehicleState::default(), tick)
    }

    pub fn with_state(state: VehicleState, tick: Duration) -> Self {
        Self {
            state: Mutex::new(state),
            tick,
        }
    }

    pub fn tick_period(&self) -> Duration {
        self.tick
    }

    /// Copy of the current state
    pub fn state(&self) -> VehicleState {
        self.state.lock().clone()
    }

    /// Apply a control command; returns false when it was ignored
    pub fn apply(&self, command: &ControlCommand) -> bool {
        let Some(control) = command.parse() else {
            debug!(action = %command.action, value = ?command.value, "Ignoring control command");
            return false;
        };

        let mut state = self.state.lock();
        match control {
            Control::Accelerate(pressed) => state.accelerating = pressed,
            Control::Brake(pressed) => state.braking = pressed,
            Control::Steer(angle) => state.steering = angle,
            Control::Gear(gear) => state.gear = gear,
            Control::Headlights(lights) => state.headlights = lights,
            Control::TurnSignals(signals) => state.turn_signals = signals,
        }
        debug!(?control, "Control applied");
        true
    }

    /// Advance one period and return the resulting state
    pub fn tick(&self) -> VehicleState {
        let mut state = self.state.lock();
        let state = &mut *state;

        if state.accelerating {
            state.speed = (state.speed + ACCEL_SPEED_STEP).min(SPEED_MAX);
            state.rpm = state.rpm.saturating_add(ACCEL_RPM_STEP).min(RPM_MAX);
        } else if state.braking {
            state.speed = (state.speed - BRAKE_SPEED_STEP).max(0.0);
            state.rpm = state.rpm.saturating_sub(BRAKE_RPM_STEP).max(RPM_IDLE);
        } else {
            state.speed = (state.speed - COAST_SPEED_STEP).max(0.0);
            state.rpm = state.rpm.saturating_sub(COAST_RPM_STEP).max(RPM_IDLE);
        }

        let seconds = self.tick.as_secs_f64();
        state.odometer += state.speed * seconds / 3600.0;
        let burned = state.rpm as f64 * FUEL_PER_RPM_SECOND * seconds;
        state.fuel_level = (state.fuel_level - burned).max(0.0);

        state.clone()
    }
}

impl Default for VehicleSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{Gear, Headlights, TurnSignals};

    #[test]
    fn test_accelerate_from_rest() {
        let sim = VehicleSimulator::default();
        assert!(sim.apply(&ControlCommand::pressed("accelerate", true)));
        let state = sim.tick();
        assert_eq!(state.speed, 2.0);
        assert_eq!(state.rpm, 900);
    }

    #[test]
    fn test_accelerate_caps() {
        let sim = VehicleSimulator::default();
        sim.apply(&ControlCommand::pressed("accelerate", true));
        for _ in 0..200 {
            sim.tick();
        }
        let state = sim.state();
        assert_eq!(state.speed, 200.0);
        assert_eq!(state.rpm, 7000);
    }

    #[test]
    fn test_accelerate_wins_over_brake() {
        let sim = VehicleSimulator::default();
        sim.apply(&ControlCommand::pressed("accelerate", true));
        sim.apply(&ControlCommand::pressed("brake", true));
        let state = sim.tick();
        assert_eq!(state.speed, 2.0);
    }

    #[test]
    fn test_brake_and_coast() {
        let sim = VehicleSimulator::default();
        sim.apply(&ControlCommand::pressed("accelerate", true));
        for _ in 0..10 {
            sim.tick();
        }
        assert_eq!(sim.state().speed, 20.0);
        assert_eq!(sim.state().rpm, 1800);

        sim.apply(&ControlCommand::pressed("accelerate", false));
        let state = sim.tick();
        assert_eq!(state.speed, 19.5);
        assert_eq!(state.rpm, 1750);

        sim.apply(&ControlCommand::pressed("brake", true));
        let state = sim.tick();
        assert_eq!(state.speed, 14.5);
        assert_eq!(state.rpm, 1550);

        for _ in 0..10 {
            sim.tick();
        }
        let state = sim.state();
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.rpm, 800);
    }

    #[test]
    fn test_bounds_hold_under_mixed_input() {
        let sim = VehicleSimulator::default();
        let inputs = ["accelerate", "brake"];
        for i in 0..500 {
            let action = inputs[i % 2];
            sim.apply(&ControlCommand::pressed(action, i % 7 < 4));
            let state = sim.tick();
            assert!((0.0..=200.0).contains(&state.speed));
            assert!((800..=7000).contains(&state.rpm));
        }
    }

    #[test]
    fn test_controls_overwrite_without_tick() {
        let sim = VehicleSimulator::default();
        sim.apply(&ControlCommand::with_value("steer", 30));
        sim.apply(&ControlCommand::with_value("gear", "D"));
        sim.apply(&ControlCommand::with_value("headlights", "on"));
        sim.apply(&ControlCommand::with_value("turnSignals", "left"));

        let state = sim.state();
        assert_eq!(state.steering, 30.0);
        assert_eq!(state.gear, Gear::D);
        assert_eq!(state.headlights, Headlights::On);
        assert_eq!(state.turn_signals, TurnSignals::Left);

        let after = sim.tick();
        assert_eq!(after.steering, 30.0);
        assert_eq!(after.gear, Gear::D);
    }

    #[test]
    fn test_ignored_commands_leave_state() {
        let sim = VehicleSimulator::default();
        let before = sim.state();
        assert!(!sim.apply(&ControlCommand::pressed("horn", true)));
        assert!(!sim.apply(&ControlCommand::with_value("gear", "Q")));
        assert_eq!(sim.state(), before);
    }

    #[test]
    fn test_odometer_and_fuel() {
        let sim = VehicleSimulator::with_state(
            VehicleState {
                speed: 180.0,
                rpm: 7000,
                accelerating: true,
                fuel_level: 0.001,
                ..Default::default()
            },
            Duration::from_secs(1),
        );
        let state = sim.tick();
        assert!((state.odometer - 182.0 / 3600.0).abs() < 1e-9);
        assert_eq!(state.fuel_level, 0.0);
    }
}
