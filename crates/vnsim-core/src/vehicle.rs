//! Vehicle state model

use serde::Serialize;

/// Top speed in km/h
pub const SPEED_MAX: f64 = 200.0;
/// Idle engine speed
pub const RPM_IDLE: u32 = 800;
/// Rev limiter
pub const RPM_MAX: u32 = 7000;
/// Full steering lock in either direction
pub const STEERING_LIMIT: f64 = 100.0;
/// Fuel level of a full tank, in percent
pub const FUEL_FULL: f64 = 100.0;

/// Gear selector position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Gear {
    #[default]
    P,
    R,
    N,
    D,
}

impl Gear {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "P" => Some(Gear::P),
            "R" => Some(Gear::R),
            "N" => Some(Gear::N),
            "D" => Some(Gear::D),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gear::P => "P",
            Gear::R => "R",
            Gear::N => "N",
            Gear::D => "D",
        }
    }
}

/// Headlight switch position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Headlights {
    #[default]
    Off,
    On,
    High,
}

impl Headlights {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Headlights::Off),
            "on" => Some(Headlights::On),
            "high" => Some(Headlights::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Headlights::Off => "off",
            Headlights::On => "on",
            Headlights::High => "high",
        }
    }
}

/// Turn signal stalk position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnSignals {
    #[default]
    Off,
    Left,
    Right,
    Hazard,
}

impl TurnSignals {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "off" => Some(TurnSignals::Off),
            "left" => Some(TurnSignals::Left),
            "right" => Some(TurnSignals::Right),
            "hazard" => Some(TurnSignals::Hazard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnSignals::Off => "off",
            TurnSignals::Left => "left",
            TurnSignals::Right => "right",
            TurnSignals::Hazard => "hazard",
        }
    }
}

/// The simulated vehicle
///
/// Speed and rpm stay within `0..=SPEED_MAX` and `RPM_IDLE..=RPM_MAX`;
/// steering within `-STEERING_LIMIT..=STEERING_LIMIT`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleState {
    /// km/h
    pub speed: f64,
    pub rpm: u32,
    pub accelerating: bool,
    pub braking: bool,
    pub steering: f64,
    pub gear: Gear,
    pub headlights: Headlights,
    pub turn_signals: TurnSignals,
    /// km
    pub odometer: f64,
    /// Percent of a full tank
    pub fuel_level: f64,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            speed: 0.0,
            rpm: RPM_IDLE,
            accelerating: false,
            braking: false,
            steering: 0.0,
            gear: Gear::default(),
            headlights: Headlights::default(),
            turn_signals: TurnSignals::default(),
            odometer: 0.0,
            fuel_level: FUEL_FULL,
        }
    }
}

impl VehicleState {
    /// Parked vehicle with the given odometer reading and fuel level
    pub fn with_readings(odometer: f64, fuel_level: f64) -> Self {
        Self {
            odometer: odometer.max(0.0),
            fuel_level: fuel_level.clamp(0.0, FUEL_FULL),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_initial_state() {
        let state = VehicleState::default();
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.rpm, 800);
        assert_eq!(state.gear, Gear::P);
        assert_eq!(state.fuel_level, 100.0);
    }

    #[rstest]
    #[case("P", Some(Gear::P))]
    #[case("d", Some(Gear::D))]
    #[case(" N ", Some(Gear::N))]
    #[case("X", None)]
    #[case("", None)]
    fn test_gear_labels(#[case] label: &str, #[case] expected: Option<Gear>) {
        assert_eq!(Gear::from_label(label), expected);
    }

    #[test]
    fn test_labels_round_trip() {
        for lights in [Headlights::Off, Headlights::On, Headlights::High] {
            assert_eq!(Headlights::from_label(lights.as_str()), Some(lights));
        }
        for signals in [
            TurnSignals::Off,
            TurnSignals::Left,
            TurnSignals::Right,
            TurnSignals::Hazard,
        ] {
            assert_eq!(TurnSignals::from_label(signals.as_str()), Some(signals));
        }
        assert_eq!(Headlights::from_label("fog"), None);
        assert_eq!(TurnSignals::from_label("up"), None);
    }

    #[test]
    fn test_with_readings_clamps() {
        let state = VehicleState::with_readings(-5.0, 140.0);
        assert_eq!(state.odometer, 0.0);
        assert_eq!(state.fuel_level, 100.0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(VehicleState::default()).unwrap();
        assert_eq!(json["turnSignals"], "off");
        assert_eq!(json["gear"], "P");
        assert_eq!(json["fuelLevel"], 100.0);
    }
}
