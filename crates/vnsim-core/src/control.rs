//! Driver control commands

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vehicle::{Gear, Headlights, TurnSignals, STEERING_LIMIT};

/// A control command as sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub action: String,
    /// Momentary controls: true while held. Missing counts as released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ControlCommand {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            pressed: None,
            value: None,
        }
    }

    pub fn pressed(action: impl Into<String>, pressed: bool) -> Self {
        Self {
            pressed: Some(pressed),
            ..Self::new(action)
        }
    }

    pub fn with_value(action: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(action)
        }
    }

    /// Decode into a typed control
    ///
    /// Returns `None` for unknown actions and values that do not parse.
    pub fn parse(&self) -> Option<Control> {
        let control = match self.action.as_str() {
            "accelerate" => Control::Accelerate(self.pressed.unwrap_or(false)),
            "brake" => Control::Brake(self.pressed.unwrap_or(false)),
            "steer" => {
                let angle = number(self.value.as_ref()?)?;
                Control::Steer(angle.clamp(-STEERING_LIMIT, STEERING_LIMIT))
            }
            "gear" => Control::Gear(Gear::from_label(self.value.as_ref()?.as_str()?)?),
            "headlights" => {
                Control::Headlights(Headlights::from_label(self.value.as_ref()?.as_str()?)?)
            }
            "turnSignals" => {
                Control::TurnSignals(TurnSignals::from_label(self.value.as_ref()?.as_str()?)?)
            }
            _ => return None,
        };
        Some(control)
    }
}

/// Numbers may arrive as JSON numbers or numeric strings
fn number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// A validated control input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Accelerate(bool),
    Brake(bool),
    Steer(f64),
    Gear(Gear),
    Headlights(Headlights),
    TurnSignals(TurnSignals),
}
