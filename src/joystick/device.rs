//! Device roster model: devices, their axes and buttons, and the closed set of
//! logical roles those channels can play.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a connected device. Reused only when the same device reappears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic role of an axis, independent of the vendor's raw index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisRole {
    X,
    Y,
    Z,
    ZRotation,
    LeftTrigger,
    RightTrigger,
    PovX,
    PovY,
    Unmapped,
}

impl AxisRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisRole::X => "x",
            AxisRole::Y => "y",
            AxisRole::Z => "z",
            AxisRole::ZRotation => "rz",
            AxisRole::LeftTrigger => "left_trigger",
            AxisRole::RightTrigger => "right_trigger",
            AxisRole::PovX => "pov_x",
            AxisRole::PovY => "pov_y",
            AxisRole::Unmapped => "unmapped",
        }
    }
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AxisRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(AxisRole::X),
            "y" => Ok(AxisRole::Y),
            "z" => Ok(AxisRole::Z),
            "rz" => Ok(AxisRole::ZRotation),
            "left_trigger" => Ok(AxisRole::LeftTrigger),
            "right_trigger" => Ok(AxisRole::RightTrigger),
            "pov_x" => Ok(AxisRole::PovX),
            "pov_y" => Ok(AxisRole::PovY),
            "unmapped" => Ok(AxisRole::Unmapped),
            other => Err(format!("unknown axis role '{}'", other)),
        }
    }
}

/// Canonical button vocabulary.
///
/// Every role carries a raw numeric id; the D-pad directions are addressed by
/// their numeric ids (12..=15) when a POV axis is decomposed into buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonRole {
    ActionTop,
    ActionRight,
    ActionBottom,
    ActionLeft,
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,
    Select,
    Start,
    LeftThumb,
    RightThumb,
    DPadLeft,
    DPadRight,
    DPadUp,
    DPadDown,
    Mode,
    Other(u16),
}

impl ButtonRole {
    /// Numeric id of the role
    pub fn raw_id(&self) -> u16 {
        match self {
            ButtonRole::ActionTop => 0,
            ButtonRole::ActionRight => 1,
            ButtonRole::ActionBottom => 2,
            ButtonRole::ActionLeft => 3,
            ButtonRole::LeftBumper => 4,
            ButtonRole::RightBumper => 5,
            ButtonRole::LeftTrigger => 6,
            ButtonRole::RightTrigger => 7,
            ButtonRole::Select => 8,
            ButtonRole::Start => 9,
            ButtonRole::LeftThumb => 10,
            ButtonRole::RightThumb => 11,
            ButtonRole::DPadLeft => 12,
            ButtonRole::DPadRight => 13,
            ButtonRole::DPadUp => 14,
            ButtonRole::DPadDown => 15,
            ButtonRole::Mode => 16,
            ButtonRole::Other(id) => *id,
        }
    }

    /// Inverse of [`ButtonRole::raw_id`]; ids outside the vocabulary become `Other`
    pub fn from_raw_id(id: u16) -> Self {
        match id {
            0 => ButtonRole::ActionTop,
            1 => ButtonRole::ActionRight,
            2 => ButtonRole::ActionBottom,
            3 => ButtonRole::ActionLeft,
            4 => ButtonRole::LeftBumper,
            5 => ButtonRole::RightBumper,
            6 => ButtonRole::LeftTrigger,
            7 => ButtonRole::RightTrigger,
            8 => ButtonRole::Select,
            9 => ButtonRole::Start,
            10 => ButtonRole::LeftThumb,
            11 => ButtonRole::RightThumb,
            12 => ButtonRole::DPadLeft,
            13 => ButtonRole::DPadRight,
            14 => ButtonRole::DPadUp,
            15 => ButtonRole::DPadDown,
            16 => ButtonRole::Mode,
            other => ButtonRole::Other(other),
        }
    }

    fn label(&self) -> Option<&'static str> {
        let label = match self {
            ButtonRole::ActionTop => "action_top",
            ButtonRole::ActionRight => "action_right",
            ButtonRole::ActionBottom => "action_bottom",
            ButtonRole::ActionLeft => "action_left",
            ButtonRole::LeftBumper => "left_bumper",
            ButtonRole::RightBumper => "right_bumper",
            ButtonRole::LeftTrigger => "left_trigger",
            ButtonRole::RightTrigger => "right_trigger",
            ButtonRole::Select => "select",
            ButtonRole::Start => "start",
            ButtonRole::LeftThumb => "left_thumb",
            ButtonRole::RightThumb => "right_thumb",
            ButtonRole::DPadLeft => "dpad_left",
            ButtonRole::DPadRight => "dpad_right",
            ButtonRole::DPadUp => "dpad_up",
            ButtonRole::DPadDown => "dpad_down",
            ButtonRole::Mode => "mode",
            ButtonRole::Other(_) => return None,
        };
        Some(label)
    }
}

impl fmt::Display for ButtonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "{}", self.raw_id()),
        }
    }
}

impl FromStr for ButtonRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.parse::<u16>() {
            return Ok(ButtonRole::from_raw_id(id));
        }
        (0..=16u16)
            .map(ButtonRole::from_raw_id)
            .find(|role| role.label() == Some(s))
            .ok_or_else(|| format!("unknown button role '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub role: AxisRole,
    /// Device-local index
    pub index: usize,
    pub dead_zone: f32,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Axis[name={}, role={}, id={}, dead_zone={}]",
            self.name, self.role, self.index, self.dead_zone
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub name: String,
    pub role: ButtonRole,
    /// Device-local index
    pub index: usize,
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Button[name={}, role={}, id={}]",
            self.name, self.role, self.index
        )
    }
}

/// A connected input device as declared by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub axes: Vec<Axis>,
    pub buttons: Vec<Button>,
}

impl Device {
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            axes: Vec::new(),
            buttons: Vec::new(),
        }
    }

    /// Appends an axis at the next free index
    pub fn with_axis(mut self, name: impl Into<String>, role: AxisRole, dead_zone: f32) -> Self {
        let index = self.axes.len();
        self.axes.push(Axis {
            name: name.into(),
            role,
            index,
            dead_zone,
        });
        self
    }

    /// Appends a button at the next free index
    pub fn with_button(mut self, name: impl Into<String>, role: ButtonRole) -> Self {
        let index = self.buttons.len();
        self.buttons.push(Button {
            name: name.into(),
            role,
            index,
        });
        self
    }

    pub fn axis(&self, index: usize) -> Option<&Axis> {
        self.axes.get(index)
    }

    pub fn button(&self, index: usize) -> Option<&Button> {
        self.buttons.get(index)
    }

    /// First axis declaring `role`. Duplicates reporting the same role are shadowed.
    pub fn axis_for_role(&self, role: AxisRole) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.role == role)
    }

    pub fn has_button_role(&self, role: ButtonRole) -> bool {
        self.buttons.iter().any(|button| button.role == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_roles_parse_back_from_display() {
        for id in 0..20u16 {
            let role = ButtonRole::from_raw_id(id);
            assert_eq!(role.to_string().parse::<ButtonRole>(), Ok(role));
            assert_eq!(role.raw_id(), id);
        }
    }

    #[test]
    fn dpad_roles_use_numeric_ids() {
        assert_eq!(ButtonRole::DPadLeft.raw_id(), 12);
        assert_eq!(ButtonRole::DPadRight.raw_id(), 13);
        assert_eq!(ButtonRole::DPadUp.raw_id(), 14);
        assert_eq!(ButtonRole::DPadDown.raw_id(), 15);
    }

    #[test]
    fn first_axis_wins_for_duplicate_roles() {
        let device = Device::new(DeviceId(0), "pad")
            .with_axis("X", AxisRole::X, 0.0)
            .with_axis("X", AxisRole::X, 0.0);

        assert_eq!(device.axis_for_role(AxisRole::X).map(|a| a.index), Some(0));
    }

    #[test]
    fn unknown_axis_role_is_rejected() {
        assert!("throttle".parse::<AxisRole>().is_err());
        assert_eq!("rz".parse::<AxisRole>(), Ok(AxisRole::ZRotation));
    }
}
