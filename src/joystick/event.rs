use chrono::{DateTime, Local};

use super::device::{AxisRole, ButtonRole, Device, DeviceId};

/// Raw event as delivered by the input backend.
///
/// Axis and button events address channels by device-local index; the roster
/// events carry the full set of devices the backend currently reports.
#[derive(Debug, Clone)]
pub enum RawJoystickEvent {
    AxisChanged {
        device: DeviceId,
        axis: usize,
        value: f32,
        timestamp: DateTime<Local>,
    },
    ButtonChanged {
        device: DeviceId,
        button: usize,
        pressed: bool,
        timestamp: DateTime<Local>,
    },
    Connected {
        device: DeviceId,
        roster: Vec<Device>,
        timestamp: DateTime<Local>,
    },
    /// May arrive while `roster` still lists the departing device
    Disconnected {
        device: DeviceId,
        roster: Vec<Device>,
        timestamp: DateTime<Local>,
    },
}

impl RawJoystickEvent {
    pub fn axis(device: DeviceId, axis: usize, value: f32) -> Self {
        RawJoystickEvent::AxisChanged {
            device,
            axis,
            value,
            timestamp: Local::now(),
        }
    }

    pub fn button(device: DeviceId, button: usize, pressed: bool) -> Self {
        RawJoystickEvent::ButtonChanged {
            device,
            button,
            pressed,
            timestamp: Local::now(),
        }
    }

    /// Device the event concerns
    pub fn device(&self) -> DeviceId {
        match self {
            RawJoystickEvent::AxisChanged { device, .. }
            | RawJoystickEvent::ButtonChanged { device, .. }
            | RawJoystickEvent::Connected { device, .. }
            | RawJoystickEvent::Disconnected { device, .. } => *device,
        }
    }

    /// When the collector read the event from the backend
    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            RawJoystickEvent::AxisChanged { timestamp, .. }
            | RawJoystickEvent::ButtonChanged { timestamp, .. }
            | RawJoystickEvent::Connected { timestamp, .. }
            | RawJoystickEvent::Disconnected { timestamp, .. } => *timestamp,
        }
    }
}

/// Observable result of a normalizer update
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    Axis {
        device: DeviceId,
        index: usize,
        role: AxisRole,
        value: f32,
    },
    Button {
        device: DeviceId,
        role: ButtonRole,
        pressed: bool,
    },
}
