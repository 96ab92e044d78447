//! Per-device state as seen by the display layer.
//!
//! [`DeviceState`] is owned and mutated by the normalizer only. Consumers get
//! cloned copies through [`JoystickSnapshot`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::device::{Axis, AxisRole, Button, ButtonRole, Device, DeviceId};
use super::normalizer::TriggerSynthesis;

/// Stick vector limited to the unit circle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StickPosition {
    pub x: f32,
    pub y: f32,
    /// Length of the vector, at most 1.0
    pub magnitude: f32,
    /// Direction in radians, counter-clockwise from +x
    pub angle: f32,
}

impl StickPosition {
    pub fn from_axes(x: f32, y: f32) -> Self {
        let magnitude = (x * x + y * y).sqrt().min(1.0);
        if magnitude == 0.0 {
            return Self::default();
        }
        let angle = y.atan2(x);
        Self {
            x: angle.cos() * magnitude,
            y: angle.sin() * magnitude,
            magnitude,
            angle,
        }
    }
}

/// Per-device capabilities, computed once when the device is registered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub has_left_trigger_button: bool,
    pub has_right_trigger_button: bool,
    pub synthesize_left_trigger: bool,
    pub synthesize_right_trigger: bool,
}

impl DeviceCapabilities {
    pub fn detect(device: &Device, policy: TriggerSynthesis) -> Self {
        let has_left_trigger_button = device.has_button_role(ButtonRole::LeftTrigger);
        let has_right_trigger_button = device.has_button_role(ButtonRole::RightTrigger);
        let synthesize = |has_button: bool| match policy {
            TriggerSynthesis::Auto => !has_button,
            TriggerSynthesis::Always => true,
            TriggerSynthesis::Never => false,
        };

        Self {
            has_left_trigger_button,
            has_right_trigger_button,
            synthesize_left_trigger: synthesize(has_left_trigger_button),
            synthesize_right_trigger: synthesize(has_right_trigger_button),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub name: String,
    pub capabilities: DeviceCapabilities,

    // Named axes, Y and Z rotation already inverted
    pub x_axis: f32,
    pub y_axis: f32,
    pub z_axis: f32,
    pub z_rotation: f32,

    pub last_pov_x: f32,
    pub last_pov_y: f32,

    /// Trigger pressed as reported through the trigger axis
    pub left_trigger_axis: bool,
    pub right_trigger_axis: bool,
    /// Trigger pressed as reported through a physical button
    pub left_trigger_button: bool,
    pub right_trigger_button: bool,

    buttons: BTreeMap<ButtonRole, bool>,
    // D-pad directions per channel, OR-ed into `buttons`
    pov_directions: BTreeMap<ButtonRole, bool>,
    dpad_buttons: BTreeMap<ButtonRole, bool>,

    axes: Vec<Axis>,
    button_channels: Vec<Button>,
    axis_values: Vec<f32>,
    button_values: Vec<bool>,
    role_axes: BTreeMap<AxisRole, usize>,
}

impl DeviceState {
    pub fn new(device: &Device, capabilities: DeviceCapabilities) -> Self {
        let mut role_axes = BTreeMap::new();
        for axis in &device.axes {
            role_axes.entry(axis.role).or_insert(axis.index);
        }

        Self {
            name: device.name.clone(),
            capabilities,
            axes: device.axes.clone(),
            button_channels: device.buttons.clone(),
            axis_values: vec![0.0; device.axes.len()],
            button_values: vec![false; device.buttons.len()],
            role_axes,
            ..Default::default()
        }
    }

    /// Latest value of the first axis that declares `role`
    pub fn axis(&self, role: AxisRole) -> Option<f32> {
        self.role_axes
            .get(&role)
            .and_then(|index| self.axis_values.get(*index))
            .copied()
    }

    /// Logical state of a button role; roles never touched read as released
    pub fn button(&self, role: ButtonRole) -> bool {
        self.buttons.get(&role).copied().unwrap_or(false)
    }

    pub fn axis_value(&self, index: usize) -> Option<f32> {
        self.axis_values.get(index).copied()
    }

    pub fn button_value(&self, index: usize) -> Option<bool> {
        self.button_values.get(index).copied()
    }

    pub fn pressed_buttons(&self) -> impl Iterator<Item = ButtonRole> + '_ {
        self.buttons
            .iter()
            .filter(|(_, pressed)| **pressed)
            .map(|(role, _)| *role)
    }

    pub fn left_stick(&self) -> StickPosition {
        StickPosition::from_axes(self.x_axis, self.y_axis)
    }

    pub fn right_stick(&self) -> StickPosition {
        StickPosition::from_axes(self.z_axis, self.z_rotation)
    }

    /// A D-pad direction is held while either the POV axis or the physical button holds it
    pub fn dpad_held(&self, role: ButtonRole) -> bool {
        let held =
            |channel: &BTreeMap<ButtonRole, bool>| channel.get(&role).copied().unwrap_or(false);
        held(&self.pov_directions) || held(&self.dpad_buttons)
    }

    /// One row per axis, then one per button: `i: name (logical id, raw id): value`.
    ///
    /// Buttons are numbered after the axes.
    pub fn channel_rows(&self) -> Vec<String> {
        let axis_rows = self.axes.iter().enumerate().map(|(i, axis)| {
            let value = self.axis_values.get(i).copied().unwrap_or(0.0);
            format!("{}: {} ({}, {}): {}", i, axis.name, axis.role, axis.index, value)
        });
        let button_rows = self.button_channels.iter().enumerate().map(|(i, button)| {
            let pressed = self.button_values.get(i).copied().unwrap_or(false);
            format!(
                "{}: {} ({}, {}): {}",
                i + self.axes.len(),
                button.name,
                button.role,
                button.index,
                pressed
            )
        });
        axis_rows.chain(button_rows).collect()
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        let pressed: Vec<String> = self.pressed_buttons().map(|r| r.to_string()).collect();
        format!(
            "{} L:({:.2},{:.2}) R:({:.2},{:.2}) LT:{} RT:{} Buttons:[{}]",
            self.name,
            self.x_axis,
            self.y_axis,
            self.z_axis,
            self.z_rotation,
            self.button(ButtonRole::LeftTrigger),
            self.button(ButtonRole::RightTrigger),
            pressed.join(",")
        )
    }

    /// Sets the logical button state; returns `true` when it changed
    pub(crate) fn set_button(&mut self, role: ButtonRole, pressed: bool) -> bool {
        let previous = self.buttons.insert(role, pressed).unwrap_or(false);
        previous != pressed
    }

    pub(crate) fn set_pov_direction(&mut self, role: ButtonRole, held: bool) {
        self.pov_directions.insert(role, held);
    }

    pub(crate) fn set_dpad_button(&mut self, role: ButtonRole, held: bool) {
        self.dpad_buttons.insert(role, held);
    }

    pub(crate) fn set_axis_value(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.axis_values.get_mut(index) {
            *slot = value;
        }
    }

    pub(crate) fn set_button_value(&mut self, index: usize, pressed: bool) {
        if let Some(slot) = self.button_values.get_mut(index) {
            *slot = pressed;
        }
    }
}

/// Owned snapshot of every device state (`device id → DeviceState`)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoystickSnapshot(pub BTreeMap<DeviceId, DeviceState>);

impl JoystickSnapshot {
    #[inline]
    pub fn get(&self, device: DeviceId) -> Option<&DeviceState> {
        self.0.get(&device)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &DeviceState)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
