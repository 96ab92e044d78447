//! Joystick state normalizer
//!
//! Turns the raw per-device event stream into consistent logical state:
//!
//! - dead-zone filtering with a single zero edge when an axis falls back into the zone
//! - named axes (X, Y, Z, Z rotation) resolved first-match-wins when a device
//!   reports duplicate roles
//! - trigger axes synthesized into trigger buttons and OR-merged with physical
//!   trigger buttons
//! - POV axes decomposed into four discrete D-pad buttons
//!
//! The normalizer is synchronous and owns every [`DeviceState`]. The registry is
//! rebuilt wholesale whenever the roster changes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

use super::device::{AxisRole, ButtonRole, Device, DeviceId};
use super::event::{RawJoystickEvent, StateChange};
use super::state::{DeviceCapabilities, DeviceState, JoystickSnapshot};

/// When to derive a trigger button from a trigger axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSynthesis {
    /// Only for devices without a dedicated trigger button
    #[default]
    Auto,
    /// Also for devices that report the trigger through both channels
    Always,
    Never,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizerSettings {
    /// Lower bound for every axis dead zone
    pub global_dead_zone: f32,
    pub trigger_synthesis: TriggerSynthesis,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            global_dead_zone: 0.05,
            trigger_synthesis: TriggerSynthesis::Auto,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizerError {
    #[error("Event for unknown device {0}")]
    UnknownDevice(DeviceId),

    #[error("Couldn't find index for axis {index} on '{device}' ({declared} axes declared)")]
    UnknownAxis {
        device: String,
        index: usize,
        declared: usize,
    },

    #[error("Couldn't find index for button {index} on '{device}' ({declared} buttons declared)")]
    UnknownButton {
        device: String,
        index: usize,
        declared: usize,
    },
}

#[derive(Debug)]
struct DeviceEntry {
    device: Device,
    state: DeviceState,
}

#[derive(Debug)]
pub struct JoystickNormalizer {
    settings: NormalizerSettings,
    registry: BTreeMap<DeviceId, DeviceEntry>,
    // Last non-zero value per (device, axis index)
    last_values: HashMap<(DeviceId, usize), f32>,
}

impl JoystickNormalizer {
    pub fn new(settings: Option<NormalizerSettings>, roster: &[Device]) -> Self {
        let settings = settings.unwrap_or_default();
        debug!("Creating JoystickNormalizer with settings: {:?}", settings);

        let mut normalizer = Self {
            settings,
            registry: BTreeMap::new(),
            last_values: HashMap::new(),
        };
        normalizer.rebuild(roster.iter());
        normalizer
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.registry.values().map(|entry| &entry.device)
    }

    pub fn state(&self, device: DeviceId) -> Option<&DeviceState> {
        self.registry.get(&device).map(|entry| &entry.state)
    }

    pub fn snapshot(&self) -> JoystickSnapshot {
        JoystickSnapshot(
            self.registry
                .iter()
                .map(|(id, entry)| (*id, entry.state.clone()))
                .collect(),
        )
    }

    /// Routes a raw event to the matching handler
    pub fn apply(&mut self, event: RawJoystickEvent) -> Vec<StateChange> {
        match event {
            RawJoystickEvent::AxisChanged {
                device,
                axis,
                value,
                ..
            } => self.on_axis_event(device, axis, value),
            RawJoystickEvent::ButtonChanged {
                device,
                button,
                pressed,
                ..
            } => self.on_button_event(device, button, pressed),
            RawJoystickEvent::Connected { device, roster, .. } => {
                self.on_device_connected(device, &roster);
                Vec::new()
            }
            RawJoystickEvent::Disconnected { device, roster, .. } => {
                self.on_device_disconnected(device, &roster);
                Vec::new()
            }
        }
    }

    /// Handles an axis movement. Unknown devices or indices are logged and dropped.
    pub fn on_axis_event(&mut self, device: DeviceId, axis: usize, raw: f32) -> Vec<StateChange> {
        match self.try_axis_event(device, axis, raw) {
            Ok(changes) => changes,
            Err(e) => {
                error!("Dropping axis event: {}", e);
                Vec::new()
            }
        }
    }

    /// Handles a button transition. Unknown devices or indices are logged and dropped.
    pub fn on_button_event(
        &mut self,
        device: DeviceId,
        button: usize,
        pressed: bool,
    ) -> Vec<StateChange> {
        match self.try_button_event(device, button, pressed) {
            Ok(changes) => changes,
            Err(e) => {
                error!("Dropping button event: {}", e);
                Vec::new()
            }
        }
    }

    pub fn on_device_connected(&mut self, device: DeviceId, roster: &[Device]) {
        info!("Device {} connected, rebuilding roster of {}", device, roster.len());
        if !roster.iter().any(|d| d.id == device) {
            warn!("Connected device {} missing from the reported roster", device);
        }
        self.rebuild(roster.iter());
    }

    /// The departing device is dropped even if `roster` still lists it.
    pub fn on_device_disconnected(&mut self, device: DeviceId, roster: &[Device]) {
        info!("Device {} disconnected, rebuilding roster", device);
        if roster.iter().any(|d| d.id == device) {
            debug!("Roster still lists device {}, discarding its slot", device);
        }
        self.rebuild(roster.iter().filter(|d| d.id != device));
    }

    fn rebuild<'a>(&mut self, roster: impl Iterator<Item = &'a Device>) {
        let policy = self.settings.trigger_synthesis;
        let mut registry = BTreeMap::new();

        for device in roster {
            if registry.contains_key(&device.id) {
                warn!(
                    "Duplicate device id {} ('{}') in roster, keeping the first",
                    device.id, device.name
                );
                continue;
            }
            let capabilities = DeviceCapabilities::detect(device, policy);
            debug!(
                "Registering device {} '{}' with {} axes, {} buttons, {:?}",
                device.id,
                device.name,
                device.axes.len(),
                device.buttons.len(),
                capabilities
            );
            registry.insert(
                device.id,
                DeviceEntry {
                    device: device.clone(),
                    state: DeviceState::new(device, capabilities),
                },
            );
        }

        self.registry = registry;
        self.last_values.clear();
        info!("Roster rebuilt with {} device(s)", self.registry.len());
    }

    fn try_axis_event(
        &mut self,
        device_id: DeviceId,
        index: usize,
        raw: f32,
    ) -> Result<Vec<StateChange>, NormalizerError> {
        let global_dead_zone = self.settings.global_dead_zone;
        let entry = self
            .registry
            .get_mut(&device_id)
            .ok_or(NormalizerError::UnknownDevice(device_id))?;
        let axis = entry
            .device
            .axis(index)
            .cloned()
            .ok_or_else(|| NormalizerError::UnknownAxis {
                device: entry.device.name.clone(),
                index,
                declared: entry.device.axes.len(),
            })?;

        let key = (device_id, index);
        let effective_dead_zone = global_dead_zone.max(axis.dead_zone);
        let mut value = raw;
        if raw.abs() < effective_dead_zone {
            if self.last_values.remove(&key).is_none() {
                debug!(
                    "{}: axis {} ({}) = {:.4} inside dead zone {:.4}, ignored",
                    entry.device.name, axis.name, axis.index, raw, effective_dead_zone
                );
                return Ok(Vec::new());
            }
            value = 0.0;
        }

        info!(
            "{}: Axis: {} ({}) = {}",
            entry.device.name, axis.name, axis.index, value
        );

        // Duplicate roles only drive the named state through the first declared axis
        let primary = entry.device.axis_for_role(axis.role).map(|a| a.index) == Some(index);
        let state = &mut entry.state;
        let mut changes = Vec::new();

        if primary {
            match axis.role {
                AxisRole::X => state.x_axis = value,
                AxisRole::Y => state.y_axis = -value,
                AxisRole::Z => state.z_axis = value,
                AxisRole::ZRotation => state.z_rotation = -value,
                AxisRole::LeftTrigger => {
                    if state.capabilities.synthesize_left_trigger {
                        let pressed = value > 0.0;
                        if pressed != state.left_trigger_axis {
                            state.left_trigger_axis = pressed;
                            refresh_trigger(state, device_id, ButtonRole::LeftTrigger, &mut changes);
                        }
                    }
                }
                AxisRole::RightTrigger => {
                    if state.capabilities.synthesize_right_trigger {
                        let pressed = value > 0.0;
                        if pressed != state.right_trigger_axis {
                            state.right_trigger_axis = pressed;
                            refresh_trigger(state, device_id, ButtonRole::RightTrigger, &mut changes);
                        }
                    }
                }
                AxisRole::PovX => {
                    let last = state.last_pov_x;
                    decompose_pov(
                        state,
                        device_id,
                        last,
                        value,
                        (ButtonRole::DPadLeft, ButtonRole::DPadRight),
                        &mut changes,
                    );
                    state.last_pov_x = value;
                }
                AxisRole::PovY => {
                    let last = state.last_pov_y;
                    decompose_pov(
                        state,
                        device_id,
                        last,
                        value,
                        (ButtonRole::DPadDown, ButtonRole::DPadUp),
                        &mut changes,
                    );
                    state.last_pov_y = value;
                }
                AxisRole::Unmapped => {}
            }
        }

        if value != 0.0 {
            self.last_values.insert(key, value);
        } else {
            self.last_values.remove(&key);
        }

        state.set_axis_value(index, value);
        changes.push(StateChange::Axis {
            device: device_id,
            index,
            role: axis.role,
            value,
        });
        Ok(changes)
    }

    fn try_button_event(
        &mut self,
        device_id: DeviceId,
        index: usize,
        pressed: bool,
    ) -> Result<Vec<StateChange>, NormalizerError> {
        let entry = self
            .registry
            .get_mut(&device_id)
            .ok_or(NormalizerError::UnknownDevice(device_id))?;
        let button = entry
            .device
            .button(index)
            .cloned()
            .ok_or_else(|| NormalizerError::UnknownButton {
                device: entry.device.name.clone(),
                index,
                declared: entry.device.buttons.len(),
            })?;

        info!(
            "{}: Button: {} ({}) = {}",
            entry.device.name,
            button.name,
            button.index,
            if pressed { "Down" } else { "Up" }
        );

        let state = &mut entry.state;
        let mut changes = Vec::new();
        match button.role {
            ButtonRole::LeftTrigger => {
                state.left_trigger_button = pressed;
                refresh_trigger(state, device_id, button.role, &mut changes);
            }
            ButtonRole::RightTrigger => {
                state.right_trigger_button = pressed;
                refresh_trigger(state, device_id, button.role, &mut changes);
            }
            ButtonRole::DPadLeft
            | ButtonRole::DPadRight
            | ButtonRole::DPadUp
            | ButtonRole::DPadDown => {
                state.set_dpad_button(button.role, pressed);
                refresh_dpad(state, device_id, button.role, &mut changes);
            }
            role => set_logical_button(state, device_id, role, pressed, &mut changes),
        }

        state.set_button_value(index, pressed);
        Ok(changes)
    }
}

fn set_logical_button(
    state: &mut DeviceState,
    device: DeviceId,
    role: ButtonRole,
    pressed: bool,
    changes: &mut Vec<StateChange>,
) {
    if state.set_button(role, pressed) {
        changes.push(StateChange::Button {
            device,
            role,
            pressed,
        });
    }
}

// A trigger is down while either the physical button or the trigger axis says so
fn refresh_trigger(
    state: &mut DeviceState,
    device: DeviceId,
    role: ButtonRole,
    changes: &mut Vec<StateChange>,
) {
    let pressed = match role {
        ButtonRole::LeftTrigger => state.left_trigger_button || state.left_trigger_axis,
        ButtonRole::RightTrigger => state.right_trigger_button || state.right_trigger_axis,
        _ => return,
    };
    set_logical_button(state, device, role, pressed, changes);
}

// A D-pad direction is down while either the POV axis or the physical button says so
fn refresh_dpad(
    state: &mut DeviceState,
    device: DeviceId,
    role: ButtonRole,
    changes: &mut Vec<StateChange>,
) {
    let pressed = state.dpad_held(role);
    set_logical_button(state, device, role, pressed, changes);
}

fn direction(value: f32) -> i8 {
    if value < 0.0 {
        -1
    } else if value > 0.0 {
        1
    } else {
        0
    }
}

/// Releases the direction implied by `last`, then presses the one implied by `value`.
///
/// Only the POV channel is moved; a physical D-pad button still holding the
/// direction keeps it pressed.
fn decompose_pov(
    state: &mut DeviceState,
    device: DeviceId,
    last: f32,
    value: f32,
    (negative, positive): (ButtonRole, ButtonRole),
    changes: &mut Vec<StateChange>,
) {
    let previous = direction(last);
    let current = direction(value);
    if previous == current {
        return;
    }

    let mut steer = |role: ButtonRole, held: bool| {
        state.set_pov_direction(role, held);
        refresh_dpad(state, device, role, changes);
    };
    match previous {
        -1 => steer(negative, false),
        1 => steer(positive, false),
        _ => {}
    }
    match current {
        -1 => steer(negative, true),
        1 => steer(positive, true),
        _ => {}
    }
}
