use chrono::Local;
use gilrs::{Axis as GilrsAxis, Button as GilrsButton, Event, EventType, Gamepad, GamepadId, Gilrs};
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::device::{AxisRole, ButtonRole, Device, DeviceId};
use super::event::RawJoystickEvent;

// Axes in roster order, with the role each one plays
const AXIS_LAYOUT: [(GilrsAxis, &str, AxisRole); 8] = [
    (GilrsAxis::LeftStickX, "Left Stick X", AxisRole::X),
    (GilrsAxis::LeftStickY, "Left Stick Y", AxisRole::Y),
    (GilrsAxis::RightStickX, "Right Stick X", AxisRole::Z),
    (GilrsAxis::RightStickY, "Right Stick Y", AxisRole::ZRotation),
    (GilrsAxis::LeftZ, "Left Z", AxisRole::LeftTrigger),
    (GilrsAxis::RightZ, "Right Z", AxisRole::RightTrigger),
    (GilrsAxis::DPadX, "DPad X", AxisRole::PovX),
    (GilrsAxis::DPadY, "DPad Y", AxisRole::PovY),
];

const BUTTON_LAYOUT: [(GilrsButton, &str, ButtonRole); 19] = [
    (GilrsButton::North, "North", ButtonRole::ActionTop),
    (GilrsButton::East, "East", ButtonRole::ActionRight),
    (GilrsButton::South, "South", ButtonRole::ActionBottom),
    (GilrsButton::West, "West", ButtonRole::ActionLeft),
    (GilrsButton::LeftTrigger, "Left Bumper", ButtonRole::LeftBumper),
    (GilrsButton::RightTrigger, "Right Bumper", ButtonRole::RightBumper),
    (GilrsButton::LeftTrigger2, "Left Trigger", ButtonRole::LeftTrigger),
    (GilrsButton::RightTrigger2, "Right Trigger", ButtonRole::RightTrigger),
    (GilrsButton::Select, "Select", ButtonRole::Select),
    (GilrsButton::Start, "Start", ButtonRole::Start),
    (GilrsButton::LeftThumb, "Left Thumb", ButtonRole::LeftThumb),
    (GilrsButton::RightThumb, "Right Thumb", ButtonRole::RightThumb),
    (GilrsButton::DPadLeft, "DPad Left", ButtonRole::DPadLeft),
    (GilrsButton::DPadRight, "DPad Right", ButtonRole::DPadRight),
    (GilrsButton::DPadUp, "DPad Up", ButtonRole::DPadUp),
    (GilrsButton::DPadDown, "DPad Down", ButtonRole::DPadDown),
    (GilrsButton::Mode, "Mode", ButtonRole::Mode),
    (GilrsButton::C, "C", ButtonRole::Other(17)),
    (GilrsButton::Z, "Z", ButtonRole::Other(18)),
];

// Collector settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// Idle sleep between polls when no event is pending
    pub poll_interval_us: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_us: 100,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),

    #[error("Cannot find any joysticks")]
    NoDevices,
}

/// Which gilrs channel sits at each device-local index
#[derive(Debug, Clone, Default)]
struct GamepadLayout {
    axes: Vec<GilrsAxis>,
    buttons: Vec<GilrsButton>,
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    // Gilrs context
    gilrs: Gilrs,

    settings: CollectorSettings,

    // Channel to the normalizer
    event_sender: mpsc::Sender<RawJoystickEvent>,

    // Index translation per connected gamepad
    layouts: HashMap<GamepadId, GamepadLayout>,
}

impl<S: CollectionState> EventCollector<S> {
    // Re-enumerate connected gamepads, refreshing the index translation tables
    fn enumerate_roster(&mut self) -> Vec<Device> {
        let mut roster = Vec::new();
        let mut layouts = HashMap::new();

        for (id, gamepad) in self.gilrs.gamepads() {
            let (device, layout) = describe_gamepad(id, &gamepad);
            roster.push(device);
            layouts.insert(id, layout);
        }

        self.layouts = layouts;
        roster
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<RawJoystickEvent>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, settings, event_sender, HashMap::new()))
    }

    /// Enumerates the startup roster and transitions to `Collecting`.
    ///
    /// An empty roster is fatal: there is nothing to normalize.
    pub fn initialize(
        mut self,
    ) -> Result<(EventCollector<Collecting>, Vec<Device>), CollectorError> {
        let roster = self.enumerate_roster();

        if roster.is_empty() {
            error!("No gamepad connected");
            return Err(CollectorError::NoDevices);
        }

        info!("Found {} gamepads:", roster.len());
        for device in &roster {
            info!(
                "  [{}] Name: {}, {} axes, {} buttons",
                device.id,
                device.name,
                device.axes.len(),
                device.buttons.len()
            );
        }

        info!("Event Collector initialized, transitioning to Collecting state");
        Ok((self.transition(), roster))
    }
}

impl EventCollector<Collecting> {
    /// Translates and forwards one pending gilrs event.
    ///
    /// Returns `Ok(false)` when no event was pending.
    pub fn collect_next_event(&mut self) -> Result<bool, CollectorError> {
        let Some(Event { id, event, time, .. }) = self.gilrs.next_event() else {
            return Ok(false);
        };
        debug!("Processing gilrs event: {:?} at time: {:?}", event, time);

        if let Some(raw_event) = self.convert_gilrs_event(id, event) {
            match self.event_sender.blocking_send(raw_event) {
                Ok(_) => debug!("Event sent to normalizer queue"),
                Err(e) => {
                    error!("Failed to send event to normalizer: {}", e);
                    return Err(CollectorError::EventSendError(e.to_string()));
                }
            }
        } else {
            debug!("Event ignored due to filtering or mapping");
        }

        Ok(true)
    }

    /// Polls until `cancel` fires or the normalizer hangs up
    pub fn run_collection_loop(&mut self, cancel: CancellationToken) -> Result<(), CollectorError> {
        info!("Starting Event Collector loop");

        let idle = std::time::Duration::from_micros(self.settings.poll_interval_us);
        let mut event_count = 0u64;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        while !cancel.is_cancelled() {
            match self.collect_next_event() {
                Ok(true) => event_count += 1,
                Ok(false) => std::thread::sleep(idle),
                Err(e @ CollectorError::EventSendError(_)) => return Err(e),
                Err(e) => error!("Error collecting event: {}", e),
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                debug!(
                    "Event Collector stats: {} events in last {} seconds",
                    event_count,
                    log_interval.num_seconds()
                );
                event_count = 0;
                last_log_time = now;
            }
        }

        info!("Event Collector loop cancelled");
        Ok(())
    }

    fn convert_gilrs_event(&mut self, id: GamepadId, event: EventType) -> Option<RawJoystickEvent> {
        let device = DeviceId(usize::from(id));
        let timestamp = Local::now();

        match event {
            EventType::AxisChanged(axis, value, _) => {
                let index = self.axis_index(id, axis)?;
                Some(RawJoystickEvent::AxisChanged {
                    device,
                    axis: index,
                    value,
                    timestamp,
                })
            }
            EventType::ButtonPressed(button, _) => {
                let index = self.button_index(id, button)?;
                Some(RawJoystickEvent::ButtonChanged {
                    device,
                    button: index,
                    pressed: true,
                    timestamp,
                })
            }
            EventType::ButtonReleased(button, _) => {
                let index = self.button_index(id, button)?;
                Some(RawJoystickEvent::ButtonChanged {
                    device,
                    button: index,
                    pressed: false,
                    timestamp,
                })
            }
            EventType::ButtonRepeated(button, _) => {
                debug!("Button repeat ignored: {:?}", button);
                None
            }
            EventType::Connected => {
                info!("Controller {} connected", device);
                let roster = self.enumerate_roster();
                Some(RawJoystickEvent::Connected {
                    device,
                    roster,
                    timestamp,
                })
            }
            EventType::Disconnected => {
                warn!("Controller {} disconnected", device);
                let roster = self.enumerate_roster();
                Some(RawJoystickEvent::Disconnected {
                    device,
                    roster,
                    timestamp,
                })
            }
            _ => {
                debug!("Unhandled event type: {:?}", event);
                None
            }
        }
    }

    fn axis_index(&self, id: GamepadId, axis: GilrsAxis) -> Option<usize> {
        let index = self
            .layouts
            .get(&id)
            .and_then(|layout| layout.axes.iter().position(|a| *a == axis));
        if index.is_none() {
            debug!("Ignoring unmapped axis {:?} on gamepad {}", axis, id);
        }
        index
    }

    fn button_index(&self, id: GamepadId, button: GilrsButton) -> Option<usize> {
        let index = self
            .layouts
            .get(&id)
            .and_then(|layout| layout.buttons.iter().position(|b| *b == button));
        if index.is_none() {
            debug!("Ignoring unmapped button {:?} on gamepad {}", button, id);
        }
        index
    }
}

fn describe_gamepad(id: GamepadId, gamepad: &Gamepad<'_>) -> (Device, GamepadLayout) {
    let mut device = Device::new(DeviceId(usize::from(id)), gamepad.name());
    let mut layout = GamepadLayout::default();

    for (axis, name, role) in AXIS_LAYOUT {
        if let Some(code) = gamepad.axis_code(axis) {
            let dead_zone = gamepad.deadzone(code).unwrap_or(0.0);
            device = device.with_axis(name, role, dead_zone);
            layout.axes.push(axis);
        }
    }

    for (button, name, role) in BUTTON_LAYOUT {
        if gamepad.button_code(button).is_some() {
            device = device.with_button(name, role);
            layout.buttons.push(button);
        }
    }

    (device, layout)
}
