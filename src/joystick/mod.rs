//! Joystick subsystem: raw gamepad input to normalized per-device state
//!
//! Pipeline:
//!
//! 1. [`event_collector`] - gilrs polling, roster enumeration, raw events
//! 2. [`normalizer`] - dead zones, POV decomposition, trigger synthesis
//! 3. [`normalizer_handle`] - task owning the normalizer, publishes snapshots
//! 4. [`joystick_handle`] - unified startup API and diagnostic dump
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Collector ──mpsc──► Normalizer ──watch──► JoystickSnapshot
//!             (thread)            (tokio task)
//! ```

pub mod device;
pub mod dump;
pub mod event;
pub mod event_collector;
pub mod joystick_handle;
pub mod normalizer;
pub mod normalizer_handle;
pub mod state;

pub use device::{Axis, AxisRole, Button, ButtonRole, Device, DeviceId};
pub use event::{RawJoystickEvent, StateChange};
pub use joystick_handle::{JoystickError, JoystickHandle, JoystickSettings};
pub use normalizer::{JoystickNormalizer, NormalizerError, NormalizerSettings, TriggerSynthesis};
pub use state::{DeviceCapabilities, DeviceState, JoystickSnapshot, StickPosition};
