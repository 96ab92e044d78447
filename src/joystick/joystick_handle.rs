//! Joystick Handle - Unified API for the joystick pipeline
//!
//! Wires the gilrs event collector to the normalizer task, writes the startup
//! diagnostic dump and hands out snapshot receivers for the display layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::device::Device;
use super::dump::{self, DumpError};
use super::event::RawJoystickEvent;
use super::event_collector::{CollectorError, CollectorSettings, EventCollector};
use super::normalizer::{NormalizerSettings, TriggerSynthesis};
use super::normalizer_handle::NormalizerHandle;
use super::state::JoystickSnapshot;

/// Configuration for the whole joystick pipeline
///
/// Split into [`CollectorSettings`] and [`NormalizerSettings`] when the pipeline starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickSettings {
    /// Lower bound applied to every axis dead zone
    pub global_dead_zone: f32,

    /// When trigger axes are turned into trigger buttons
    pub trigger_synthesis: TriggerSynthesis,

    /// Capacity of the collector → normalizer channel
    pub event_buffer: usize,

    /// Collector idle sleep in microseconds
    pub poll_interval_us: u64,
}

impl Default for JoystickSettings {
    fn default() -> Self {
        Self {
            global_dead_zone: 0.05,
            trigger_synthesis: TriggerSynthesis::Auto,
            event_buffer: 1000,
            poll_interval_us: 100,
        }
    }
}

/// Errors that can occur while starting the joystick pipeline
#[derive(Debug, thiserror::Error)]
pub enum JoystickError {
    #[error("Collector error: {0}")]
    CollectorError(#[from] CollectorError),

    #[error("Dump error: {0}")]
    DumpError(#[from] DumpError),

    #[error("Initialization error: {0}")]
    InitializationError(String),
}

/// Handle for the running collector thread and normalizer task
pub struct JoystickHandle {
    roster: Vec<Device>,
    dump_path: PathBuf,
    normalizer: NormalizerHandle,
    cancel: CancellationToken,
    collector_thread: Option<JoinHandle<()>>,
}

impl JoystickHandle {
    /// Starts the pipeline.
    ///
    /// 1. Spawns the collector thread, which owns gilrs and enumerates the roster
    /// 2. Writes the diagnostic dump for that roster into `dump_directory`
    /// 3. Spawns the normalizer task seeded with the roster
    ///
    /// # Errors
    ///
    /// * [`JoystickError::CollectorError`] - gilrs failed or no gamepad is connected
    /// * [`JoystickError::DumpError`] - the diagnostic dump could not be written
    pub async fn spawn(
        settings: Option<JoystickSettings>,
        dump_directory: &Path,
        cancel: CancellationToken,
    ) -> Result<Self, JoystickError> {
        info!("Initializing joystick pipeline with settings: {:?}", settings);
        let settings = settings.unwrap_or_default();

        let collector_settings = CollectorSettings {
            poll_interval_us: settings.poll_interval_us,
        };
        let normalizer_settings = NormalizerSettings {
            global_dead_zone: settings.global_dead_zone,
            trigger_synthesis: settings.trigger_synthesis,
        };
        debug!(
            "Split settings: collector={:?}, normalizer={:?}",
            collector_settings, normalizer_settings
        );

        let (event_sender, event_receiver) = mpsc::channel(settings.event_buffer.max(1));
        debug!("Created event channel with buffer capacity {}", settings.event_buffer);

        let (roster_sender, roster_receiver) = oneshot::channel();
        let collector_cancel = cancel.clone();
        let collector_thread = std::thread::Builder::new()
            .name("joystick-collector".to_string())
            .spawn(move || {
                run_collector(collector_settings, event_sender, roster_sender, collector_cancel)
            })
            .map_err(|e| JoystickError::InitializationError(e.to_string()))?;

        let roster = roster_receiver
            .await
            .map_err(|_| {
                JoystickError::InitializationError("collector exited before reporting".into())
            })??;

        let dump_path = match dump::write_dump_file(&roster, dump_directory) {
            Ok(path) => path,
            Err(e) => {
                error!("{}", e);
                cancel.cancel();
                return Err(e.into());
            }
        };

        let normalizer =
            NormalizerHandle::spawn(event_receiver, &roster, Some(normalizer_settings));
        info!("Joystick pipeline initialized with {} device(s)", roster.len());

        Ok(Self {
            roster,
            dump_path,
            normalizer,
            cancel,
            collector_thread: Some(collector_thread),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<JoystickSnapshot> {
        debug!("New subscriber to joystick snapshots");
        self.normalizer.subscribe()
    }

    /// Roster enumerated at startup
    pub fn roster(&self) -> &[Device] {
        &self.roster
    }

    pub fn dump_path(&self) -> &Path {
        &self.dump_path
    }

    /// Cancels the collector and waits for its thread to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.collector_thread.take() {
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => info!("Joystick collector stopped"),
                Ok(Err(_)) => warn!("Joystick collector thread panicked"),
                Err(e) => warn!("Failed to join joystick collector: {}", e),
            }
        }
    }
}

// Runs on the dedicated collector thread; gilrs never leaves it
fn run_collector(
    settings: CollectorSettings,
    event_sender: mpsc::Sender<RawJoystickEvent>,
    roster_sender: oneshot::Sender<Result<Vec<Device>, CollectorError>>,
    cancel: CancellationToken,
) {
    let started = EventCollector::create(Some(settings), event_sender)
        .and_then(|collector| collector.initialize());

    let mut collector = match started {
        Ok((collector, roster)) => {
            if roster_sender.send(Ok(roster)).is_err() {
                warn!("Joystick pipeline dropped before the roster arrived");
                return;
            }
            collector
        }
        Err(e) => {
            let _ = roster_sender.send(Err(e));
            return;
        }
    };

    if let Err(e) = collector.run_collection_loop(cancel) {
        error!("Collector terminated with error: {}", e);
    }
}
