use chrono::Local;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::device::Device;
use super::event::RawJoystickEvent;
use super::normalizer::{JoystickNormalizer, NormalizerSettings};
use super::state::JoystickSnapshot;

/// Owns the normalizer task and hands out snapshot receivers
pub struct NormalizerHandle {
    state_receiver: watch::Receiver<JoystickSnapshot>,
}

impl NormalizerHandle {
    /// Spawns the normalizer as a tokio task seeded with the startup roster.
    ///
    /// The task ends when every sender of `event_receiver` is dropped.
    pub fn spawn(
        event_receiver: mpsc::Receiver<RawJoystickEvent>,
        roster: &[Device],
        settings: Option<NormalizerSettings>,
    ) -> Self {
        info!("Spawning Joystick Normalizer with settings: {:?}", settings);

        let normalizer = JoystickNormalizer::new(settings, roster);
        let (state_sender, state_receiver) = watch::channel(normalizer.snapshot());
        debug!("Created watch channel for joystick snapshots");

        let task_handle = tokio::spawn(run_normalizer_loop(normalizer, event_receiver, state_sender));
        debug!("Tokio task spawned with handle: {:?}", task_handle);

        Self { state_receiver }
    }

    pub fn subscribe(&self) -> watch::Receiver<JoystickSnapshot> {
        self.state_receiver.clone()
    }
}

async fn run_normalizer_loop(
    mut normalizer: JoystickNormalizer,
    mut event_receiver: mpsc::Receiver<RawJoystickEvent>,
    state_sender: watch::Sender<JoystickSnapshot>,
) {
    info!("Joystick Normalizer task started");

    let mut total_events = 0u64;
    let mut total_changes = 0u64;
    let mut max_latency = chrono::Duration::zero();
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    while let Some(event) = event_receiver.recv().await {
        let latency = Local::now() - event.timestamp();
        max_latency = max_latency.max(latency);
        debug!(
            "Event from device {} queued for {}us",
            event.device(),
            latency.num_microseconds().unwrap_or(i64::MAX)
        );

        let roster_event = matches!(
            event,
            RawJoystickEvent::Connected { .. } | RawJoystickEvent::Disconnected { .. }
        );

        let changes = normalizer.apply(event);
        total_events += 1;
        total_changes += changes.len() as u64;

        if roster_event || !changes.is_empty() {
            // Readers only ever observe complete post-update state
            state_sender.send_replace(normalizer.snapshot());
            debug!("Published snapshot after {} change(s)", changes.len());
        }

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            info!(
                "Normalizer stats: {} events, {} state changes in {} seconds, max queue latency {}ms",
                total_events,
                total_changes,
                (now - last_stats_time).num_seconds(),
                max_latency.num_milliseconds()
            );
            total_events = 0;
            total_changes = 0;
            max_latency = chrono::Duration::zero();
            last_stats_time = now;
        }
    }

    info!("Event channel closed, Joystick Normalizer stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joystick::device::{AxisRole, ButtonRole, DeviceId};

    fn pad() -> Device {
        Device::new(DeviceId(2), "Task Pad")
            .with_axis("X", AxisRole::X, 0.0)
            .with_button("A", ButtonRole::ActionBottom)
    }

    #[tokio::test]
    async fn publishes_snapshot_after_state_change() {
        let (tx, rx) = mpsc::channel(8);
        let handle = NormalizerHandle::spawn(rx, &[pad()], None);
        let mut snapshots = handle.subscribe();
        assert!(!snapshots.borrow().get(DeviceId(2)).unwrap().button(ButtonRole::ActionBottom));

        tx.send(RawJoystickEvent::button(DeviceId(2), 0, true))
            .await
            .unwrap();
        snapshots.changed().await.unwrap();

        let snapshot = snapshots.borrow_and_update().clone();
        assert!(snapshot.get(DeviceId(2)).unwrap().button(ButtonRole::ActionBottom));
    }

    #[tokio::test]
    async fn axis_event_updates_published_values() {
        let (tx, rx) = mpsc::channel(8);
        let handle = NormalizerHandle::spawn(rx, &[pad()], None);
        let mut snapshots = handle.subscribe();

        tx.send(RawJoystickEvent::axis(DeviceId(2), 0, 0.75))
            .await
            .unwrap();
        snapshots.changed().await.unwrap();

        let snapshot = snapshots.borrow_and_update().clone();
        let state = snapshot.get(DeviceId(2)).unwrap();
        assert_eq!(state.x_axis, 0.75);
        assert_eq!(state.axis_value(0), Some(0.75));
    }

    #[tokio::test]
    async fn stops_when_event_senders_are_dropped() {
        let (tx, rx) = mpsc::channel(8);
        let handle = NormalizerHandle::spawn(rx, &[pad()], None);
        let mut snapshots = handle.subscribe();
        drop(handle);
        drop(tx);

        assert!(snapshots.changed().await.is_err());
    }
}
