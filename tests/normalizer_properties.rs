use joyscope::joystick::dump::{parse_dump, write_dump};
use joyscope::joystick::{
    AxisRole, ButtonRole, Device, DeviceId, JoystickNormalizer, NormalizerSettings, StateChange,
    TriggerSynthesis,
};

const PAD: DeviceId = DeviceId(0);
const STICK_X: usize = 0;
const LEFT_TRIGGER_AXIS: usize = 1;
const POV_X: usize = 2;
const LEFT_TRIGGER_BUTTON: usize = 1;
const DPAD_LEFT_BUTTON: usize = 2;

fn gamepad(dead_zone: f32) -> Device {
    Device::new(PAD, "Property Pad")
        .with_axis("X", AxisRole::X, dead_zone)
        .with_axis("LT", AxisRole::LeftTrigger, dead_zone)
        .with_axis("POV X", AxisRole::PovX, 0.0)
        .with_axis("Y", AxisRole::Y, dead_zone)
        .with_button("A", ButtonRole::ActionBottom)
        .with_button("L2", ButtonRole::LeftTrigger)
        .with_button("DPad Left", ButtonRole::DPadLeft)
}

fn normalizer(dead_zone: f32, trigger_synthesis: TriggerSynthesis) -> JoystickNormalizer {
    let settings = NormalizerSettings {
        global_dead_zone: 0.0,
        trigger_synthesis,
    };
    JoystickNormalizer::new(Some(settings), &[gamepad(dead_zone)])
}

fn axis_values(changes: &[StateChange]) -> Vec<f32> {
    changes
        .iter()
        .filter_map(|c| match c {
            StateChange::Axis { value, .. } => Some(*value),
            _ => None,
        })
        .collect()
}

fn button_transitions(changes: &[StateChange]) -> Vec<(ButtonRole, bool)> {
    changes
        .iter()
        .filter_map(|c| match c {
            StateChange::Button { role, pressed, .. } => Some((*role, *pressed)),
            _ => None,
        })
        .collect()
}

#[test]
fn dead_zone_emits_a_single_zero_edge() {
    let dead_zone = 0.2;
    let mut n = normalizer(dead_zone, TriggerSynthesis::Auto);

    let mut emitted = Vec::new();
    for raw in [0.5, 0.3 * dead_zone, 0.5, 0.3 * dead_zone, 0.3 * dead_zone] {
        emitted.extend(axis_values(&n.on_axis_event(PAD, STICK_X, raw)));
    }

    assert_eq!(emitted, vec![0.5, 0.0, 0.5, 0.0]);
}

#[test]
fn sub_threshold_noise_from_rest_is_discarded() {
    let mut n = normalizer(0.2, TriggerSynthesis::Auto);
    assert!(n.on_axis_event(PAD, STICK_X, 0.1).is_empty());
    assert!(n.on_axis_event(PAD, STICK_X, -0.1).is_empty());
}

#[test]
fn pov_sweep_through_center_never_holds_both_directions() {
    let mut n = normalizer(0.0, TriggerSynthesis::Auto);

    let mut transitions = Vec::new();
    for raw in [-1.0, 0.0, 1.0] {
        transitions.extend(button_transitions(&n.on_axis_event(PAD, POV_X, raw)));
        let state = n.state(PAD).unwrap();
        assert!(!(state.button(ButtonRole::DPadLeft) && state.button(ButtonRole::DPadRight)));
    }

    assert_eq!(
        transitions,
        vec![
            (ButtonRole::DPadLeft, true),
            (ButtonRole::DPadLeft, false),
            (ButtonRole::DPadRight, true),
        ]
    );
}

#[test]
fn trigger_stays_pressed_until_both_channels_release() {
    let mut n = normalizer(0.0, TriggerSynthesis::Always);

    let changes = n.on_axis_event(PAD, LEFT_TRIGGER_AXIS, 0.7);
    assert_eq!(button_transitions(&changes), vec![(ButtonRole::LeftTrigger, true)]);

    let changes = n.on_button_event(PAD, LEFT_TRIGGER_BUTTON, true);
    assert!(button_transitions(&changes).is_empty());

    let changes = n.on_button_event(PAD, LEFT_TRIGGER_BUTTON, false);
    assert!(button_transitions(&changes).is_empty());
    assert!(n.state(PAD).unwrap().button(ButtonRole::LeftTrigger));

    let changes = n.on_axis_event(PAD, LEFT_TRIGGER_AXIS, 0.0);
    assert_eq!(button_transitions(&changes), vec![(ButtonRole::LeftTrigger, false)]);
    assert!(!n.state(PAD).unwrap().button(ButtonRole::LeftTrigger));
}

#[test]
fn dpad_stays_pressed_until_pov_and_button_both_release() {
    let mut n = normalizer(0.0, TriggerSynthesis::Auto);

    let changes = n.on_axis_event(PAD, POV_X, -1.0);
    assert_eq!(button_transitions(&changes), vec![(ButtonRole::DPadLeft, true)]);

    let changes = n.on_button_event(PAD, DPAD_LEFT_BUTTON, true);
    assert!(button_transitions(&changes).is_empty());

    let changes = n.on_button_event(PAD, DPAD_LEFT_BUTTON, false);
    assert!(button_transitions(&changes).is_empty());
    assert!(n.state(PAD).unwrap().button(ButtonRole::DPadLeft));

    // the POV keeps steering the direction after the button let go
    let changes = n.on_axis_event(PAD, POV_X, 1.0);
    assert_eq!(
        button_transitions(&changes),
        vec![(ButtonRole::DPadLeft, false), (ButtonRole::DPadRight, true)]
    );
}

#[test]
fn dedicated_trigger_button_disables_axis_synthesis_in_auto_mode() {
    let mut n = normalizer(0.0, TriggerSynthesis::Auto);
    let changes = n.on_axis_event(PAD, LEFT_TRIGGER_AXIS, 0.7);
    assert!(button_transitions(&changes).is_empty());
    assert!(!n.state(PAD).unwrap().left_trigger_axis);
}

#[test]
fn reconnect_resets_device_state() {
    let mut n = normalizer(0.2, TriggerSynthesis::Auto);
    let pristine = n.state(PAD).unwrap().clone();

    n.on_axis_event(PAD, STICK_X, 0.9);
    n.on_axis_event(PAD, POV_X, 1.0);
    n.on_button_event(PAD, 0, true);
    assert_ne!(n.state(PAD).unwrap(), &pristine);

    n.on_device_disconnected(PAD, &[]);
    assert!(n.state(PAD).is_none());

    n.on_device_connected(PAD, &[gamepad(0.2)]);
    assert_eq!(n.state(PAD).unwrap(), &pristine);

    // the hysteresis cache was dropped with the old state
    assert!(n.on_axis_event(PAD, STICK_X, 0.1).is_empty());
}

#[test]
fn dump_round_trip_keeps_counts_and_roles() {
    let devices = vec![gamepad(0.15), Device::new(DeviceId(4), "Bare")];
    let mut out = Vec::new();
    write_dump(&devices, &mut out).unwrap();

    let parsed = parse_dump(&String::from_utf8(out).unwrap()).unwrap();
    assert_eq!(parsed.len(), devices.len());
    for (original, recovered) in devices.iter().zip(&parsed) {
        assert_eq!(recovered.id, original.id);
        assert_eq!(recovered.axes.len(), original.axes.len());
        assert_eq!(recovered.buttons.len(), original.buttons.len());
        let roles = |d: &Device| d.axes.iter().map(|a| a.role).collect::<Vec<_>>();
        assert_eq!(roles(recovered), roles(original));
        let buttons = |d: &Device| d.buttons.iter().map(|b| b.role).collect::<Vec<_>>();
        assert_eq!(buttons(recovered), buttons(original));
    }
}

#[test]
fn repeated_axis_event_only_repeats_the_value_update() {
    let mut n = normalizer(0.0, TriggerSynthesis::Always);

    for index in [STICK_X, POV_X, LEFT_TRIGGER_AXIS] {
        n.on_axis_event(PAD, index, 1.0);
        let again = n.on_axis_event(PAD, index, 1.0);
        assert_eq!(axis_values(&again), vec![1.0]);
        assert!(button_transitions(&again).is_empty());
    }
}
