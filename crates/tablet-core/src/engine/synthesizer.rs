//! The per-device proximity state machine.
//!
//! # States (for beginners)
//!
//! A tablet keeps reporting while a tool hovers above it, but the very first
//! report after the tool arrives often carries garbage coordinates.  So a
//! device does not tell the host about a new tool straight away:
//!
//! - **Out** – no tool near this device.
//! - **Armed** – a tool was seen once.  Nothing has been reported yet.
//! - **Active** – a second, *different* report confirmed the tool.  A
//!   proximity-in was sent and motion and buttons now flow to the host.
//!
//! Leaving proximity from any state releases held buttons and returns to Out;
//! the host only hears a proximity-out if it heard the proximity-in.
//!
//! The device's previous-sample snapshot is written exactly once, at the very
//! end of [`EventSynthesizer::step`].

use tracing::trace;

use crate::domain::device::{LogicalDevice, SampleSnapshot, DEFAULT_SPEED};
use crate::domain::display::{DisplayLayout, ScreenMapper, ScreenTarget};
use crate::domain::tool::{Mode, ProximityState, RawSample, ToolType};

use super::buttons;
use super::events::InputEvent;

/// Key codes available to macro buttons start at 8.
const MACRO_KEYCODE_OFFSET: u32 = 7;

/// Link-wide inputs to one synthesizer step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub layout: &'a DisplayLayout,
    /// The tablet reports tilt for pen tools.
    pub tilt_supported: bool,
    /// Out-of-proximity samples with buttons held are macro key presses.
    pub macro_keys: bool,
}

/// Reduced coordinates of one sample, ready to be reported.
#[derive(Debug, Clone, Copy, Default)]
struct Reduced {
    x: i32,
    y: i32,
    z: i32,
    tilt_x: i32,
    tilt_y: i32,
    wheel: i32,
}

/// Converts raw samples into input events for one logical device.
pub struct EventSynthesizer;

impl EventSynthesizer {
    /// Runs one sample through `device`'s state machine, appending the
    /// resulting events to `events`.
    pub fn step(
        device: &mut LogicalDevice,
        sample: &RawSample,
        ctx: &StepContext<'_>,
        events: &mut Vec<InputEvent>,
    ) {
        let prev = device.previous;
        let mut reduced = reduce(device, sample, &prev);
        let mut buttons = sample.buttons;

        trace!(
            device = %device.name,
            state = ?device.state,
            proximity = sample.proximity,
            x = sample.x,
            y = sample.y,
            z = sample.z,
            buttons = sample.buttons,
            "synthesizer step"
        );

        if sample.proximity {
            let mut target = None;
            let was_active = device.state == ProximityState::Active;

            match device.state {
                ProximityState::Out => {
                    device.state = ProximityState::Armed;
                }
                ProximityState::Armed if differs(&prev, sample, ctx.tilt_supported) => {
                    if device.mode == Mode::Relative {
                        reduced = Reduced::default();
                    }
                    let t = ScreenMapper::map(device, reduced.x, reduced.y, ctx.layout);
                    events.push(InputEvent::ProximityIn {
                        device: device.id(),
                        screen: t.screen,
                    });
                    device.state = ProximityState::Active;
                    target = Some(t);
                }
                ProximityState::Armed | ProximityState::Active => {}
            }

            if device.state == ProximityState::Active {
                let target = match target {
                    Some(t) => t,
                    None => ScreenMapper::map(device, reduced.x, reduced.y, ctx.layout),
                };
                if !device.buttons_only {
                    events.push(motion(device, &reduced, &target));
                }
                if prev.buttons != buttons {
                    emit_buttons(device, prev.buttons, buttons, events);
                }
                if was_active {
                    emit_ticks(device, &prev, sample, events);
                }
            }
        } else {
            if prev.buttons != 0 {
                emit_buttons(device, prev.buttons, 0, events);
                buttons = 0;
            }
            if !device.core_pointer && ctx.macro_keys && buttons != 0 {
                let keycode = (sample.z / 2).max(0) as u32 + MACRO_KEYCODE_OFFSET;
                trace!(device = %device.name, keycode, "macro key");
                for pressed in [true, false] {
                    events.push(InputEvent::Key {
                        device: device.id(),
                        keycode,
                        pressed,
                    });
                }
            }
            if device.state == ProximityState::Active {
                events.push(InputEvent::ProximityOut { device: device.id() });
            }
            device.state = ProximityState::Out;
        }

        device.previous = SampleSnapshot::capture(sample, buttons);
    }
}

/// Clamped-and-offset coordinates in absolute mode, deltas in relative mode.
fn reduce(device: &LogicalDevice, sample: &RawSample, prev: &SampleSnapshot) -> Reduced {
    match device.mode {
        Mode::Absolute => {
            let area = device.area();
            Reduced {
                x: area.reduce_x(sample.x),
                y: area.reduce_y(sample.y),
                z: sample.z,
                tilt_x: sample.tilt_x,
                tilt_y: sample.tilt_y,
                wheel: sample.wheel,
            }
        }
        Mode::Relative => Reduced {
            x: accelerate(device, sample.x - prev.x),
            y: accelerate(device, sample.y - prev.y),
            z: sample.z - prev.z,
            tilt_x: sample.tilt_x - prev.tilt_x,
            tilt_y: sample.tilt_y - prev.tilt_y,
            wheel: sample.wheel - prev.wheel,
        },
    }
}

/// Scales a relative delta by the device speed, leaving small jitter alone.
/// The scaled delta is truncated toward zero.
fn accelerate(device: &LogicalDevice, delta: i32) -> i32 {
    let speed = device.speed();
    if (speed - DEFAULT_SPEED).abs() > f64::EPSILON && f64::from(delta.abs()) > device.jitter_threshold() {
        (f64::from(delta) * speed) as i32
    } else {
        delta
    }
}

fn differs(prev: &SampleSnapshot, sample: &RawSample, tilt_supported: bool) -> bool {
    prev.x != sample.x
        || prev.y != sample.y
        || prev.z != sample.z
        || (sample.tool.is_pen()
            && tilt_supported
            && (prev.tilt_x != sample.tilt_x || prev.tilt_y != sample.tilt_y))
}

fn motion(device: &LogicalDevice, reduced: &Reduced, target: &ScreenTarget) -> InputEvent {
    let absolute = device.mode == Mode::Absolute;
    let (x, y) = if absolute {
        (target.x, target.y)
    } else {
        (reduced.x, reduced.y)
    };
    InputEvent::Motion {
        device: device.id(),
        absolute,
        x,
        y,
        z: reduced.z,
        tilt_x: reduced.tilt_x,
        tilt_y: reduced.tilt_y,
        wheel: reduced.wheel,
        screen: target.screen,
    }
}

fn emit_buttons(device: &LogicalDevice, old: u16, new: u16, events: &mut Vec<InputEvent>) {
    for t in buttons::diff(old, new) {
        if let Some(button) = device.button_map.resolve(t.button) {
            events.push(InputEvent::Button {
                device: device.id(),
                button,
                pressed: t.pressed,
            });
        }
    }
}

/// Wheel and touch-strip clicks for a device that was already active.
fn emit_ticks(
    device: &LogicalDevice,
    prev: &SampleSnapshot,
    sample: &RawSample,
    events: &mut Vec<InputEvent>,
) {
    let wb = device.wheel_buttons;
    let wheel = sample.wheel - prev.wheel;

    match device.tool() {
        ToolType::Cursor if wheel != 0 => {
            click(device, if wheel > 0 { wb.rel_up } else { wb.rel_down }, events);
        }
        ToolType::Pad => {
            if wheel != 0 {
                click(device, if wheel > 0 { wb.abs_up } else { wb.abs_down }, events);
            }
            // A strip reads 0 while untouched; only finger movement ticks
            if let Some(up) = strip_direction(prev.strip_x, sample.strip_x) {
                click(device, if up { wb.strip_left_up } else { wb.strip_left_down }, events);
            }
            if let Some(up) = strip_direction(prev.strip_y, sample.strip_y) {
                click(device, if up { wb.strip_right_up } else { wb.strip_right_down }, events);
            }
        }
        _ => {}
    }
}

fn strip_direction(old: i32, new: i32) -> Option<bool> {
    (old != 0 && new != 0 && old != new).then_some(new < old)
}

fn click(device: &LogicalDevice, button: u16, events: &mut Vec<InputEvent>) {
    if button == 0 {
        return;
    }
    for pressed in [true, false] {
        events.push(InputEvent::Button {
            device: device.id(),
            button,
            pressed,
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::DeviceConfig;
    use crate::domain::tool::MappedArea;

    fn layout() -> DisplayLayout {
        DisplayLayout::single(1000, 1000).unwrap()
    }

    fn device(tool: ToolType, mode: Mode) -> LogicalDevice {
        let mut cfg = DeviceConfig::new("dev", tool, 1000, 1000);
        cfg.mode = mode;
        LogicalDevice::new(cfg).unwrap()
    }

    fn sample(tool: ToolType, proximity: bool, x: i32, y: i32) -> RawSample {
        RawSample {
            x,
            y,
            proximity,
            ..RawSample::out_of_proximity(tool, 0)
        }
    }

    fn run(dev: &mut LogicalDevice, s: RawSample) -> Vec<InputEvent> {
        let layout = layout();
        let ctx = StepContext {
            layout: &layout,
            tilt_supported: true,
            macro_keys: true,
        };
        let mut events = Vec::new();
        EventSynthesizer::step(dev, &s, &ctx, &mut events);
        events
    }

    fn activate(dev: &mut LogicalDevice, tool: ToolType) {
        run(dev, sample(tool, true, 100, 100));
        run(dev, sample(tool, true, 110, 110));
        assert_eq!(dev.state(), ProximityState::Active);
    }

    // ── First touch ───────────────────────────────────────────────────────────

    #[test]
    fn test_first_sample_arms_without_events() {
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        let events = run(&mut dev, sample(ToolType::Stylus, true, 100, 100));
        assert!(events.is_empty());
        assert_eq!(dev.state(), ProximityState::Armed);
    }

    #[test]
    fn test_identical_second_sample_stays_armed() {
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        run(&mut dev, sample(ToolType::Stylus, true, 100, 100));
        let events = run(&mut dev, sample(ToolType::Stylus, true, 100, 100));
        assert!(events.is_empty());
        assert_eq!(dev.state(), ProximityState::Armed);
    }

    #[test]
    fn test_differing_sample_emits_proximity_in_then_motion() {
        // Arrange
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        run(&mut dev, sample(ToolType::Stylus, true, 100, 100));

        // Act
        let events = run(&mut dev, sample(ToolType::Stylus, true, 500, 250));

        // Assert
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], InputEvent::ProximityIn { device: dev.id(), screen: 0 });
        assert!(matches!(
            events[1],
            InputEvent::Motion { absolute: true, x: 500, y: 250, .. }
        ));
    }

    #[test]
    fn test_relative_mode_first_motion_has_zero_deltas() {
        let mut dev = device(ToolType::Cursor, Mode::Relative);
        run(&mut dev, sample(ToolType::Cursor, true, 100, 100));
        let events = run(&mut dev, sample(ToolType::Cursor, true, 400, 300));
        assert!(matches!(events[0], InputEvent::ProximityIn { .. }));
        assert!(matches!(
            events[1],
            InputEvent::Motion { absolute: false, x: 0, y: 0, z: 0, wheel: 0, .. }
        ));
    }

    #[test]
    fn test_tilt_change_confirms_pen_when_tilt_supported() {
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        run(&mut dev, sample(ToolType::Stylus, true, 100, 100));
        let tilted = RawSample { tilt_x: 12, ..sample(ToolType::Stylus, true, 100, 100) };
        let events = run(&mut dev, tilted);
        assert!(matches!(events[0], InputEvent::ProximityIn { .. }));
    }

    // ── Active ────────────────────────────────────────────────────────────────

    #[test]
    fn test_relative_motion_reports_deltas() {
        let mut dev = device(ToolType::Cursor, Mode::Relative);
        activate(&mut dev, ToolType::Cursor);
        let events = run(&mut dev, sample(ToolType::Cursor, true, 115, 100));
        assert!(matches!(events[0], InputEvent::Motion { x: 5, y: -10, .. }));
    }

    #[test]
    fn test_speed_accelerates_only_beyond_jitter_threshold() {
        // Arrange: speed 2 gives a jitter threshold of 6
        let mut dev = device(ToolType::Cursor, Mode::Relative);
        dev.set_speed(2.0).unwrap();
        activate(&mut dev, ToolType::Cursor);

        // Act
        let events = run(&mut dev, sample(ToolType::Cursor, true, 120, 114));

        // Assert: x moved 10 (scaled), y moved 4 (left alone)
        assert!(matches!(events[0], InputEvent::Motion { x: 20, y: 4, .. }));
    }

    #[test]
    fn test_fractional_speed_truncates_toward_zero() {
        // Arrange: speed 1.5 gives a jitter threshold of 4.5
        let mut dev = device(ToolType::Cursor, Mode::Relative);
        dev.set_speed(1.5).unwrap();
        activate(&mut dev, ToolType::Cursor);

        // Act
        let events = run(&mut dev, sample(ToolType::Cursor, true, 115, 105));

        // Assert: 5 * 1.5 and -5 * 1.5 both drop their fraction
        assert!(matches!(events[0], InputEvent::Motion { x: 7, y: -7, .. }));
    }

    #[test]
    fn test_absolute_mode_clamps_outside_area() {
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        dev.set_area(MappedArea::new(0, 0, 500, 500)).unwrap();
        activate(&mut dev, ToolType::Stylus);
        let events = run(&mut dev, sample(ToolType::Stylus, true, 900, -20));
        assert!(matches!(events[0], InputEvent::Motion { x: 1000, y: 0, .. }));
    }

    #[test]
    fn test_buttons_only_device_reports_no_motion() {
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        dev.buttons_only = true;
        activate(&mut dev, ToolType::Stylus);
        let pressed = RawSample { buttons: 0b1, ..sample(ToolType::Stylus, true, 130, 130) };
        let events = run(&mut dev, pressed);
        assert_eq!(
            events,
            vec![InputEvent::Button { device: dev.id(), button: 1, pressed: true }]
        );
    }

    #[test]
    fn test_button_map_redirects_and_disables_buttons() {
        // Arrange
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        dev.button_map.set(1, 3).unwrap();
        dev.button_map.set(2, 0).unwrap();
        dev.buttons_only = true;
        activate(&mut dev, ToolType::Stylus);

        // Act
        let pressed = RawSample { buttons: 0b11, ..sample(ToolType::Stylus, true, 110, 110) };
        let events = run(&mut dev, pressed);

        // Assert
        assert_eq!(
            events,
            vec![InputEvent::Button { device: dev.id(), button: 3, pressed: true }]
        );
    }

    // ── Leaving proximity ─────────────────────────────────────────────────────

    #[test]
    fn test_leaving_releases_buttons_before_proximity_out() {
        // Arrange
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        activate(&mut dev, ToolType::Stylus);
        run(&mut dev, RawSample { buttons: 0b101, ..sample(ToolType::Stylus, true, 120, 120) });

        // Act
        let events = run(&mut dev, sample(ToolType::Stylus, false, 0, 0));

        // Assert
        let id = dev.id();
        assert_eq!(
            events,
            vec![
                InputEvent::Button { device: id, button: 1, pressed: false },
                InputEvent::Button { device: id, button: 3, pressed: false },
                InputEvent::ProximityOut { device: id },
            ]
        );
        assert_eq!(dev.state(), ProximityState::Out);
        assert_eq!(dev.previous().buttons, 0);
    }

    #[test]
    fn test_leaving_from_armed_emits_no_proximity_out() {
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        run(&mut dev, sample(ToolType::Stylus, true, 100, 100));
        let events = run(&mut dev, sample(ToolType::Stylus, false, 0, 0));
        assert!(events.is_empty());
        assert_eq!(dev.state(), ProximityState::Out);
    }

    #[test]
    fn test_pad_macro_button_out_of_proximity_sends_key_pair() {
        // Arrange: pads report macro buttons with pressure as the macro index
        let mut dev = device(ToolType::Pad, Mode::Relative);
        let macro_sample = RawSample {
            buttons: 0b1,
            z: 10,
            ..sample(ToolType::Pad, false, 0, 0)
        };

        // Act
        let events = run(&mut dev, macro_sample);

        // Assert: keycode = 10 / 2 + 7
        let id = dev.id();
        assert_eq!(
            events,
            vec![
                InputEvent::Key { device: id, keycode: 12, pressed: true },
                InputEvent::Key { device: id, keycode: 12, pressed: false },
            ]
        );
    }

    #[test]
    fn test_core_pointer_still_leaves_proximity() {
        // Arrange
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        dev.core_pointer = true;
        activate(&mut dev, ToolType::Stylus);

        // Act
        let events = run(&mut dev, sample(ToolType::Stylus, false, 0, 0));

        // Assert: every proximity-in is matched by a proximity-out
        assert_eq!(events, vec![InputEvent::ProximityOut { device: dev.id() }]);
    }

    #[test]
    fn test_core_pointer_never_sends_macro_keys() {
        let mut dev = device(ToolType::Pad, Mode::Relative);
        dev.core_pointer = true;
        let macro_sample = RawSample { buttons: 0b1, z: 10, ..sample(ToolType::Pad, false, 0, 0) };
        assert!(run(&mut dev, macro_sample).is_empty());
    }

    // ── Snapshot ──────────────────────────────────────────────────────────────

    #[test]
    fn test_snapshot_keeps_raw_coordinates() {
        let mut dev = device(ToolType::Stylus, Mode::Absolute);
        dev.set_area(MappedArea::new(100, 100, 500, 500)).unwrap();
        run(&mut dev, sample(ToolType::Stylus, true, 900, 50));
        assert_eq!((dev.previous().x, dev.previous().y), (900, 50));
        assert!(dev.previous().proximity);
    }

    // ── Wheel and strips ──────────────────────────────────────────────────────

    #[test]
    fn test_cursor_wheel_tick_clicks_scroll_button() {
        let mut dev = device(ToolType::Cursor, Mode::Relative);
        dev.buttons_only = true;
        activate(&mut dev, ToolType::Cursor);
        let scrolled = RawSample { wheel: 1, ..sample(ToolType::Cursor, true, 110, 110) };
        let events = run(&mut dev, scrolled);
        let id = dev.id();
        assert_eq!(
            events,
            vec![
                InputEvent::Button { device: id, button: 5, pressed: true },
                InputEvent::Button { device: id, button: 5, pressed: false },
            ]
        );
    }

    #[test]
    fn test_pad_strip_ticks_only_while_touched() {
        // Arrange
        let mut dev = device(ToolType::Pad, Mode::Relative);
        dev.buttons_only = true;
        activate(&mut dev, ToolType::Pad);
        run(&mut dev, RawSample { strip_x: 4, ..sample(ToolType::Pad, true, 110, 110) });

        // Act: finger slides down the left strip, then lifts
        let slid = run(&mut dev, RawSample { strip_x: 8, ..sample(ToolType::Pad, true, 110, 110) });
        let lifted = run(&mut dev, sample(ToolType::Pad, true, 110, 110));

        // Assert
        assert_eq!(
            slid,
            vec![
                InputEvent::Button { device: dev.id(), button: 5, pressed: true },
                InputEvent::Button { device: dev.id(), button: 5, pressed: false },
            ]
        );
        assert!(lifted.is_empty());
    }
}
