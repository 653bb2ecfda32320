//! Typed events delivered to the host input subsystem.

use crate::domain::tool::DeviceId;

/// One emission of the event synthesizer.
///
/// Numeric ranges are tablet specific: in absolute mode `x`/`y` are pixels on
/// `screen`, in relative mode they are movement deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The tool entered proximity of the device.
    ProximityIn { device: DeviceId, screen: usize },

    /// The tool left proximity of the device.
    ProximityOut { device: DeviceId },

    /// Pointer motion with the remaining valuators.
    Motion {
        device: DeviceId,
        absolute: bool,
        x: i32,
        y: i32,
        z: i32,
        tilt_x: i32,
        tilt_y: i32,
        wheel: i32,
        screen: usize,
    },

    /// A button press or release.  `button` is the host button after mapping.
    Button {
        device: DeviceId,
        button: u16,
        pressed: bool,
    },

    /// A synthesized key event (macro buttons).
    Key {
        device: DeviceId,
        keycode: u32,
        pressed: bool,
    },
}

impl InputEvent {
    /// The logical device that emitted the event.
    pub fn device(&self) -> DeviceId {
        match *self {
            InputEvent::ProximityIn { device, .. }
            | InputEvent::ProximityOut { device }
            | InputEvent::Motion { device, .. }
            | InputEvent::Button { device, .. }
            | InputEvent::Key { device, .. } => device,
        }
    }
}
