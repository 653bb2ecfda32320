//! Logical device entity.
//!
//! A [`LogicalDevice`] is one configured tool role (stylus, eraser, cursor,
//! touch, pad) with its own mapped area, mode, and running state.  Several
//! logical devices may share one physical link; the registry owns them and a
//! device holds no reference back to the registry.

use thiserror::Error;
use uuid::Uuid;

use super::filter::PressureCurve;
use super::tool::{DeviceId, MappedArea, Mode, ProximityState, RawSample, ToolType};

/// Relative-mode speed at which no acceleration is applied.
pub const DEFAULT_SPEED: f64 = 1.0;

/// Number of buttons a device can report.
pub const MAX_BUTTONS: usize = 16;

/// Errors raised when a device setting is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum DeviceError {
    /// The mapped area has zero or negative width or height.
    #[error("mapped area {0:?} is empty")]
    EmptyMappedArea(MappedArea),

    /// A pressure curve control point is outside `0..=100`.
    #[error("invalid pressure curve {0:?}: control points must be within 0..=100")]
    InvalidPressureCurve([i32; 4]),

    /// A button number outside `1..=16`.
    #[error("invalid button {0}: buttons are numbered 1..=16")]
    InvalidButton(usize),

    /// Relative speed must be a positive finite number.
    #[error("invalid speed {0}")]
    InvalidSpeed(f64),
}

/// Host button emitted for each physical button.
///
/// Physical button `n` (1-based) emits `map[n - 1]`.  A value of `0`
/// disables the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMap([u16; MAX_BUTTONS]);

impl Default for ButtonMap {
    fn default() -> Self {
        let mut map = [0u16; MAX_BUTTONS];
        for (i, slot) in map.iter_mut().enumerate() {
            *slot = i as u16 + 1;
        }
        Self(map)
    }
}

impl ButtonMap {
    /// Returns the host button for physical `button`, or `None` when disabled
    /// or out of range.
    pub fn resolve(&self, button: u16) -> Option<u16> {
        let idx = (button as usize).checked_sub(1)?;
        self.0.get(idx).copied().filter(|&b| b != 0)
    }

    /// Host button currently assigned to `button` (0 = disabled).
    pub fn get(&self, button: usize) -> Result<u16, DeviceError> {
        button
            .checked_sub(1)
            .and_then(|i| self.0.get(i).copied())
            .ok_or(DeviceError::InvalidButton(button))
    }

    pub fn set(&mut self, button: usize, target: u16) -> Result<(), DeviceError> {
        let slot = button
            .checked_sub(1)
            .and_then(|i| self.0.get_mut(i))
            .ok_or(DeviceError::InvalidButton(button))?;
        *slot = target;
        Ok(())
    }
}

/// Buttons clicked for wheel and touch-strip ticks.  `0` disables a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelButtons {
    pub rel_up: u16,
    pub rel_down: u16,
    pub abs_up: u16,
    pub abs_down: u16,
    pub strip_left_up: u16,
    pub strip_left_down: u16,
    pub strip_right_up: u16,
    pub strip_right_down: u16,
}

impl WheelButtons {
    /// Defaults for a tool role: scroll buttons 4/5 everywhere, absolute
    /// wheel ticks only on the pad.
    pub fn for_tool(tool: ToolType) -> Self {
        let pad = tool == ToolType::Pad;
        Self {
            rel_up: 5,
            rel_down: 4,
            abs_up: if pad { 4 } else { 0 },
            abs_down: if pad { 5 } else { 0 },
            strip_left_up: 4,
            strip_left_down: 5,
            strip_right_up: 4,
            strip_right_down: 5,
        }
    }
}

/// Static settings a logical device is created with.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub name: String,
    pub tool: ToolType,
    /// Tool serial to accept; `0` accepts any tool of this role.
    pub serial: u32,
    pub area: MappedArea,
    pub mode: Mode,
    pub speed: f64,
    /// Screen to pin to, or `-1` to follow the display layout.
    pub screen_no: i32,
    /// Report buttons only, never motion.
    pub buttons_only: bool,
    /// The device drives the core pointer directly; macro keys are not
    /// synthesized for it.
    pub core_pointer: bool,
    pub press_curve: PressureCurve,
    pub button_map: ButtonMap,
    pub wheel_buttons: WheelButtons,
}

impl DeviceConfig {
    /// Settings for a device covering the whole surface of a tablet reporting
    /// up to `max_x` × `max_y`, with the role's default mode.
    pub fn new(name: impl Into<String>, tool: ToolType, max_x: i32, max_y: i32) -> Self {
        Self {
            name: name.into(),
            tool,
            serial: 0,
            area: MappedArea::full(max_x, max_y),
            mode: tool.default_mode(),
            speed: DEFAULT_SPEED,
            screen_no: -1,
            buttons_only: false,
            core_pointer: false,
            press_curve: PressureCurve::default(),
            button_map: ButtonMap::default(),
            wheel_buttons: WheelButtons::for_tool(tool),
        }
    }
}

/// The previous sample as seen by one device.
///
/// Written exactly once per processed sample, at the end of the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleSnapshot {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub tilt_x: i32,
    pub tilt_y: i32,
    pub wheel: i32,
    pub strip_x: i32,
    pub strip_y: i32,
    pub buttons: u16,
    pub proximity: bool,
}

impl SampleSnapshot {
    /// Captures `sample` with `buttons` as the button state last reported to
    /// the host.
    pub fn capture(sample: &RawSample, buttons: u16) -> Self {
        Self {
            x: sample.x,
            y: sample.y,
            z: sample.z,
            tilt_x: sample.tilt_x,
            tilt_y: sample.tilt_y,
            wheel: sample.wheel,
            strip_x: sample.strip_x,
            strip_y: sample.strip_y,
            buttons,
            proximity: sample.proximity,
        }
    }
}

/// One configured tool role attached to a physical link.
#[derive(Debug, Clone)]
pub struct LogicalDevice {
    id: DeviceId,
    pub name: String,
    tool: ToolType,
    pub serial: u32,
    area: MappedArea,
    pub mode: Mode,
    speed: f64,
    jitter: f64,
    pub(crate) factor_x: f64,
    pub(crate) factor_y: f64,
    pinned_screen: i32,
    pub(crate) current_screen: i32,
    pub buttons_only: bool,
    pub core_pointer: bool,
    pub press_curve: PressureCurve,
    pub button_map: ButtonMap,
    pub wheel_buttons: WheelButtons,
    pub(crate) state: ProximityState,
    pub(crate) previous: SampleSnapshot,
    parent: Option<DeviceId>,
    group_parent: bool,
}

impl LogicalDevice {
    /// Creates a device with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::EmptyMappedArea`] or [`DeviceError::InvalidSpeed`]
    /// if the configuration cannot drive a pointer.
    pub fn new(config: DeviceConfig) -> Result<Self, DeviceError> {
        if config.area.is_empty() {
            return Err(DeviceError::EmptyMappedArea(config.area));
        }
        let mut device = Self {
            id: Uuid::new_v4(),
            name: config.name,
            tool: config.tool,
            serial: config.serial,
            area: config.area,
            mode: config.mode,
            speed: DEFAULT_SPEED,
            jitter: jitter_for(DEFAULT_SPEED),
            factor_x: 0.0,
            factor_y: 0.0,
            pinned_screen: config.screen_no.max(-1),
            current_screen: -1,
            buttons_only: config.buttons_only,
            core_pointer: config.core_pointer,
            press_curve: config.press_curve,
            button_map: config.button_map,
            wheel_buttons: config.wheel_buttons,
            state: ProximityState::Out,
            previous: SampleSnapshot::default(),
            parent: None,
            group_parent: false,
        };
        device.set_speed(config.speed)?;
        Ok(device)
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn tool(&self) -> ToolType {
        self.tool
    }

    pub fn area(&self) -> MappedArea {
        self.area
    }

    /// Replaces the mapped area.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::EmptyMappedArea`] and leaves the area unchanged
    /// if `area` covers no surface.
    pub fn set_area(&mut self, area: MappedArea) -> Result<(), DeviceError> {
        if area.is_empty() {
            return Err(DeviceError::EmptyMappedArea(area));
        }
        self.area = area;
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Sets the relative-mode speed and the jitter threshold derived from it.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), DeviceError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(DeviceError::InvalidSpeed(speed));
        }
        self.speed = speed;
        self.jitter = jitter_for(speed);
        Ok(())
    }

    /// Deltas at or below this magnitude are not accelerated.
    pub fn jitter_threshold(&self) -> f64 {
        self.jitter
    }

    /// Pinned screen index, or `-1` when following the layout.
    pub fn pinned_screen(&self) -> i32 {
        self.pinned_screen
    }

    pub fn set_pinned_screen(&mut self, screen: i32) {
        self.pinned_screen = screen.max(-1);
    }

    /// Screen the device last reported on, or `-1` before the first report.
    pub fn current_screen(&self) -> i32 {
        self.current_screen
    }

    /// Scale factors from reduced tablet units to screen pixels.
    pub fn factors(&self) -> (f64, f64) {
        (self.factor_x, self.factor_y)
    }

    pub fn state(&self) -> ProximityState {
        self.state
    }

    pub fn previous(&self) -> &SampleSnapshot {
        &self.previous
    }

    /// The group parent that spawned this device, if any.
    pub fn parent(&self) -> Option<DeviceId> {
        self.parent
    }

    pub fn is_group_parent(&self) -> bool {
        self.group_parent
    }

    pub(crate) fn mark_group_parent(&mut self) {
        self.group_parent = true;
    }

    pub(crate) fn set_parent(&mut self, parent: DeviceId) {
        self.parent = Some(parent);
    }

    /// Returns `true` if this device accepts samples from a tool with `serial`.
    pub fn accepts_serial(&self, serial: u32) -> bool {
        self.serial == 0 || self.serial == serial
    }
}

fn jitter_for(speed: f64) -> f64 {
    speed * 3.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
