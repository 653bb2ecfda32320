//! Tool roles, mapped areas, and the sample types of the pipeline.
//!
//! Two sample types exist on purpose:
//!
//! - [`ToolState`] is what the transport decodes from the wire.  It carries
//!   the cursor rotation used by the suppression filter and is compared
//!   against the previously reported state before anything else happens.
//! - [`RawSample`] is what the arbiter consumes.  It is built once per
//!   non-suppressed `ToolState`, after rotation and averaging, and is never
//!   retained.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a logical device, derived from UUID v4.
pub type DeviceId = Uuid;

/// The role of a physical tool on the tablet surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    Stylus,
    Eraser,
    Cursor,
    Touch,
    Pad,
}

impl ToolType {
    /// Every tool role, in the order the configuration documents them.
    pub const ALL: [ToolType; 5] = [
        ToolType::Stylus,
        ToolType::Eraser,
        ToolType::Cursor,
        ToolType::Touch,
        ToolType::Pad,
    ];

    /// Returns `true` for the two ends of a pen.
    pub fn is_pen(self) -> bool {
        matches!(self, ToolType::Stylus | ToolType::Eraser)
    }

    /// The mode a freshly configured device of this role starts in.
    ///
    /// Pen ends and touch map the tablet onto the screen; pucks and pads move
    /// the pointer relatively.
    pub fn default_mode(self) -> Mode {
        match self {
            ToolType::Stylus | ToolType::Eraser | ToolType::Touch => Mode::Absolute,
            ToolType::Cursor | ToolType::Pad => Mode::Relative,
        }
    }

    /// Lowercase name as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolType::Stylus => "stylus",
            ToolType::Eraser => "eraser",
            ToolType::Cursor => "cursor",
            ToolType::Touch => "touch",
            ToolType::Pad => "pad",
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("invalid tool type '{s}': must be one of stylus, eraser, cursor, touch, pad")
            })
    }
}

/// How tablet coordinates drive the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The mapped area is scaled onto the screen.
    Absolute,
    /// Movement deltas move the pointer, like a mouse.
    Relative,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("absolute") {
            Ok(Mode::Absolute)
        } else if s.eq_ignore_ascii_case("relative") {
            Ok(Mode::Relative)
        } else {
            Err(format!("invalid mode '{s}': use 'Absolute' or 'Relative'"))
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Absolute => f.write_str("Absolute"),
            Mode::Relative => f.write_str("Relative"),
        }
    }
}

/// Proximity state of a logical device.
///
/// ```text
///          prox=true               prox=true, sample differs
///   Out ─────────────► Armed ─────────────────────────────► Active
///    ▲                   │                                    │
///    └───── prox=false ──┴──────────── prox=false ────────────┘
/// ```
///
/// `Armed` means the tool was seen but its first coordinates are not trusted
/// yet; nothing is reported until a second, differing sample arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProximityState {
    #[default]
    Out,
    Armed,
    Active,
}

/// A rectangle of the tablet surface in tablet units.
///
/// Both edges are inclusive: a sample exactly on `bottom_x` is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedArea {
    pub top_x: i32,
    pub top_y: i32,
    pub bottom_x: i32,
    pub bottom_y: i32,
}

impl MappedArea {
    pub fn new(top_x: i32, top_y: i32, bottom_x: i32, bottom_y: i32) -> Self {
        Self {
            top_x,
            top_y,
            bottom_x,
            bottom_y,
        }
    }

    /// The whole tablet surface for a tablet reporting up to `max_x` × `max_y`.
    pub fn full(max_x: i32, max_y: i32) -> Self {
        Self::new(0, 0, max_x, max_y)
    }

    pub fn width(&self) -> i32 {
        self.bottom_x - self.top_x
    }

    pub fn height(&self) -> i32 {
        self.bottom_y - self.top_y
    }

    /// Returns `true` when the area covers no surface at all.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Returns `true` if (`x`, `y`) lies inside the area, edges included.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.top_x <= x && self.bottom_x >= x && self.top_y <= y && self.bottom_y >= y
    }

    /// Clamps `x` into the area and returns it relative to `top_x`.
    pub fn reduce_x(&self, x: i32) -> i32 {
        if x > self.bottom_x {
            self.bottom_x - self.top_x
        } else if x < self.top_x {
            0
        } else {
            x - self.top_x
        }
    }

    /// Clamps `y` into the area and returns it relative to `top_y`.
    pub fn reduce_y(&self, y: i32) -> i32 {
        if y > self.bottom_y {
            self.bottom_y - self.top_y
        } else if y < self.top_y {
            0
        } else {
            y - self.top_y
        }
    }
}

/// Tool state as decoded by the transport.
///
/// This is the value the suppression filter compares; `rotation` only exists
/// here (puck rotation in tenths of a degree, `0..1800`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolState {
    pub tool: Option<ToolType>,
    pub serial: u32,
    pub proximity: bool,
    pub x: i32,
    pub y: i32,
    pub pressure: i32,
    pub buttons: u16,
    pub tilt_x: i32,
    pub tilt_y: i32,
    pub rotation: i32,
    pub wheel: i32,
    pub strip_x: i32,
    pub strip_y: i32,
}

impl ToolState {
    /// Builds the arbiter-facing sample.  Returns `None` when the transport
    /// could not tell which tool the state belongs to.
    pub fn to_sample(&self) -> Option<RawSample> {
        let tool = self.tool?;
        Some(RawSample {
            tool,
            serial: self.serial,
            proximity: self.proximity,
            x: self.x,
            y: self.y,
            z: self.pressure,
            buttons: self.buttons,
            tilt_x: self.tilt_x,
            tilt_y: self.tilt_y,
            wheel: self.wheel,
            strip_x: self.strip_x,
            strip_y: self.strip_y,
        })
    }
}

/// One sample delivered to the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub tool: ToolType,
    pub serial: u32,
    pub proximity: bool,
    pub x: i32,
    pub y: i32,
    /// Pressure.
    pub z: i32,
    /// Bit `n - 1` set means button `n` is held.
    pub buttons: u16,
    pub tilt_x: i32,
    pub tilt_y: i32,
    pub wheel: i32,
    pub strip_x: i32,
    pub strip_y: i32,
}

impl RawSample {
    /// An all-zero, out-of-proximity sample for `tool`.
    ///
    /// The arbiter feeds this to a device that loses the tool to another
    /// mapped area, which forces that device out of proximity.
    pub fn out_of_proximity(tool: ToolType, serial: u32) -> Self {
        Self {
            tool,
            serial,
            proximity: false,
            x: 0,
            y: 0,
            z: 0,
            buttons: 0,
            tilt_x: 0,
            tilt_y: 0,
            wheel: 0,
            strip_x: 0,
            strip_y: 0,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
