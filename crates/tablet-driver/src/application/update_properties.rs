//! UpdatePropertiesUseCase: reads and writes device settings by name while
//! the driver runs.
//!
//! Property names follow the tablet configuration tool (`TopX`, `Mode`,
//! `Button3`, `PressCurve`, …).  Values travel as strings in both directions.
//!
//! Some properties belong to the device itself (area, mode, buttons), some to
//! the link the device is attached to (`Suppress`, `RawSample`, `RawFilter`,
//! `Rotate`), and some to the whole display (`TwinView`, `NumScreen`).
//! Changing a link or display property through one device affects every
//! device that shares it.
//!
//! Properties are only changed between two samples: the caller holds the
//! same `&mut` borrow of the registry the event loop uses.

use std::str::FromStr;

use tablet_core::{
    DeviceError, DeviceId, DeviceRegistry, DisplayLayout, LayoutError, LayoutKind, MappedArea,
    Mode, PressureCurve, RegistryError, Rotation,
};
use thiserror::Error;
use tracing::info;

/// Largest window the raw averaging filter accepts.
pub const MAX_RAW_SAMPLE: usize = 20;

/// Largest suppression threshold accepted.
pub const MAX_SUPPRESS: i32 = 100;

/// Error type for property access.
#[derive(Debug, Error, PartialEq)]
pub enum PropertyError {
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("property '{0}' is read-only")]
    ReadOnly(String),

    #[error("property '{0}' is write-only")]
    WriteOnly(String),

    #[error("invalid value '{value}' for property '{name}'")]
    InvalidValue { name: String, value: String },

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// A named device property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    TopX,
    TopY,
    BottomX,
    BottomY,
    XyDefault,
    Mode,
    Suppress,
    RawSample,
    RawFilter,
    ScreenNo,
    TwinView,
    /// Physical button `1..=16`.
    Button(usize),
    Rotate,
    PressCurve,
    RelWUp,
    RelWDn,
    AbsWUp,
    AbsWDn,
    StripLUp,
    StripLDn,
    StripRUp,
    StripRDn,
    Speed,
    ToolId,
    ToolSerial,
    NumScreen,
}

impl Property {
    pub fn is_read_only(self) -> bool {
        matches!(self, Property::ToolId | Property::ToolSerial | Property::NumScreen)
    }

    pub fn is_write_only(self) -> bool {
        self == Property::XyDefault
    }
}

impl FromStr for Property {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let property = match s {
            "TopX" => Property::TopX,
            "TopY" => Property::TopY,
            "BottomX" => Property::BottomX,
            "BottomY" => Property::BottomY,
            "xyDefault" => Property::XyDefault,
            "Mode" => Property::Mode,
            "Suppress" => Property::Suppress,
            "RawSample" => Property::RawSample,
            "RawFilter" => Property::RawFilter,
            "Screen_No" => Property::ScreenNo,
            "TwinView" => Property::TwinView,
            "Rotate" => Property::Rotate,
            "PressCurve" => Property::PressCurve,
            "RelWUp" => Property::RelWUp,
            "RelWDn" => Property::RelWDn,
            "AbsWUp" => Property::AbsWUp,
            "AbsWDn" => Property::AbsWDn,
            "StripLUp" => Property::StripLUp,
            "StripLDn" => Property::StripLDn,
            "StripRUp" => Property::StripRUp,
            "StripRDn" => Property::StripRDn,
            "Speed" => Property::Speed,
            "ToolID" => Property::ToolId,
            "ToolSerial" => Property::ToolSerial,
            "NumScreen" => Property::NumScreen,
            _ => {
                return s
                    .strip_prefix("Button")
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| (1..=tablet_core::domain::device::MAX_BUTTONS).contains(n))
                    .map(Property::Button)
                    .ok_or_else(|| PropertyError::UnknownProperty(s.to_string()));
            }
        };
        Ok(property)
    }
}

/// Returns the current value of property `name` of device `id`.
///
/// # Errors
///
/// - [`PropertyError::UnknownProperty`] for a name not listed above.
/// - [`PropertyError::WriteOnly`] for `xyDefault`.
/// - [`PropertyError::Registry`] if `id` is unknown.
pub fn get_property(
    registry: &DeviceRegistry,
    layout: &DisplayLayout,
    id: DeviceId,
    name: &str,
) -> Result<String, PropertyError> {
    let property: Property = name.parse()?;
    let device = registry.device(id).ok_or(RegistryError::DeviceNotFound(id))?;
    let link = registry.link_of(id).ok_or(RegistryError::DeviceNotFound(id))?;
    let area = device.area();
    let wheel = &device.wheel_buttons;

    let value = match property {
        Property::TopX => area.top_x.to_string(),
        Property::TopY => area.top_y.to_string(),
        Property::BottomX => area.bottom_x.to_string(),
        Property::BottomY => area.bottom_y.to_string(),
        Property::XyDefault => return Err(PropertyError::WriteOnly(name.to_string())),
        Property::Mode => device.mode.to_string(),
        Property::Suppress => link.settings.suppress.to_string(),
        Property::RawSample => link.settings.raw_sample.to_string(),
        Property::RawFilter => on_off(link.settings.raw_filter).to_string(),
        Property::ScreenNo => device.pinned_screen().to_string(),
        Property::TwinView => layout.kind().to_string(),
        Property::Button(n) => device.button_map.get(n)?.to_string(),
        Property::Rotate => link.settings.rotation.to_string(),
        Property::PressCurve => {
            let [x0, y0, x1, y1] = device.press_curve.points();
            format!("{x0} {y0} {x1} {y1}")
        }
        Property::RelWUp => wheel.rel_up.to_string(),
        Property::RelWDn => wheel.rel_down.to_string(),
        Property::AbsWUp => wheel.abs_up.to_string(),
        Property::AbsWDn => wheel.abs_down.to_string(),
        Property::StripLUp => wheel.strip_left_up.to_string(),
        Property::StripLDn => wheel.strip_left_down.to_string(),
        Property::StripRUp => wheel.strip_right_up.to_string(),
        Property::StripRDn => wheel.strip_right_down.to_string(),
        Property::Speed => device.speed().to_string(),
        Property::ToolId => device.tool().to_string(),
        Property::ToolSerial => device.serial.to_string(),
        Property::NumScreen => layout.len().to_string(),
    };
    Ok(value)
}

/// Sets property `name` of device `id` to `value`.
///
/// Nothing is changed when an error is returned.
///
/// # Errors
///
/// - [`PropertyError::UnknownProperty`] for a name not listed above.
/// - [`PropertyError::ReadOnly`] for `ToolID`, `ToolSerial` and `NumScreen`.
/// - [`PropertyError::InvalidValue`] if `value` does not parse or is out of
///   range.
/// - [`PropertyError::Device`] / [`PropertyError::Layout`] if the device or
///   display rejects the new setting.
/// - [`PropertyError::Registry`] if `id` is unknown.
pub fn set_property(
    registry: &mut DeviceRegistry,
    layout: &mut DisplayLayout,
    id: DeviceId,
    name: &str,
    value: &str,
) -> Result<(), PropertyError> {
    let property: Property = name.parse()?;
    if property.is_read_only() {
        return Err(PropertyError::ReadOnly(name.to_string()));
    }
    let invalid = || PropertyError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    };

    // Link and display properties first; they need no device borrow.
    match property {
        Property::Suppress => {
            let suppress = parse_in(value, 0..=MAX_SUPPRESS).ok_or_else(invalid)?;
            link_settings(registry, id)?.suppress = suppress;
        }
        Property::RawSample => {
            let samples = parse_in(value, 1..=MAX_RAW_SAMPLE).ok_or_else(invalid)?;
            link_settings(registry, id)?.raw_sample = samples;
        }
        Property::RawFilter => {
            let enabled = parse_on_off(value).ok_or_else(invalid)?;
            link_settings(registry, id)?.raw_filter = enabled;
        }
        Property::Rotate => {
            let rotation: Rotation = value.parse().map_err(|_| invalid())?;
            link_settings(registry, id)?.rotation = rotation;
        }
        Property::TwinView => {
            let kind: LayoutKind = value.parse().map_err(|_| invalid())?;
            layout.set_kind(kind)?;
        }
        Property::XyDefault => {
            let full = registry
                .link_of(id)
                .map(|l| l.capabilities.full_area())
                .ok_or(RegistryError::DeviceNotFound(id))?;
            device_mut(registry, id)?.set_area(full)?;
        }
        _ => set_device_property(registry, layout, id, property, value).map_err(|e| match e {
            PropertyError::InvalidValue { .. } => invalid(),
            other => other,
        })?,
    }

    info!(device = %id, property = name, value, "property updated");
    Ok(())
}

fn set_device_property(
    registry: &mut DeviceRegistry,
    layout: &DisplayLayout,
    id: DeviceId,
    property: Property,
    value: &str,
) -> Result<(), PropertyError> {
    let invalid = || PropertyError::InvalidValue {
        name: String::new(),
        value: value.to_string(),
    };
    let device = device_mut(registry, id)?;
    let area = device.area();

    match property {
        Property::TopX | Property::TopY | Property::BottomX | Property::BottomY => {
            let v: i32 = value.trim().parse().map_err(|_| invalid())?;
            let area = match property {
                Property::TopX => MappedArea { top_x: v, ..area },
                Property::TopY => MappedArea { top_y: v, ..area },
                Property::BottomX => MappedArea { bottom_x: v, ..area },
                _ => MappedArea { bottom_y: v, ..area },
            };
            device.set_area(area)?;
        }
        Property::Mode => {
            device.mode = value.parse::<Mode>().map_err(|_| invalid())?;
        }
        Property::ScreenNo => {
            let screen: i32 = value.trim().parse().map_err(|_| invalid())?;
            layout.check_screen_no(screen)?;
            device.set_pinned_screen(screen);
        }
        Property::Button(n) => {
            let target: u16 = value.trim().parse().map_err(|_| invalid())?;
            device.button_map.set(n, target)?;
        }
        Property::PressCurve => {
            let points = parse_curve(value).ok_or_else(invalid)?;
            device.press_curve =
                PressureCurve::new(points).ok_or(DeviceError::InvalidPressureCurve(points))?;
        }
        Property::Speed => {
            let speed: f64 = value.trim().parse().map_err(|_| invalid())?;
            device.set_speed(speed)?;
        }
        wheel_property => {
            let target: u16 = value.trim().parse().map_err(|_| invalid())?;
            let wheel = &mut device.wheel_buttons;
            let slot = match wheel_property {
                Property::RelWUp => &mut wheel.rel_up,
                Property::RelWDn => &mut wheel.rel_down,
                Property::AbsWUp => &mut wheel.abs_up,
                Property::AbsWDn => &mut wheel.abs_down,
                Property::StripLUp => &mut wheel.strip_left_up,
                Property::StripLDn => &mut wheel.strip_left_down,
                Property::StripRUp => &mut wheel.strip_right_up,
                Property::StripRDn => &mut wheel.strip_right_down,
                _ => return Err(invalid()),
            };
            *slot = target;
        }
    }
    Ok(())
}

fn device_mut(
    registry: &mut DeviceRegistry,
    id: DeviceId,
) -> Result<&mut tablet_core::LogicalDevice, RegistryError> {
    registry.device_mut(id).ok_or(RegistryError::DeviceNotFound(id))
}

fn link_settings(
    registry: &mut DeviceRegistry,
    id: DeviceId,
) -> Result<&mut tablet_core::LinkSettings, RegistryError> {
    registry
        .link_of_mut(id)
        .map(|l| &mut l.settings)
        .ok_or(RegistryError::DeviceNotFound(id))
}

fn parse_in<T>(value: &str, range: std::ops::RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    value.trim().parse().ok().filter(|v| range.contains(v))
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Parses four control points separated by whitespace or commas.
fn parse_curve(value: &str) -> Option<[i32; 4]> {
    let mut points = [0i32; 4];
    let mut parts = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty());
    for slot in &mut points {
        *slot = parts.next()?.parse().ok()?;
    }
    parts.next().is_none().then_some(points)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
