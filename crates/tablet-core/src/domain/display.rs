//! Display layout and the tablet-to-screen mapper.
//!
//! The host reports an ordered list of screens.  A logical device either pins
//! itself to one of them, or (in absolute mode with a horizontal layout)
//! divides its mapped area into equal vertical strips, one per screen, so the
//! pen's position on the tablet selects the screen.
//!
//! Only horizontal tiling is modeled.  A vertical layout is rejected when the
//! layout is built, so the mapper never has to guess at one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::device::LogicalDevice;
use super::tool::Mode;

/// How multiple screens are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Each device maps to its current (or first) screen.
    #[default]
    None,
    /// Screens sit side by side, left to right.
    Horizontal,
    /// Screens stacked top to bottom.  Not supported by the mapper.
    Vertical,
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutKind::None => "none",
            LayoutKind::Horizontal => "horizontal",
            LayoutKind::Vertical => "vertical",
        })
    }
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(LayoutKind::None),
            "horizontal" | "horz" => Ok(LayoutKind::Horizontal),
            "vertical" | "vert" => Ok(LayoutKind::Vertical),
            _ => Err(format!("invalid layout '{s}': use none, horizontal or vertical")),
        }
    }
}

/// Errors that can occur when configuring the display layout.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    /// The layout kind cannot be mapped onto.
    #[error("unsupported screen layout: {0} (only horizontal tiling is supported)")]
    UnsupportedLayout(LayoutKind),

    /// The layout lists no screens.
    #[error("display layout must contain at least one screen")]
    NoScreens,

    /// A screen index beyond the end of the layout.
    #[error("screen {index} out of range: layout has {count} screen(s)")]
    ScreenOutOfRange { index: i32, count: usize },

    /// A screen with zero width or height.
    #[error("screen {index} has zero width or height")]
    EmptyScreen { index: usize },
}

/// Size of one screen in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
}

impl ScreenGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The ordered screens of the host display and how they are arranged.
///
/// Always holds at least one screen and never a vertical layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLayout {
    kind: LayoutKind,
    screens: Vec<ScreenGeometry>,
}

impl DisplayLayout {
    /// Builds a layout.
    ///
    /// # Errors
    ///
    /// - [`LayoutError::UnsupportedLayout`] for [`LayoutKind::Vertical`].
    /// - [`LayoutError::NoScreens`] if `screens` is empty.
    /// - [`LayoutError::EmptyScreen`] if any screen has a zero dimension.
    pub fn new(kind: LayoutKind, screens: Vec<ScreenGeometry>) -> Result<Self, LayoutError> {
        check_kind(kind)?;
        if screens.is_empty() {
            return Err(LayoutError::NoScreens);
        }
        if let Some(index) = screens.iter().position(|s| s.width == 0 || s.height == 0) {
            return Err(LayoutError::EmptyScreen { index });
        }
        Ok(Self { kind, screens })
    }

    /// A layout with one screen of the given size.
    pub fn single(width: u32, height: u32) -> Result<Self, LayoutError> {
        Self::new(LayoutKind::None, vec![ScreenGeometry::new(width, height)])
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    /// Switches the layout kind; the screens are unchanged.
    pub fn set_kind(&mut self, kind: LayoutKind) -> Result<(), LayoutError> {
        check_kind(kind)?;
        self.kind = kind;
        Ok(())
    }

    pub fn screens(&self) -> &[ScreenGeometry] {
        &self.screens
    }

    pub fn screen(&self, index: usize) -> Option<&ScreenGeometry> {
        self.screens.get(index)
    }

    /// Number of screens (always at least one).
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    /// Always `false`; a layout cannot be built without screens.
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Validates a screen index for pinning.  `-1` (unpinned) is always valid.
    pub fn check_screen_no(&self, index: i32) -> Result<(), LayoutError> {
        if index < -1 || index >= self.screens.len() as i32 {
            return Err(LayoutError::ScreenOutOfRange {
                index,
                count: self.screens.len(),
            });
        }
        Ok(())
    }
}

fn check_kind(kind: LayoutKind) -> Result<(), LayoutError> {
    if kind == LayoutKind::Vertical {
        return Err(LayoutError::UnsupportedLayout(kind));
    }
    Ok(())
}

/// Where a reduced coordinate lands on the host display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenTarget {
    /// Index into [`DisplayLayout::screens`].
    pub screen: usize,
    /// Pixel column on that screen.
    pub x: i32,
    /// Pixel row on that screen.
    pub y: i32,
}

/// Maps reduced tablet coordinates onto a screen.
///
/// # How the mapping works (for beginners)
///
/// The synthesizer first *reduces* a tablet coordinate: it clamps it into the
/// device's mapped area and subtracts the area's top-left corner, so `rx`
/// runs from `0` to the area width.  The mapper then picks a screen and
/// multiplies by a scale factor:
///
/// ```text
///   mapped width 2000, two 1920-px screens side by side
///
///   rx:   0 ──────────── 1000 ──────────── 2000
///         │   screen 0     │    screen 1     │
///   px:   0 ──────────── 1920 / 0 ──────── 1920
///
///   rx = 1800  →  segment 1, rx - 1000 = 800, 800 × 1.92 = 1536
/// ```
///
/// The chosen screen and factors are stored on the device, so later relative
/// motion keeps using the same screen.
pub struct ScreenMapper;

impl ScreenMapper {
    /// Picks the target screen for `device` and scales (`rx`, `ry`) onto it.
    pub fn map(device: &mut LogicalDevice, rx: i32, ry: i32, layout: &DisplayLayout) -> ScreenTarget {
        let area = device.area();
        let width = area.width().max(1) as f64;
        let height = area.height().max(1) as f64;
        let count = layout.len();
        let mut rx = rx;

        let (target, factor_x) = match usize::try_from(device.pinned_screen())
            .ok()
            .filter(|&p| p < count)
        {
            Some(pinned) => (pinned, screen_width(layout, pinned) / width),
            None => {
                let mut target = current_or_first(device, count);
                if device.mode == Mode::Absolute
                    && layout.kind() == LayoutKind::Horizontal
                    && count > 1
                {
                    let total = area.width().max(1) as i64;
                    let n = count as i64;
                    for i in 0..n {
                        if (rx as i64) <= total * (i + 1) / n {
                            rx -= (total * i / n) as i32;
                            target = i as usize;
                            break;
                        }
                    }
                    (target, screen_width(layout, target) * count as f64 / width)
                } else {
                    (target, screen_width(layout, target) / width)
                }
            }
        };
        let factor_y = layout.screen(target).map_or(0.0, |s| s.height as f64) / height;

        device.factor_x = factor_x;
        device.factor_y = factor_y;
        device.current_screen = target as i32;

        ScreenTarget {
            screen: target,
            x: (rx as f64 * factor_x).round() as i32,
            y: (ry as f64 * factor_y).round() as i32,
        }
    }
}

fn screen_width(layout: &DisplayLayout, index: usize) -> f64 {
    layout.screen(index).map_or(0.0, |s| s.width as f64)
}

fn current_or_first(device: &LogicalDevice, count: usize) -> usize {
    usize::try_from(device.current_screen())
        .ok()
        .filter(|&c| c < count)
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::DeviceConfig;
    use crate::domain::tool::{MappedArea, ToolType};

    fn device(area: MappedArea, mode: Mode) -> LogicalDevice {
        let mut cfg = DeviceConfig::new("stylus", ToolType::Stylus, 10_000, 10_000);
        cfg.area = area;
        cfg.mode = mode;
        LogicalDevice::new(cfg).expect("valid config")
    }

    fn two_screens() -> DisplayLayout {
        DisplayLayout::new(
            LayoutKind::Horizontal,
            vec![ScreenGeometry::new(1920, 1080), ScreenGeometry::new(1920, 1080)],
        )
        .unwrap()
    }

    // ── DisplayLayout ─────────────────────────────────────────────────────────

    #[test]
    fn test_layout_rejects_vertical_tiling() {
        let result = DisplayLayout::new(LayoutKind::Vertical, vec![ScreenGeometry::new(800, 600)]);
        assert_eq!(result, Err(LayoutError::UnsupportedLayout(LayoutKind::Vertical)));
    }

    #[test]
    fn test_layout_rejects_empty_screen_list() {
        assert_eq!(DisplayLayout::new(LayoutKind::None, vec![]), Err(LayoutError::NoScreens));
    }

    #[test]
    fn test_layout_rejects_zero_sized_screen() {
        let result = DisplayLayout::new(
            LayoutKind::Horizontal,
            vec![ScreenGeometry::new(800, 600), ScreenGeometry::new(0, 600)],
        );
        assert_eq!(result, Err(LayoutError::EmptyScreen { index: 1 }));
    }

    #[test]
    fn test_set_kind_to_vertical_leaves_layout_unchanged() {
        let mut layout = two_screens();
        assert!(layout.set_kind(LayoutKind::Vertical).is_err());
        assert_eq!(layout.kind(), LayoutKind::Horizontal);
    }

    #[test]
    fn test_check_screen_no_accepts_unpinned_and_valid_indices() {
        let layout = two_screens();
        assert!(layout.check_screen_no(-1).is_ok());
        assert!(layout.check_screen_no(1).is_ok());
        assert_eq!(
            layout.check_screen_no(2),
            Err(LayoutError::ScreenOutOfRange { index: 2, count: 2 })
        );
    }

    #[test]
    fn test_layout_kind_parses_short_names() {
        assert_eq!("horz".parse::<LayoutKind>(), Ok(LayoutKind::Horizontal));
        assert_eq!("None".parse::<LayoutKind>(), Ok(LayoutKind::None));
    }

    // ── ScreenMapper ──────────────────────────────────────────────────────────

    #[test]
    fn test_horizontal_tiling_selects_second_screen() {
        // Arrange
        let mut dev = device(MappedArea::new(0, 0, 2000, 1000), Mode::Absolute);
        let layout = two_screens();

        // Act
        let target = ScreenMapper::map(&mut dev, 1800, 500, &layout);

        // Assert
        assert_eq!(target.screen, 1);
        assert_eq!(target.x, 1536);
        assert_eq!(target.y, 540);
        assert_eq!(dev.current_screen(), 1);
    }

    #[test]
    fn test_horizontal_tiling_boundary_belongs_to_first_screen() {
        let mut dev = device(MappedArea::new(0, 0, 2000, 1000), Mode::Absolute);
        let target = ScreenMapper::map(&mut dev, 1000, 0, &two_screens());
        assert_eq!(target.screen, 0);
        assert_eq!(target.x, 1920);
    }

    #[test]
    fn test_pinned_screen_scales_whole_area_onto_it() {
        // Arrange
        let mut dev = device(MappedArea::new(0, 0, 2000, 1000), Mode::Absolute);
        dev.set_pinned_screen(1);

        // Act
        let target = ScreenMapper::map(&mut dev, 1000, 1000, &two_screens());

        // Assert
        assert_eq!(target.screen, 1);
        assert_eq!(target.x, 960);
        assert_eq!(target.y, 1080);
        let (fx, fy) = dev.factors();
        assert!((fx - 0.96).abs() < 1e-9);
        assert!((fy - 1.08).abs() < 1e-9);
    }

    #[test]
    fn test_pinned_screen_beyond_layout_falls_back_to_layout_mapping() {
        let mut dev = device(MappedArea::new(0, 0, 2000, 1000), Mode::Absolute);
        dev.set_pinned_screen(5);
        let target = ScreenMapper::map(&mut dev, 1800, 0, &two_screens());
        assert_eq!(target.screen, 1);
    }

    #[test]
    fn test_relative_mode_stays_on_current_screen() {
        // Arrange: relative devices never pick a screen from the position
        let mut dev = device(MappedArea::new(0, 0, 2000, 1000), Mode::Relative);
        let layout = two_screens();

        // Act
        let target = ScreenMapper::map(&mut dev, 1800, 0, &layout);

        // Assert
        assert_eq!(target.screen, 0);
        assert_eq!(dev.current_screen(), 0);
    }

    #[test]
    fn test_no_layout_uses_first_screen_for_whole_area() {
        let mut dev = device(MappedArea::new(0, 0, 1000, 1000), Mode::Absolute);
        let layout = DisplayLayout::single(1000, 500).unwrap();
        let target = ScreenMapper::map(&mut dev, 1000, 1000, &layout);
        assert_eq!(target, ScreenTarget { screen: 0, x: 1000, y: 500 });
    }
}
