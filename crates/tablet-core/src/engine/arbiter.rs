//! Chooses which logical device of a link receives a sample.
//!
//! # Rules (for beginners)
//!
//! One physical pen can be mapped to several logical devices, each owning a
//! different rectangle of the tablet.  For every sample:
//!
//! 1. The first device (in link order) of the sample's tool role whose serial
//!    filter accepts the tool and whose rectangle contains the position is the
//!    *primary*.
//! 2. Other matching devices that still think the tool is near them are
//!    forced out of proximity, so the pen is never in two places at once.
//!    When there is no primary, the first of them keeps the tool instead
//!    (the pen just left every rectangle but is still being tracked).
//! 3. The winner runs the sample through its state machine.
//!
//! Rectangle containment beats "currently active"; link order breaks ties.

use tracing::debug;

use crate::domain::display::DisplayLayout;
use crate::domain::registry::SharedLink;
use crate::domain::tool::{DeviceId, ProximityState, RawSample};

use super::events::InputEvent;
use super::synthesizer::{EventSynthesizer, StepContext};

/// Routes samples to logical devices.
pub struct DeviceArbiter;

impl DeviceArbiter {
    /// Dispatches `sample` to the devices of `link`, appending events to
    /// `events`.  Returns the device that received the sample.
    pub fn dispatch(
        link: &mut SharedLink,
        sample: RawSample,
        layout: &DisplayLayout,
        events: &mut Vec<InputEvent>,
    ) -> Option<DeviceId> {
        let ctx = StepContext {
            layout,
            tilt_supported: link.capabilities.tilt_supported,
            macro_keys: link.settings.macro_keys,
        };
        let devices = &mut link.devices;

        let eligible = |i: usize| {
            let d = &devices[i];
            d.tool() == sample.tool && d.accepts_serial(sample.serial)
        };
        let primary = (0..devices.len()).find(|&i| eligible(i) && devices[i].area().contains(sample.x, sample.y));

        let tracking: Vec<usize> = (0..devices.len())
            .filter(|&i| Some(i) != primary && eligible(i) && devices[i].state() != ProximityState::Out)
            .collect();

        let target = match primary {
            Some(p) => {
                let out = RawSample::out_of_proximity(sample.tool, sample.serial);
                for i in tracking {
                    debug!(device = %devices[i].name, "forcing proximity out");
                    EventSynthesizer::step(&mut devices[i], &out, &ctx, events);
                }
                p
            }
            None => match tracking.first() {
                Some(&fallback) => fallback,
                None => {
                    debug!(
                        path = %link.path(),
                        tool = %sample.tool,
                        serial = sample.serial,
                        x = sample.x,
                        y = sample.y,
                        "no device matches"
                    );
                    return None;
                }
            },
        };

        let device = &mut devices[target];
        let mut sample = sample;
        if sample.tool.is_pen() {
            sample.z = device.press_curve.apply(sample.z, link.capabilities.max_z);
        }
        EventSynthesizer::step(device, &sample, &ctx, events);
        Some(device.id())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::{DeviceConfig, LogicalDevice};
    use crate::domain::filter::PressureCurve;
    use crate::domain::registry::{DeviceRegistry, LinkSettings, TabletCapabilities};
    use crate::domain::tool::{MappedArea, ToolType};

    const PATH: &str = "tablet";

    fn registry(areas: &[MappedArea]) -> (DeviceRegistry, Vec<DeviceId>) {
        let mut reg = DeviceRegistry::new();
        reg.add_link(
            PATH,
            TabletCapabilities::new(2000, 1000, 1000, true, vec![ToolType::Stylus]),
            LinkSettings::default(),
        );
        let ids = areas
            .iter()
            .enumerate()
            .map(|(i, area)| {
                let mut cfg = DeviceConfig::new(format!("stylus{i}"), ToolType::Stylus, 2000, 1000);
                cfg.area = *area;
                reg.add_device(PATH, LogicalDevice::new(cfg).unwrap()).unwrap()
            })
            .collect();
        (reg, ids)
    }

    fn pen(x: i32, y: i32) -> RawSample {
        RawSample {
            x,
            y,
            proximity: true,
            ..RawSample::out_of_proximity(ToolType::Stylus, 0)
        }
    }

    fn send(reg: &mut DeviceRegistry, sample: RawSample) -> (Option<DeviceId>, Vec<InputEvent>) {
        let layout = DisplayLayout::single(1000, 1000).unwrap();
        let mut events = Vec::new();
        let link = reg.link_mut(PATH).unwrap();
        let target = DeviceArbiter::dispatch(link, sample, &layout, &mut events);
        (target, events)
    }

    #[test]
    fn test_overlapping_areas_route_to_first_device() {
        let (mut reg, ids) = registry(&[MappedArea::new(0, 0, 1500, 1000), MappedArea::new(500, 0, 2000, 1000)]);
        let (target, _) = send(&mut reg, pen(1000, 500));
        assert_eq!(target, Some(ids[0]));
    }

    #[test]
    fn test_sample_outside_every_area_without_tracking_is_dropped() {
        let (mut reg, _) = registry(&[MappedArea::new(0, 0, 500, 500)]);
        let (target, events) = send(&mut reg, pen(900, 900));
        assert_eq!(target, None);
        assert!(events.is_empty());
    }

    #[test]
    fn test_tracked_tool_leaving_every_area_falls_back_to_previous_device() {
        // Arrange
        let (mut reg, ids) = registry(&[MappedArea::new(0, 0, 1000, 1000)]);
        send(&mut reg, pen(100, 100));
        send(&mut reg, pen(200, 200));

        // Act: x = 1500 is outside the only area
        let (target, events) = send(&mut reg, pen(1500, 200));

        // Assert: motion is clamped to the right edge of the area
        assert_eq!(target, Some(ids[0]));
        assert!(matches!(events[0], InputEvent::Motion { x: 1000, .. }));
    }

    #[test]
    fn test_crossing_into_another_area_forces_previous_device_out() {
        // Arrange: two side-by-side areas, pen active in the left one
        let (mut reg, ids) = registry(&[MappedArea::new(0, 0, 999, 1000), MappedArea::new(1000, 0, 2000, 1000)]);
        send(&mut reg, pen(100, 100));
        send(&mut reg, pen(200, 200));

        // Act
        let (target, events) = send(&mut reg, pen(1500, 200));

        // Assert: left device leaves, right device only arms
        assert_eq!(target, Some(ids[1]));
        assert_eq!(events, vec![InputEvent::ProximityOut { device: ids[0] }]);
        let link = reg.link(PATH).unwrap();
        assert_eq!(link.devices()[0].state(), ProximityState::Out);
        assert_eq!(link.devices()[1].state(), ProximityState::Armed);
    }

    #[test]
    fn test_serial_filter_excludes_other_tools() {
        // Arrange
        let (mut reg, ids) = registry(&[MappedArea::new(0, 0, 2000, 1000)]);
        reg.device_mut(ids[0]).unwrap().serial = 0x42;

        // Act
        let (target, _) = send(&mut reg, RawSample { serial: 0x7, ..pen(10, 10) });

        // Assert
        assert_eq!(target, None);
    }

    #[test]
    fn test_pressure_curve_of_target_is_applied() {
        // Arrange
        let (mut reg, ids) = registry(&[MappedArea::new(0, 0, 2000, 1000)]);
        reg.device_mut(ids[0]).unwrap().press_curve = PressureCurve::new([0, 75, 25, 100]).unwrap();
        send(&mut reg, pen(100, 100));

        // Act
        let (_, events) = send(&mut reg, RawSample { z: 500, ..pen(200, 100) });

        // Assert
        let z = events.iter().find_map(|e| match e {
            InputEvent::Motion { z, .. } => Some(*z),
            _ => None,
        });
        assert!(z.is_some_and(|z| z > 500), "curve should boost pressure, got {z:?}");
    }
}
