//! Recording input sink for tests.
//!
//! # Why a recording sink?
//!
//! A real host adapter moves the pointer on the machine running the tests,
//! and nothing it does can be observed from Rust code.  `RecordingSink`
//! rebuilds each delivered call as an [`InputEvent`] and pushes it into a
//! `Mutex<Vec<...>>`, so assertions can check exactly what reached the host
//! and in what order.
//!
//! # `should_fail` flag
//!
//! Set `should_fail = true` to make every method return
//! [`SinkError::Rejected`], which exercises the error paths of callers.

use std::sync::Mutex;

use tablet_core::{DeviceId, InputEvent};

use crate::application::process_samples::{InputSink, SinkError, Valuators};

/// An input sink that records every event instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Every delivered event, in delivery order.
    pub recorded: Mutex<Vec<InputEvent>>,
    /// When `true`, every method fails without recording.
    pub should_fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<InputEvent> {
        self.recorded
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn record(&self, event: InputEvent) -> Result<(), SinkError> {
        if self.should_fail {
            return Err(SinkError::Rejected("mock failure".into()));
        }
        self.recorded
            .lock()
            .map_err(|_| SinkError::Unavailable)?
            .push(event);
        Ok(())
    }
}

impl InputSink for RecordingSink {
    fn proximity_in(&self, device: DeviceId, screen: usize) -> Result<(), SinkError> {
        self.record(InputEvent::ProximityIn { device, screen })
    }

    fn proximity_out(&self, device: DeviceId) -> Result<(), SinkError> {
        self.record(InputEvent::ProximityOut { device })
    }

    fn motion(
        &self,
        device: DeviceId,
        absolute: bool,
        screen: usize,
        v: Valuators,
    ) -> Result<(), SinkError> {
        self.record(InputEvent::Motion {
            device,
            absolute,
            x: v.x,
            y: v.y,
            z: v.z,
            tilt_x: v.tilt_x,
            tilt_y: v.tilt_y,
            wheel: v.wheel,
            screen,
        })
    }

    fn button(&self, device: DeviceId, button: u16, pressed: bool) -> Result<(), SinkError> {
        self.record(InputEvent::Button {
            device,
            button,
            pressed,
        })
    }

    fn key(&self, device: DeviceId, keycode: u32, pressed: bool) -> Result<(), SinkError> {
        self.record(InputEvent::Key {
            device,
            keycode,
            pressed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_recording_sink_keeps_delivery_order() {
        // Arrange
        let sink = RecordingSink::new();
        let id = Uuid::new_v4();

        // Act
        sink.proximity_in(id, 1).unwrap();
        sink.button(id, 1, true).unwrap();
        sink.proximity_out(id).unwrap();

        // Assert
        assert_eq!(
            sink.events(),
            vec![
                InputEvent::ProximityIn { device: id, screen: 1 },
                InputEvent::Button { device: id, button: 1, pressed: true },
                InputEvent::ProximityOut { device: id },
            ]
        );
    }

    #[test]
    fn test_should_fail_rejects_without_recording() {
        let sink = RecordingSink {
            should_fail: true,
            ..RecordingSink::default()
        };
        assert!(sink.key(Uuid::new_v4(), 8, true).is_err());
        assert!(sink.events().is_empty());
    }
}
