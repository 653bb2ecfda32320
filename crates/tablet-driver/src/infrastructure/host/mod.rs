//! Host input adapters.
//!
//! The driver binary delivers events to [`LogSink`], which writes one
//! structured `tracing` record per event.  Motion is logged at `debug` level
//! because it arrives for nearly every report; everything else is `info`.

pub mod mock;

use tablet_core::DeviceId;
use tracing::{debug, info};

use crate::application::process_samples::{InputSink, SinkError, Valuators};

/// Reports every event through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl InputSink for LogSink {
    fn proximity_in(&self, device: DeviceId, screen: usize) -> Result<(), SinkError> {
        info!(%device, screen, "proximity in");
        Ok(())
    }

    fn proximity_out(&self, device: DeviceId) -> Result<(), SinkError> {
        info!(%device, "proximity out");
        Ok(())
    }

    fn motion(
        &self,
        device: DeviceId,
        absolute: bool,
        screen: usize,
        v: Valuators,
    ) -> Result<(), SinkError> {
        debug!(
            %device,
            absolute,
            screen,
            x = v.x,
            y = v.y,
            z = v.z,
            tilt_x = v.tilt_x,
            tilt_y = v.tilt_y,
            wheel = v.wheel,
            "motion"
        );
        Ok(())
    }

    fn button(&self, device: DeviceId, button: u16, pressed: bool) -> Result<(), SinkError> {
        info!(%device, button, pressed, "button");
        Ok(())
    }

    fn key(&self, device: DeviceId, keycode: u32, pressed: bool) -> Result<(), SinkError> {
        info!(%device, keycode, pressed, "key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_log_sink_accepts_every_event_kind() {
        let sink = LogSink::new();
        let id = Uuid::new_v4();
        assert!(sink.proximity_in(id, 0).is_ok());
        assert!(sink.motion(id, true, 0, Valuators::default()).is_ok());
        assert!(sink.button(id, 1, true).is_ok());
        assert!(sink.key(id, 8, false).is_ok());
        assert!(sink.proximity_out(id).is_ok());
    }
}
