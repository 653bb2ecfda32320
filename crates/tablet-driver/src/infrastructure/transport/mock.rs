//! Scripted transport for tests.
//!
//! Plays back a fixed list of states without touching any device, then
//! either ends the stream or, with `should_fail`, reports a read error the
//! way an unplugged tablet would.

use std::collections::VecDeque;
use std::io;

use tablet_core::{ToolState, ToolType};

use super::{DeviceClassDescriptor, ProtocolKind, Transport, TransportError};

/// A transport that returns pre-recorded states.
pub struct ScriptedTransport {
    states: VecDeque<ToolState>,
    descriptor: DeviceClassDescriptor,
    /// When `true`, a read after the last state fails instead of ending the
    /// stream.
    pub should_fail: bool,
}

impl ScriptedTransport {
    /// A USB tablet reporting every tool role on a 1000 × 1000 surface.
    pub fn new(states: impl IntoIterator<Item = ToolState>) -> Self {
        Self::with_descriptor(
            states,
            DeviceClassDescriptor {
                protocol: ProtocolKind::Usb,
                tools: ToolType::ALL.to_vec(),
                max_x: 1000,
                max_y: 1000,
                max_z: 1023,
                max_tilt: 63,
                tilt_supported: true,
            },
        )
    }

    pub fn with_descriptor(
        states: impl IntoIterator<Item = ToolState>,
        descriptor: DeviceClassDescriptor,
    ) -> Self {
        Self {
            states: states.into_iter().collect(),
            descriptor,
            should_fail: false,
        }
    }

    /// States not read yet.
    pub fn remaining(&self) -> usize {
        self.states.len()
    }
}

impl Transport for ScriptedTransport {
    fn read_state(&mut self) -> Result<Option<ToolState>, TransportError> {
        match self.states.pop_front() {
            Some(state) => Ok(Some(state)),
            None if self.should_fail => Err(TransportError::Read(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
            None => Ok(None),
        }
    }

    fn descriptor(&self) -> &DeviceClassDescriptor {
        &self.descriptor
    }
}
