//! Capture-file transport.
//!
//! A capture is a bincode stream: one [`CaptureHeader`] followed by any number
//! of [`ToolState`] frames.  Reaching the end of the file ends the stream; a
//! frame cut short by the end of the file is dropped.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tablet_core::ToolState;
use tracing::info;

use super::{detect_protocol, CaptureHeader, DeviceClassDescriptor, Transport, TransportError};

/// Replays a recorded tablet session.
pub struct CaptureTransport<R: Read + Send> {
    reader: R,
    descriptor: DeviceClassDescriptor,
    frames: u64,
}

impl CaptureTransport<BufReader<File>> {
    /// Opens the capture file at `path`.
    pub fn open(path: &Path) -> Result<Self, TransportError> {
        let file = File::open(path).map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let transport = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            protocol = ?transport.descriptor.protocol,
            "capture opened"
        );
        Ok(transport)
    }
}

impl<R: Read + Send> CaptureTransport<R> {
    /// Reads the header from `reader` and detects the tablet.
    pub fn from_reader(mut reader: R) -> Result<Self, TransportError> {
        let header: CaptureHeader = bincode::deserialize_from(&mut reader)?;
        let descriptor = detect_protocol(&header)?;
        Ok(Self {
            reader,
            descriptor,
            frames: 0,
        })
    }

    /// Number of frames read so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl<R: Read + Send> Transport for CaptureTransport<R> {
    fn read_state(&mut self) -> Result<Option<ToolState>, TransportError> {
        match bincode::deserialize_from(&mut self.reader) {
            Ok(state) => {
                self.frames += 1;
                Ok(Some(state))
            }
            Err(e) if is_end_of_stream(&e) => Ok(None),
            Err(e) => Err(TransportError::Decode(e)),
        }
    }

    fn descriptor(&self) -> &DeviceClassDescriptor {
        &self.descriptor
    }
}

fn is_end_of_stream(e: &bincode::Error) -> bool {
    matches!(&**e, bincode::ErrorKind::Io(io) if io.kind() == ErrorKind::UnexpectedEof)
}

/// Records tool states in the capture format.
pub struct CaptureWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> CaptureWriter<W> {
    /// Starts a capture by writing `header`.
    pub fn new(writer: W, header: &CaptureHeader) -> Result<Self, TransportError> {
        let mut writer = BufWriter::new(writer);
        bincode::serialize_into(&mut writer, header)?;
        Ok(Self { writer })
    }

    pub fn write_state(&mut self, state: &ToolState) -> Result<(), TransportError> {
        bincode::serialize_into(&mut self.writer, state)?;
        Ok(())
    }

    /// Flushes buffered frames and returns the underlying writer.
    pub fn finish(self) -> Result<W, TransportError> {
        self.writer
            .into_inner()
            .map_err(|e| TransportError::Read(e.into_error()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
