//! Tablet transports and protocol detection.
//!
//! A transport turns the byte stream of one tablet into decoded
//! [`ToolState`]s.  The driver ships one transport, [`replay::CaptureTransport`],
//! which reads recorded sessions from a capture file.  A capture starts with a
//! [`CaptureHeader`] describing the tablet, followed by one frame per report.
//!
//! # Protocol detection (for beginners)
//!
//! Tablets speak one of a few protocols.  Which one is decided by running an
//! ordered ladder of probes over the header and taking the first match:
//!
//! ```text
//! UsbProbe    bus = "usb"            full tool set, tilt as reported
//! Isdv4Probe  force_device = ISDV4   pen + touch only, no tilt
//! SerialProbe (always matches)       tool set and tilt as reported
//! ```
//!
//! The winning probe produces the [`DeviceClassDescriptor`] the rest of the
//! driver uses to size mapped areas and create hotplug dependents.

pub mod mock;
pub mod reader;
pub mod replay;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tablet_core::{TabletCapabilities, ToolState, ToolType};
use thiserror::Error;
use tracing::debug;

/// Capture format version written by [`replay::CaptureWriter`].
pub const CAPTURE_VERSION: u32 = 1;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device or capture file could not be opened.
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O on an open transport or capture failed.
    #[error("I/O error: {0}")]
    Read(#[from] std::io::Error),

    /// The data read could not be decoded.
    #[error("malformed capture data: {0}")]
    Decode(#[from] bincode::Error),

    /// No probe recognised the tablet.
    #[error("no protocol recognises {0}")]
    NoProtocol(String),

    /// The reader thread could not be started.
    #[error("failed to spawn reader thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Wire protocol a tablet speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    Usb,
    Isdv4,
    Serial,
}

/// What a detected tablet can report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceClassDescriptor {
    pub protocol: ProtocolKind,
    pub tools: Vec<ToolType>,
    pub max_x: i32,
    pub max_y: i32,
    pub max_z: i32,
    pub max_tilt: i32,
    pub tilt_supported: bool,
}

impl DeviceClassDescriptor {
    pub fn capabilities(&self) -> TabletCapabilities {
        TabletCapabilities::new(
            self.max_x,
            self.max_y,
            self.max_z,
            self.tilt_supported,
            self.tools.clone(),
        )
    }
}

/// Leading record of a capture file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureHeader {
    pub version: u32,
    /// Bus the tablet was attached to (`"usb"` or `"serial"`).
    pub bus: String,
    /// Protocol forced by configuration for a serial tablet (`"ISDV4"`).
    pub force_device: Option<String>,
    pub model: String,
    pub tools: Vec<ToolType>,
    pub max_x: i32,
    pub max_y: i32,
    pub max_z: i32,
    pub max_tilt: i32,
}

impl CaptureHeader {
    fn descriptor(
        &self,
        protocol: ProtocolKind,
        tools: Vec<ToolType>,
        tilt: bool,
    ) -> DeviceClassDescriptor {
        DeviceClassDescriptor {
            protocol,
            tools,
            max_x: self.max_x,
            max_y: self.max_y,
            max_z: self.max_z,
            max_tilt: self.max_tilt,
            tilt_supported: tilt && self.max_tilt > 0,
        }
    }
}

/// Reads decoded tool states from one tablet.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Returns the next state, or `None` at the end of the stream.
    fn read_state(&mut self) -> Result<Option<ToolState>, TransportError>;

    /// The detected tablet.
    fn descriptor(&self) -> &DeviceClassDescriptor;
}

// ── Protocol probes ───────────────────────────────────────────────────────────

/// One rung of the detection ladder.
pub trait ProtocolProbe: Send + Sync {
    fn kind(&self) -> ProtocolKind;

    /// Returns the descriptor if this probe recognises the tablet.
    fn detect(&self, header: &CaptureHeader) -> Option<DeviceClassDescriptor>;
}

/// USB tablets, recognised by their bus.
pub struct UsbProbe;

impl ProtocolProbe for UsbProbe {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Usb
    }

    fn detect(&self, header: &CaptureHeader) -> Option<DeviceClassDescriptor> {
        header
            .bus
            .eq_ignore_ascii_case("usb")
            .then(|| header.descriptor(ProtocolKind::Usb, header.tools.clone(), true))
    }
}

/// ISDV4 Tablet PC digitizers.  Only selected when forced by configuration.
pub struct Isdv4Probe;

impl ProtocolProbe for Isdv4Probe {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Isdv4
    }

    fn detect(&self, header: &CaptureHeader) -> Option<DeviceClassDescriptor> {
        let forced = header
            .force_device
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case("ISDV4"));
        forced.then(|| {
            let tools = header
                .tools
                .iter()
                .copied()
                .filter(|t| matches!(t, ToolType::Stylus | ToolType::Eraser | ToolType::Touch))
                .collect();
            header.descriptor(ProtocolKind::Isdv4, tools, false)
        })
    }
}

/// Plain serial tablets.  Matches anything, so it must come last.
pub struct SerialProbe;

impl ProtocolProbe for SerialProbe {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Serial
    }

    fn detect(&self, header: &CaptureHeader) -> Option<DeviceClassDescriptor> {
        Some(header.descriptor(ProtocolKind::Serial, header.tools.clone(), true))
    }
}

/// The probe ladder in detection order.
pub fn default_probes() -> Vec<Box<dyn ProtocolProbe>> {
    vec![Box::new(UsbProbe), Box::new(Isdv4Probe), Box::new(SerialProbe)]
}

/// Detects the protocol of the tablet described by `header`.
pub fn detect_protocol(header: &CaptureHeader) -> Result<DeviceClassDescriptor, TransportError> {
    detect_protocol_with(&default_probes(), header)
}

/// Detects the protocol using a custom probe ladder.  The first match wins.
///
/// # Errors
///
/// Returns [`TransportError::NoProtocol`] if no probe matches.
pub fn detect_protocol_with(
    probes: &[Box<dyn ProtocolProbe>],
    header: &CaptureHeader,
) -> Result<DeviceClassDescriptor, TransportError> {
    probes
        .iter()
        .find_map(|probe| {
            let found = probe.detect(header);
            debug!(
                probe = ?probe.kind(),
                matched = found.is_some(),
                model = %header.model,
                "protocol probe"
            );
            found
        })
        .ok_or_else(|| TransportError::NoProtocol(header.model.clone()))
}

/// Opens the capture file at `path` and detects its tablet.
///
/// # Errors
///
/// - [`TransportError::Open`] if the file cannot be opened.
/// - [`TransportError::Decode`] if the header is malformed.
/// - [`TransportError::NoProtocol`] if detection fails.
pub fn open_transport(path: &Path) -> Result<Box<dyn Transport>, TransportError> {
    let transport = replay::CaptureTransport::open(path)?;
    Ok(Box::new(transport))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
