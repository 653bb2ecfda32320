//! ProcessSamplesUseCase: runs decoded tablet reports through the pipeline
//! and delivers the resulting events to the host.
//!
//! The [`DriverContext`] owns the device registry and the display layout.
//! Exactly one task owns the context, so every report is processed to
//! completion before the next one is looked at, and device removal or
//! property changes can only happen between two reports.
//!
//! # Architecture
//!
//! ```text
//!  reader thread (link A) ──┐
//!  reader thread (link B) ──┼──► mpsc ──► run_event_loop ──► DriverContext::ingest
//!  reader thread (link C) ──┘                                    │
//!                                                               ▼
//!                                         DeviceRegistry::dispatch ──► InputSink
//! ```
//!
//! This use case depends only on the [`InputSink`] trait and `tablet-core`
//! types.  The host adapter is injected at construction time, making the use
//! case fully unit-testable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tablet_core::{DeviceId, DeviceRegistry, DisplayLayout, InputEvent, RegistryError, ToolState};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How often the event loop re-checks the shutdown flag while idle.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Error reported by a host input adapter.
#[derive(Debug, Error, PartialEq)]
pub enum SinkError {
    #[error("host rejected event: {0}")]
    Rejected(String),
    #[error("host input system unavailable")]
    Unavailable,
}

/// Error type for the process-samples use case.
#[derive(Debug, Error, PartialEq)]
pub enum ProcessError {
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Valuators reported with a motion event.
///
/// In absolute mode `x`/`y` are screen pixels; in relative mode every field
/// is a delta from the previous report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Valuators {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub tilt_x: i32,
    pub tilt_y: i32,
    pub wheel: i32,
}

/// Host input subsystem that receives synthesized events.
///
/// The binary logs events through `tracing`; tests record them.
pub trait InputSink: Send + Sync {
    /// The tool entered proximity of `device` on `screen`.
    fn proximity_in(&self, device: DeviceId, screen: usize) -> Result<(), SinkError>;

    /// The tool left proximity of `device`.
    fn proximity_out(&self, device: DeviceId) -> Result<(), SinkError>;

    /// Pointer motion.
    fn motion(
        &self,
        device: DeviceId,
        absolute: bool,
        screen: usize,
        valuators: Valuators,
    ) -> Result<(), SinkError>;

    /// A (mapped) button changed state.
    fn button(&self, device: DeviceId, button: u16, pressed: bool) -> Result<(), SinkError>;

    /// A synthesized key changed state.
    fn key(&self, device: DeviceId, keycode: u32, pressed: bool) -> Result<(), SinkError>;
}

/// Hands one event to the matching [`InputSink`] method.
pub fn deliver(sink: &dyn InputSink, event: &InputEvent) -> Result<(), SinkError> {
    match *event {
        InputEvent::ProximityIn { device, screen } => sink.proximity_in(device, screen),
        InputEvent::ProximityOut { device } => sink.proximity_out(device),
        InputEvent::Motion {
            device,
            absolute,
            x,
            y,
            z,
            tilt_x,
            tilt_y,
            wheel,
            screen,
        } => sink.motion(
            device,
            absolute,
            screen,
            Valuators {
                x,
                y,
                z,
                tilt_x,
                tilt_y,
                wheel,
            },
        ),
        InputEvent::Button {
            device,
            button,
            pressed,
        } => sink.button(device, button, pressed),
        InputEvent::Key {
            device,
            keycode,
            pressed,
        } => sink.key(device, keycode, pressed),
    }
}

/// Message from a link reader to the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkMessage {
    /// A decoded tablet report.
    State { path: String, state: ToolState },
    /// The transport reached the end of its stream.
    Closed { path: String },
    /// Reading from the transport failed; the link is unusable.
    Failed { path: String, error: String },
}

/// Everything the event loop needs to process reports.
pub struct DriverContext {
    pub registry: DeviceRegistry,
    pub layout: DisplayLayout,
    sink: Arc<dyn InputSink>,
    /// Reused between reports to avoid reallocating on the hot path.
    events: Vec<InputEvent>,
}

impl DriverContext {
    pub fn new(registry: DeviceRegistry, layout: DisplayLayout, sink: Arc<dyn InputSink>) -> Self {
        Self {
            registry,
            layout,
            sink,
            events: Vec::with_capacity(16),
        }
    }

    /// Processes one report from the link at `path` and delivers every
    /// resulting event.  Returns the number of events delivered.
    ///
    /// A report no device claims is not an error; it produces no events.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::Registry`] if `path` names no known link.
    /// - [`ProcessError::Sink`] if the host rejects an event.  Events after
    ///   the rejected one are not delivered.
    pub fn ingest(&mut self, path: &str, state: &ToolState) -> Result<usize, ProcessError> {
        self.events.clear();
        self.registry
            .dispatch(path, state, &self.layout, &mut self.events)?;
        for event in &self.events {
            deliver(self.sink.as_ref(), event)?;
        }
        Ok(self.events.len())
    }

    /// Handles one message from a link reader.
    pub fn handle(&mut self, message: LinkMessage) {
        match message {
            LinkMessage::State { path, state } => {
                if let Err(e) = self.ingest(&path, &state) {
                    warn!(path = %path, "failed to process report: {e}");
                }
            }
            LinkMessage::Closed { path } => {
                info!(path = %path, "link reached end of stream");
            }
            LinkMessage::Failed { path, error } => {
                error!(path = %path, "link failed: {error}");
                if let Err(e) = self.registry.mark_unusable(&path) {
                    debug!("cannot mark link unusable: {e}");
                }
            }
        }
    }
}

/// Processes link messages until every reader has hung up or `running` is
/// cleared.
pub async fn run_event_loop(
    ctx: &mut DriverContext,
    rx: &mut mpsc::Receiver<LinkMessage>,
    running: &AtomicBool,
) {
    while running.load(Ordering::Relaxed) {
        match tokio::time::timeout(SHUTDOWN_POLL, rx.recv()).await {
            Ok(Some(message)) => ctx.handle(message),
            Ok(None) => {
                info!("all links closed");
                break;
            }
            Err(_) => continue,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::host::mock::RecordingSink;
    use tablet_core::{
        DeviceConfig, LinkSettings, LinkStatus, LogicalDevice, TabletCapabilities, ToolType,
    };

    const PATH: &str = "/dev/input/event7";

    fn make_context(sink: Arc<RecordingSink>) -> (DriverContext, DeviceId) {
        let mut registry = DeviceRegistry::new();
        registry.add_link(
            PATH,
            TabletCapabilities::new(1000, 1000, 1023, true, ToolType::ALL.to_vec()),
            LinkSettings::default(),
        );
        let id = registry
            .add_device(
                PATH,
                LogicalDevice::new(DeviceConfig::new("pen", ToolType::Stylus, 1000, 1000)).unwrap(),
            )
            .unwrap();
        let layout = DisplayLayout::single(1000, 1000).unwrap();
        let ctx = DriverContext::new(registry, layout, sink as Arc<dyn InputSink>);
        (ctx, id)
    }

    fn pen(x: i32, y: i32, buttons: u16) -> ToolState {
        ToolState {
            tool: Some(ToolType::Stylus),
            proximity: true,
            x,
            y,
            buttons,
            ..ToolState::default()
        }
    }

    #[test]
    fn test_ingest_delivers_proximity_in_and_motion() {
        // Arrange
        let sink = Arc::new(RecordingSink::new());
        let (mut ctx, id) = make_context(Arc::clone(&sink));

        // Act
        let first = ctx.ingest(PATH, &pen(100, 100, 0)).unwrap();
        let second = ctx.ingest(PATH, &pen(300, 400, 0)).unwrap();

        // Assert
        assert_eq!(first, 0);
        assert_eq!(second, 2);
        let events = sink.events();
        assert_eq!(events[0], InputEvent::ProximityIn { device: id, screen: 0 });
        assert!(matches!(events[1], InputEvent::Motion { x: 300, y: 400, .. }));
    }

    #[test]
    fn test_ingest_delivers_button_transitions() {
        // Arrange
        let sink = Arc::new(RecordingSink::new());
        let (mut ctx, id) = make_context(Arc::clone(&sink));
        ctx.ingest(PATH, &pen(100, 100, 0)).unwrap();
        ctx.ingest(PATH, &pen(300, 400, 0)).unwrap();

        // Act
        ctx.ingest(PATH, &pen(300, 400, 0b10)).unwrap();

        // Assert
        assert!(sink
            .events()
            .contains(&InputEvent::Button { device: id, button: 2, pressed: true }));
    }

    #[test]
    fn test_ingest_unknown_link_is_registry_error() {
        let sink = Arc::new(RecordingSink::new());
        let (mut ctx, _) = make_context(sink);
        let result = ctx.ingest("/dev/unknown", &pen(1, 1, 0));
        assert_eq!(
            result,
            Err(ProcessError::Registry(RegistryError::LinkNotFound("/dev/unknown".into())))
        );
    }

    #[test]
    fn test_ingest_propagates_sink_failure() {
        // Arrange
        let sink = Arc::new(RecordingSink {
            should_fail: true,
            ..RecordingSink::default()
        });
        let (mut ctx, _) = make_context(sink);
        ctx.ingest(PATH, &pen(100, 100, 0)).unwrap();

        // Act
        let result = ctx.ingest(PATH, &pen(300, 400, 0));

        // Assert
        assert!(matches!(result, Err(ProcessError::Sink(_))));
    }

    #[test]
    fn test_failed_link_message_marks_link_unusable() {
        let sink = Arc::new(RecordingSink::new());
        let (mut ctx, _) = make_context(sink);
        ctx.handle(LinkMessage::Failed {
            path: PATH.to_string(),
            error: "device unplugged".to_string(),
        });
        assert_eq!(ctx.registry.link(PATH).map(|l| l.status()), Some(LinkStatus::Unusable));
    }

    #[tokio::test]
    async fn test_event_loop_drains_channel_until_senders_drop() {
        // Arrange
        let sink = Arc::new(RecordingSink::new());
        let (mut ctx, _) = make_context(Arc::clone(&sink));
        let (tx, mut rx) = mpsc::channel(8);
        let running = AtomicBool::new(true);
        for (x, y) in [(100, 100), (300, 400), (500, 500)] {
            tx.send(LinkMessage::State {
                path: PATH.to_string(),
                state: pen(x, y, 0),
            })
            .await
            .unwrap();
        }
        drop(tx);

        // Act
        run_event_loop(&mut ctx, &mut rx, &running).await;

        // Assert: proximity-in + two motions
        assert_eq!(sink.events().len(), 3);
    }

    #[tokio::test]
    async fn test_event_loop_stops_when_running_is_cleared() {
        let sink = Arc::new(RecordingSink::new());
        let (mut ctx, _) = make_context(sink);
        let (_tx, mut rx) = mpsc::channel::<LinkMessage>(1);
        let running = AtomicBool::new(false);

        // Returns immediately even though the sender is still alive
        run_event_loop(&mut ctx, &mut rx, &running).await;
    }
}
