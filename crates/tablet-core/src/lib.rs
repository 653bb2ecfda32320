//! # tablet-core
//!
//! Pure decision logic of the tablet driver: which logical device receives a
//! sample reported by the digitizer, how tablet coordinates become screen
//! coordinates, and which input events a sample turns into.
//!
//! This crate has zero dependencies on OS APIs, device files, or the host
//! input system. The driver binary (`tablet-driver`) reads samples from the
//! hardware and delivers the events produced here.
//!
//! # Architecture overview (for beginners)
//!
//! A pen tablet is one piece of hardware (a *physical link*: a USB endpoint or
//! serial port) that reports samples for several tools: the pen tip
//! ("stylus"), the pen's eraser end, a puck ("cursor"), finger touch, and the
//! express-key pad.  The user configures one *logical device* per tool role,
//! and may configure several logical devices of the same role that each own a
//! different rectangle of the tablet surface.
//!
//! - **`domain`** – The data model: tools, samples, logical devices, the
//!   display layout, and the registry that groups devices by physical link.
//!
//! - **`engine`** – The per-sample pipeline:
//!
//!   ```text
//!   ToolState ─► SampleProducer ─► RawSample ─► DeviceArbiter ─► EventSynthesizer ─► InputEvent*
//!                (suppress, rotate,               (pick device)    (state machine,
//!                 average)                                          ScreenMapper,
//!                                                                   button diff)
//!   ```
//!
//! Everything is synchronous and allocation-light: one sample is processed to
//! completion before the next one is looked at.

pub mod domain;
pub mod engine;

// Re-export the most-used types at the crate root so callers can write
// `tablet_core::DeviceRegistry` instead of `tablet_core::domain::registry::DeviceRegistry`.
pub use domain::device::{
    ButtonMap, DeviceConfig, DeviceError, LogicalDevice, SampleSnapshot, WheelButtons,
};
pub use domain::display::{
    DisplayLayout, LayoutError, LayoutKind, ScreenGeometry, ScreenMapper, ScreenTarget,
};
pub use domain::filter::{PressureCurve, RawAverager, Rotation};
pub use domain::registry::{
    DeviceRegistry, LinkSettings, LinkStatus, RegistryError, Removal, SharedLink,
    TabletCapabilities,
};
pub use domain::tool::{
    DeviceId, MappedArea, Mode, ProximityState, RawSample, ToolState, ToolType,
};
pub use engine::events::InputEvent;
