//! The per-sample pipeline.
//!
//! Every function in here is synchronous and finishes without I/O.  One
//! sample is processed to completion (producer, arbiter, synthesizer) before
//! the caller reads the next one, which is what keeps a device's state machine
//! and previous-sample snapshot consistent.
//!
//! # What lives where
//!
//! - **`buttons`** – Button bitmask diffing.
//! - **`suppress`** – The "did anything change enough?" predicate.
//! - **`producer`** – Per-link filtering that turns a transport `ToolState`
//!   into a `RawSample` (suppression, rotation, averaging).
//! - **`arbiter`** – Chooses which logical device receives a sample.
//! - **`synthesizer`** – The proximity state machine that emits events.
//! - **`events`** – The typed events handed to the host.

pub mod arbiter;
pub mod buttons;
pub mod events;
pub mod producer;
pub mod suppress;
pub mod synthesizer;

pub use arbiter::DeviceArbiter;
pub use producer::SampleProducer;
pub use synthesizer::{EventSynthesizer, StepContext};
