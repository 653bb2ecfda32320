//! Application layer use cases for the tablet driver.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (the pure arbitration and synthesis logic in `tablet-core`) and the
//! infrastructure (device files, configuration on disk, the host input
//! system).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** core objects to fulfil a goal (e.g., "deliver the events
//!   for this tablet report to the host").
//! - **Depend on abstractions** (the [`process_samples::InputSink`] trait)
//!   rather than concrete implementations, so tests can record events instead
//!   of injecting them into a real desktop.
//! - **Contain no file system access and no OS calls**.
//!
//! # Sub-modules
//!
//! - **`process_samples`** – Owns the driver context and runs every decoded
//!   tablet report through the pipeline.  This is the hot path: it runs for
//!   every report the tablet sends.
//!
//! - **`manage_devices`** – Builds the device registry from configuration,
//!   spawns hotplug dependents, and removes devices.
//!
//! - **`update_properties`** – The named get/set property surface used to
//!   reconfigure devices while the driver runs.

pub mod manage_devices;
pub mod process_samples;
pub mod update_properties;
