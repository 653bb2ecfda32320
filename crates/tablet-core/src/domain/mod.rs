//! Domain entities for the tablet driver.
//!
//! This module contains pure data types and the invariants that hold between
//! them.  Nothing in here performs I/O.
//!
//! # What lives where
//!
//! - **`tool`** – Tool roles, proximity states, mapped areas, and the sample
//!   types that flow through the pipeline (`ToolState` from the transport,
//!   `RawSample` into the arbiter).
//! - **`device`** – A configured logical device and its running state.
//! - **`display`** – Screen geometry and the tablet-to-screen mapper.
//! - **`filter`** – Pressure curve, tablet rotation, and raw-sample averaging.
//! - **`registry`** – Physical links and the logical devices attached to them.

pub mod device;
pub mod display;
pub mod filter;
pub mod registry;
pub mod tool;
