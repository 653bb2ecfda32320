//! Infrastructure layer for the tablet driver.
//!
//! Contains the adapters that touch the outside world: tablet transports,
//! the host input sink, and configuration files on disk.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `tablet_core`, but MUST NOT be imported by the `application` or domain
//! layers (test doubles excepted).
//!
//! # Sub-modules
//!
//! - **`transport`** – The `Transport` trait, protocol detection, the
//!   capture-file transport, and the reader threads that feed the event loop.
//!
//! - **`host`** – `InputSink` implementations.  `LogSink` reports every
//!   event through `tracing`; `RecordingSink` keeps them in memory for tests.
//!
//! - **`storage`** – TOML configuration loading and saving.

pub mod host;
pub mod storage;
pub mod transport;
