//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration (from the platform
//! directory or a path given on the command line), validates it, converts
//! its entries into the types the application layer works with, and writes
//! it back when asked.

pub mod config;
