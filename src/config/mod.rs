//! Plant Configuration Module
//!
//! Operator-tunable thresholds and pipeline tuning, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `PLANTWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `plantwatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is wrapped in an `Arc` at startup and handed to each
//! subsystem constructor. It is read-only for the life of the process.

mod plant_config;
pub mod defaults;

pub use plant_config::*;
