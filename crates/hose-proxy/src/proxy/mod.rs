//! Binary-side plumbing: flag parsing and telemetry setup.

pub mod config;
pub mod telemetry;
