//! Pilot-access intake service behind the Enthalpy monitoring site.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
