//! Domain-level building blocks shared across the API, monitor, and
//! notify crates: typed environment configuration, the watched-address
//! book and transfer records, the alert delivery contract, and
//! telemetry wiring.

pub mod alerts;
pub mod config;
pub mod model;
pub mod services;
