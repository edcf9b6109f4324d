//! HTTP surface for the yayd job engine.

pub mod api;
pub mod metrics;
pub mod state;
