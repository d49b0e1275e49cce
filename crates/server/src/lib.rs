//! HTTP command surface for the ticket lifecycle engine.

pub mod api;
pub mod metrics;
pub mod state;
