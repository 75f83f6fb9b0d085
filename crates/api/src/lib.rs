//! HTTP surface of the Assure risk-analysis backend.

pub mod routes;
pub mod state;
