//! Shared configuration, error taxonomy and domain types for the Assure services.

pub mod config;
pub mod error;
pub mod types;
