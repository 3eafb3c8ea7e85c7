//! Shared plumbing for the Inventaris crates: configuration loading, backend
//! error mapping, tracing setup and serde helpers.

pub mod config;
pub mod error;
pub mod serde;
pub mod tracing;
