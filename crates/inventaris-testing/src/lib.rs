//! Test utilities for the Inventaris crates.
//!
//! Provides the contract fixture loader and domain builders.
//! Import from `[dev-dependencies]` only; never in production code.

pub mod builders;
pub mod fixture;
