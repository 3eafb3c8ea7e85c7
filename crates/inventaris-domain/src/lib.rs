//! Domain types shared across the Inventaris crates.
//!
//! This crate contains only pure types with no I/O or framework dependencies.
//! Import in `usecase/` and `domain/` layers; `infra/` only maps wire rows into them.

pub mod id;
pub mod inventory;
pub mod photo;
pub mod role;
pub mod user;
