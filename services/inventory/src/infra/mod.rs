//! Adapters for the backend ports.

pub mod supabase;
