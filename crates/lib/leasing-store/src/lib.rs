//! Table models and schema constants for leasing-mcp.
//!
//! This crate defines the in-memory table model shared by the loader, the
//! schema registry, and the reporting layer.

pub mod models;
pub mod schema;

pub use models::*;
