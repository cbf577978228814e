//! Core types and services for leasing-mcp.
//!
//! This crate owns the ingestion pipeline that turns the raw leasing CSV
//! exports into typed tables, the read-only `SurrealDB` store those tables are
//! registered in, and the control plane that reports over them.

pub mod control;
pub mod loader;
pub mod parsers;
pub mod services;
pub mod store;
