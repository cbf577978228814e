//! Store interfaces and `SurrealDB` implementation.
//!
//! The store layer holds the registered tables and answers read queries.

pub mod surreal;

pub use surreal::{QueryRows, StoreError, StoreResult, SurrealTableStore};
