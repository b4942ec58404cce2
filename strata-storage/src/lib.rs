//! Persistence layer for the Strata content engine
//!
//! This crate provides SQLite-backed repositories for every aggregate
//! (schemas, models, item versions, assets), the storage manager wiring them
//! together, and the service layer implementing the write operations and the
//! cross-item resolution pass.

pub mod error;
pub mod manager;
pub mod migrations;
pub mod repositories;
pub mod services;

pub use error::{Error, Result};
pub use manager::StorageManager;

/// Re-export core types for convenience
pub use strata_core as core;
