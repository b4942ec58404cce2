//! Core domain models for the Strata content engine
//!
//! This crate contains the versioned, schema-typed item/value model used
//! throughout the Strata system: typed values, user-authored schemas with
//! per-field constraints, content items, and an append-only version history
//! with movable named refs. It performs no I/O; persistence and cross-item
//! resolution live in the storage crate.

pub mod asset;
pub mod cancellation;
pub mod error;
pub mod id;
pub mod item;
pub mod model;
pub mod operator;
pub mod pagination;
pub mod schema;
pub mod value;
pub mod version;

pub use error::{Error, Result};
