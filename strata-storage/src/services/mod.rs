//! Service layer coordinating repositories

pub mod item;
pub mod resolver;
pub mod schema;

#[cfg(test)]
mod resolver_tests;

pub use item::{DeleteOptions, ImportItemParam, ImportResult, ImportRowError, ItemService};
pub use resolver::{MetadataView, ResolvedItem, ResolvedView, ResolverService};
pub use schema::SchemaService;
