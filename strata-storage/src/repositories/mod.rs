//! Repository implementations for all aggregates

pub mod asset;
pub mod item;
pub mod model;
pub mod schema;

#[cfg(test)]
mod item_tests;

pub use asset::AssetRepository;
pub use item::ItemRepository;
pub use model::ModelRepository;
pub use schema::SchemaRepository;
