//! Data module - spreadsheet loading, schema, and cleaning

mod cleaner;
mod loader;
pub mod schema;

pub use cleaner::{DataCleaner, ImputationScope};
pub use loader::{DataLoader, LoaderError};
pub use schema::CoBenefit;
