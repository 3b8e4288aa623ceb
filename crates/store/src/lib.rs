//! Database access (read and write) abstractions for the Phrasebook API.

pub mod loader;
pub mod models;
mod schema;
mod store;

pub use store::{Store, StoreError};
