//! Storage layer: a JSON journal file holding labelled entries.

mod error;
mod json;

pub use error::StoreError;
pub use json::JsonStore;
