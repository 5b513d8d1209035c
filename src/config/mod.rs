//! Daemon configuration: YAML model, environment expansion and the file store.

pub mod expand;
pub mod model;
pub mod store;
