//! License server protocol types.

pub mod models;
