//! License server client layer.

pub mod config;
pub mod http;
pub mod net;
