//! Tessera Node: configuration, startup assembly and the HTTP API.

pub mod api;
pub mod config;
pub mod node;
