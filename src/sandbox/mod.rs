//! Sandbox module containing isolation, relay and bootstrap components.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod host;
pub mod relay;
