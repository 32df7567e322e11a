//! CLI command implementations.

pub mod delta;
pub mod demo;
pub mod strategies;
