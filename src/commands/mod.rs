//! CLI command implementations for envirobly-exporter.
//!
//! - `config`: Configuration file generation
//! - `test`: One-shot collection run

pub mod config;

pub use config::command_config;
pub use test::command_test;
