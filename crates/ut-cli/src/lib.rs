//! Usage tracker CLI library.
//!
//! This crate provides the CLI interface for the usage tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, IngestSource};
pub use config::Config;
