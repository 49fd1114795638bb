//! Command-line host for the coda engine.
//!
//! Each subcommand opens a project file, runs one engine operation and
//! either prints a report or stores the resulting column back.

mod cli;
pub mod commands;
mod config;
pub mod project;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use project::Project;
