//! Configuration for the terrain pipeline.
//!
//! Settings persist to disk as a RON file, can be overridden from the command
//! line via clap, and can be wrapped in an [`Observable`] so preview tooling
//! hears about edits.

mod cli;
mod config;
mod error;
mod observable;

pub use cli::CliArgs;
pub use config::{CONFIG_FILE_NAME, Config, DebugConfig, DrawMode, LodConfig, PreviewConfig};
pub use error::ConfigError;
pub use observable::{Observable, SubscriptionId};
