//! Sama CLI Library
//!
//! Wires a catalog file, configuration and a simulated backend into a
//! playback session and renders its event feed.
//!
//! This library exposes the components for testing purposes.

pub mod catalog;
pub mod config;
pub mod error;
pub mod player;

pub use catalog::FileCatalog;
pub use config::{CliConfig, SimulationSettings};
pub use error::{CliError, Result};
