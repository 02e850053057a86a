//! Naming and tool configuration for the save-state generator.
//!
//! An [`AutossConfig`] carries the identifier prefix used for every injected
//! port and variable, the list of signal names recognized as resets, and the
//! command lines of the external Verible tools. It is loaded from an optional
//! TOML file; every key has a default.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, validate_config};
pub use types::*;
