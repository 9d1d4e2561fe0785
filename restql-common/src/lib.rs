//! restql Common Types and Utilities
//!
//! Shared types, configuration, and error handling for the restql query compiler.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod identifier;
pub mod types;

pub use config::{QueryLimitsConfig, RestqlConfig};
pub use error::{Error, Result};
