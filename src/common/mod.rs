//! Shared plumbing: errors, configuration, logging

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{Error, Result};
