//! Core module - shared infrastructure for Cortex
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, Config};
pub use error::{CortexError, Result};
pub use types::*;
