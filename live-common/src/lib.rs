//! Live Common - Shared types, utilities, and configuration for the live proxy.
//!
//! This crate provides:
//! - Configuration types, loading, and environment overrides
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    ApiConfig, Config, LiveModelConfig, ObservabilityConfig, SummaryConfig, ToolsConfig,
};
pub use error::{Error, Result, ResultExt};
pub use validation::{Validate, ValidationError, ValidationResult};
