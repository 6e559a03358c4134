//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the catalog platform:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the catalog crates depend on.
//! It establishes the logging conventions and the process-level configuration
//! (connection pool sizing, statement deadlines, environment) that are read once
//! at start-up and threaded explicitly into the persistence layer.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
