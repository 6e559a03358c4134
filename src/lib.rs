//! Workspace placeholder crate.
//!
//! This crate exposes the catalog crates (`core-runtime`, `core-catalog`,
//! `core-service`) behind a single `service` feature so host applications can
//! depend on `catalog-workspace` without wiring each crate individually.

#[cfg(feature = "service")]
pub use core_catalog as catalog;
#[cfg(feature = "service")]
pub use core_runtime as runtime;
#[cfg(feature = "service")]
pub use core_service as service;
