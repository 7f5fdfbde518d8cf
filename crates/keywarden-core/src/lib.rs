//! # keywarden-core
//!
//! Core library for keywarden providing:
//! - The declarative configuration document model (`vault-config.yml`)
//! - Document loading and strict parsing
//! - YAML to JSON value coercion for server writes
//! - Shared error types

pub mod coerce;
pub mod document;
pub mod error;
pub mod loader;

pub use document::ExternalConfig;
pub use error::{Error, Result};
pub use loader::DEFAULT_CONFIG_FILE;
