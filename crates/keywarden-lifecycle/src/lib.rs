//! # keywarden-lifecycle
//!
//! The unattended lifecycle manager for a sealed secret-store server:
//! - [`LifecycleManager`]: brings the server from uninitialized through
//!   initialized and unsealed to active, with all key material held in an
//!   external keystore
//! - the reconciler: drives the server's mutable configuration (auth
//!   backends, policies, plugins, secret engines, audit sinks, startup
//!   secrets, identity groups) from a declarative document, idempotently

pub mod error;
pub mod manager;
pub mod paths;
pub mod reconcile;

pub use error::LifecycleError;
pub use manager::{InitConfig, LifecycleManager};
