//! # keywarden-client
//!
//! A thin typed wrapper over the sealed secret-store server's REST API:
//! - [`VaultApi`]: the object-safe trait the lifecycle manager drives,
//!   mockable in tests
//! - [`HttpVaultClient`]: the reqwest-backed implementation
//! - request/response types mirroring the server's wire shapes

pub mod api;
pub mod error;
pub mod http;
pub mod types;

pub use api::VaultApi;
pub use error::ClientError;
pub use http::{HttpVaultClient, RetryConfig};
pub use types::*;
