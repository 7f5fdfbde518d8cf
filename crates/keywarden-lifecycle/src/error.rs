//! Lifecycle error types

use thiserror::Error;

/// Distinctive lifecycle failures that callers and tests branch on. All
/// other errors propagate as contextual errors from the section that
/// produced them.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("the secret threshold can't be bigger than the shares")]
    ThresholdExceedsShares { shares: u32, threshold: u32 },

    #[error("the secret threshold must be at least 1")]
    ThresholdTooSmall,

    #[error("refusing to init: value for key '{key}' already exists in the keystore")]
    ResidualInitState { key: String },

    #[error("failed to unseal: progress was reset to 0 after share {index}, the share was rejected")]
    InvalidShare { index: u32 },

    #[error("secret engine type '{engine_type}' doesn't support credential rotation")]
    UnsupportedRotation { engine_type: String },

    #[error("startup secret type '{secret_type}' is not supported (only 'kv')")]
    UnsupportedStartupSecret { secret_type: String },

    #[error("only external identity groups are supported, group '{name}' has type '{group_type}'")]
    UnsupportedGroupType { name: String, group_type: String },

    #[error("can't find the config block for the {method_type} auth method")]
    MissingAuthConfig { method_type: String },

    #[error("sub-config under '{path}/{config_option}' requires a name")]
    MissingConfigName { path: String, config_option: String },
}
