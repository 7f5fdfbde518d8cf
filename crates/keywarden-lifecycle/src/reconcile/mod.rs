//! Section reconcilers, one module per document section
//!
//! The dispatcher in [`crate::manager`] runs these strictly in order:
//! auth, policies, plugins, secrets, audit, startup secrets, groups.
//! Secret engines may depend on plugin registration, and group aliases
//! resolve against auth-mount accessors, so the order is load-bearing.

pub mod audit;
pub mod auth;
pub mod identity;
pub mod plugin;
pub mod policy;
pub mod secrets;
pub mod startup;

/// Mount path for an entry: the explicit path with surrounding slashes
/// trimmed, or the entry's type when no path is given.
pub(crate) fn mount_target(path: &Option<String>, default_type: &str) -> String {
    path.as_deref()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .unwrap_or(default_type)
        .to_string()
}
