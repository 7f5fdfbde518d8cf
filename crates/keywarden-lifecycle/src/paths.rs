//! Keystore key naming and mount path normalization

/// Keystore round-trip probe key.
pub const TEST_KEY: &str = "vault-test";

/// Keystore key holding the root token.
pub const ROOT_TOKEN_KEY: &str = "vault-root";

/// Keystore key for the i-th unseal share.
pub fn unseal_key(index: u32) -> String {
    format!("vault-unseal-{index}")
}

/// Keystore key for the i-th recovery share.
pub fn recovery_key(index: u32) -> String {
    format!("vault-recovery-{index}")
}

/// The server stores mount paths with a trailing slash; every comparison
/// against server-side state goes through this form.
pub fn normalize_mount_path(path: &str) -> String {
    format!("{}/", path.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_keys_are_indexed() {
        assert_eq!(unseal_key(0), "vault-unseal-0");
        assert_eq!(recovery_key(4), "vault-recovery-4");
    }

    #[test]
    fn normalization_adds_exactly_one_trailing_slash() {
        assert_eq!(normalize_mount_path("kubernetes"), "kubernetes/");
        assert_eq!(normalize_mount_path("kubernetes/"), "kubernetes/");
        assert_eq!(normalize_mount_path("/team/secret/"), "team/secret/");
    }
}
