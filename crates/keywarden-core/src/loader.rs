//! Configuration document loading

use crate::document::ExternalConfig;
use crate::error::{Error, Result};
use camino::Utf8Path;
use std::fs;

/// Default configuration document name
pub const DEFAULT_CONFIG_FILE: &str = "vault-config.yml";

impl ExternalConfig {
    /// Load the document from the given path, or from `vault-config.yml`
    /// in the current directory when no path is given.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Utf8Path::new(DEFAULT_CONFIG_FILE));

        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;

        Self::parse(&content)
    }

    /// Parse the document from YAML source.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_from_an_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "policies:\n  - name: p\n    rules: 'path \"a\" {{}}'").unwrap();

        let path = Utf8Path::from_path(file.path()).unwrap();
        let config = ExternalConfig::load(Some(path)).unwrap();
        assert_eq!(config.policies[0].name, "p");
    }

    #[test]
    fn missing_file_is_a_config_not_found_error() {
        let err = ExternalConfig::load(Some(Utf8Path::new("/nonexistent/vault-config.yml")))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn parse_rejects_malformed_yaml() {
        assert!(ExternalConfig::parse("policies: {not: [valid").is_err());
    }
}
