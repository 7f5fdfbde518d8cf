//! File-backed keystore, one file per key

use crate::{KvError, KvStore};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::debug;
use zeroize::Zeroizing;

/// A keystore storing each key as a file under a root directory. Files are
/// written with owner-only permissions on Unix.
pub struct FileKv {
    root: Utf8PathBuf,
}

impl FileKv {
    /// Open (creating if needed) a file keystore rooted at `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Result<Self, KvError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<Utf8PathBuf, KvError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(KvError::other(format!("invalid keystore key '{key}'")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl KvStore for FileKv {
    async fn get(&self, key: &str) -> Result<Zeroizing<Vec<u8>>, KvError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Zeroizing::new(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(KvError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        fs::write(&path, value)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        debug!(key = %key, path = %path, "keystore entry written");
        Ok(())
    }
}
