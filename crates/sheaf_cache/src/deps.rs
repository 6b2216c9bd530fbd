//! Import dependency tracking.
//!
//! The fingerprint only covers the top-level sources. Every other file a
//! compile read is recorded with the hash of the bytes the compiler saw, so a
//! later change to an imported partial invalidates the artifact.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sheaf_common::ContentHash;
use sheaf_compiler::InputFile;

use crate::error::CacheError;

/// A file read during compilation and its content hash at that time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Canonical path.
    pub path: PathBuf,
    /// Hash of the file contents when the artifact was compiled.
    pub hash: ContentHash,
}

impl From<InputFile> for Dependency {
    fn from(input: InputFile) -> Self {
        Self {
            path: input.path,
            hash: input.hash,
        }
    }
}

impl Dependency {
    /// Checks that the file still has the recorded contents.
    pub fn verify(&self) -> Result<(), CacheError> {
        match hash_file(&self.path) {
            Ok(hash) if hash == self.hash => Ok(()),
            _ => Err(CacheError::StaleDependency {
                path: self.path.clone(),
            }),
        }
    }
}

fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
    let content = std::fs::read(path).map_err(|e| CacheError::io(path, e))?;
    Ok(ContentHash::from_bytes(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(path: &Path, content: &str) -> Dependency {
        std::fs::write(path, content).unwrap();
        Dependency::from(InputFile::new(path, content.as_bytes()))
    }

    #[test]
    fn unchanged_file_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let dep = written(&dir.path().join("_vars.scss"), "$a: 1;");
        assert!(dep.verify().is_ok());
    }

    #[test]
    fn modified_file_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_vars.scss");
        let dep = written(&path, "$a: 1;");
        std::fs::write(&path, "$a: 2;").unwrap();
        assert!(matches!(
            dep.verify(),
            Err(CacheError::StaleDependency { .. })
        ));
    }

    #[test]
    fn deleted_file_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_vars.scss");
        let dep = written(&path, "$a: 1;");
        std::fs::remove_file(&path).unwrap();
        assert!(dep.verify().is_err());
    }

    #[test]
    fn hash_of_what_was_read_not_what_is_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_vars.scss");
        std::fs::write(&path, "$a: 2;").unwrap();
        // The compiler saw an older revision than the one now on disk.
        let dep = Dependency::from(InputFile::new(&path, b"$a: 1;"));
        assert!(matches!(
            dep.verify(),
            Err(CacheError::StaleDependency { .. })
        ));
    }
}
