//! Scratch storage for intermediate artifacts, e.g. a template body with its
//! front matter stripped, staged for the renderer.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Stages content under the build's cache directory.
#[derive(Clone, Debug)]
pub struct TemporaryFilesystem {
    directory: PathBuf,
}

impl TemporaryFilesystem {
    pub fn new(directory: impl Into<PathBuf>) -> TemporaryFilesystem {
        TemporaryFilesystem {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Reports whether a (possibly reusable) cache directory exists.
    pub fn has_temp_directory(&self) -> bool {
        self.directory.is_dir()
    }

    /// Writes `content` to `{directory}/{sha256(origin)}{suffix}` and returns
    /// that path. Names are derived from the originating source path, so
    /// distinct files never share a scratch file.
    pub fn put(&self, content: &str, origin: &Path, suffix: &str) -> io::Result<PathBuf> {
        let digest = Sha256::digest(origin.to_string_lossy().as_bytes());
        let path = self
            .directory
            .join(format!("{}{}", hex::encode(digest), suffix));
        std::fs::create_dir_all(&self.directory)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }
}
