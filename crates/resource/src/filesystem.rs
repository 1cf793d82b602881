//! Directory-backed resource set.
//!
//! Resource paths are interpreted like bundled-resource names: a leading `/`
//! means "from the resource root", never "from the filesystem root". Paths that
//! would leave the root directory are treated as missing.

use folio_traits::{ResourceError, ResourceProvider, SharedResourceData};
use log::debug;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Loads resources from files under a root directory.
#[derive(Debug)]
pub struct FilesystemResourceProvider {
    root: PathBuf,
    /// Canonicalized root for containment checks
    canonical_root: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let canonical_root = root.canonicalize().ok();
        Self { root, canonical_root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a resource name onto a file below the root, or `None` if the name
    /// escapes it.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return None;
        }

        let candidate = self.root.join(relative);
        match (candidate.canonicalize(), &self.canonical_root) {
            // Symlinks may still point outside the root.
            (Ok(canonical), Some(root)) if !canonical.starts_with(root) => None,
            (Ok(canonical), _) => Some(canonical),
            (Err(_), _) => Some(candidate),
        }
    }
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let file = self
            .resolve(path)
            .ok_or_else(|| ResourceError::NotFound(format!("{} (outside resource root)", path)))?;
        debug!("Loading resource '{}' from {}", path, file.display());

        std::fs::read(&file).map(Arc::new).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path.to_string())
            } else {
                ResourceError::LoadFailed { path: path.to_string(), message: e.to_string() }
            }
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| p.is_file())
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}
