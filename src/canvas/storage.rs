use std::path::Path;
use std::sync::Arc;

use crate::errors::{Result, SkywayError};

/// Listing interface over a bucket-like store
pub trait StorageLister: Send + Sync {
    /// Full paths of the direct children of `path`
    fn list_dir(&self, path: &str) -> Result<Vec<String>>;
}

/// Storage handle shared by a collection and its zones
pub type Storage = Arc<dyn StorageLister>;

/// Local filesystem storage
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl StorageLister for LocalStorage {
    fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let storage_err = |source| SkywayError::Storage {
            path: path.to_string(),
            source,
        };

        let mut children = Vec::new();
        for entry in std::fs::read_dir(path).map_err(storage_err)? {
            let entry = entry.map_err(storage_err)?;
            children.push(entry.path().to_string_lossy().into_owned());
        }
        children.sort();
        Ok(children)
    }
}

/// Join a child name onto a storage path
pub fn join(base: &str, child: &str) -> String {
    Path::new(base).join(child).to_string_lossy().into_owned()
}

/// Last component of a storage path
pub fn file_name(path: &str) -> Option<&str> {
    Path::new(path).file_name().and_then(|n| n.to_str())
}

/// File name without its final extension
pub fn file_stem(path: &str) -> Option<&str> {
    Path::new(path).file_stem().and_then(|n| n.to_str())
}
