//! Sources of the namespace mapping tree.

use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use jarpatch_mappings::MappingTree;

/// Supplies the mapping tree for the remap passes. Only called on a cache miss.
pub trait MappingProvider: Send + Sync {
    fn load(&self) -> Result<MappingTree>;
}

/// Reads a Tiny v1 or v2 file.
#[derive(Debug, Clone)]
pub struct TinyFileMappings {
    path: Utf8PathBuf,
}

impl TinyFileMappings {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl MappingProvider for TinyFileMappings {
    fn load(&self) -> Result<MappingTree> {
        let tree = MappingTree::read_tiny_file(&self.path)?;
        tracing::info!(
            "Loaded {} classes in namespaces {:?} from {}",
            tree.class_count(),
            tree.namespaces(),
            self.path
        );
        Ok(tree)
    }
}

/// An in-memory tree, as the host may already hold one.
impl MappingProvider for MappingTree {
    fn load(&self) -> Result<MappingTree> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::tests::utf8_dir;

    #[test]
    fn test_tiny_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_dir(&dir).join("mappings.tiny");
        std::fs::write(&path, "v1\tofficial\tintermediary\nCLASS\ta\tnet/minecraft/class_1\n")
            .unwrap();

        let tree = TinyFileMappings::new(path).load().unwrap();
        assert_eq!(tree.class_count(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = TinyFileMappings::new("/nonexistent/mappings.tiny")
            .load()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }
}
