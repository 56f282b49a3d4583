//! Input artifact discovery and identity.

use crate::error::Result;
use crate::hash::{hash_file, ContentHash};
use crate::jar;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Entry that marks a self-extracting installer jar.
pub const INSTALLER_MARKER: &str = "optifine/Installer.class";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactVariant {
    /// Already a mod jar.
    Plain,
    /// An installer that must be unpacked into a mod jar first.
    InstallerWrapped,
}

impl ArtifactVariant {
    pub fn detect(jar: &Utf8Path) -> Result<Self> {
        if jar::contains_entry(jar, INSTALLER_MARKER)? {
            Ok(Self::InstallerWrapped)
        } else {
            Ok(Self::Plain)
        }
    }
}

impl fmt::Display for ArtifactVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => f.write_str("plain"),
            Self::InstallerWrapped => f.write_str("installer"),
        }
    }
}

/// A located input jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputArtifact {
    pub path: Utf8PathBuf,
    /// Label used for the version directory.
    pub version: String,
    pub variant: ArtifactVariant,
}

impl InputArtifact {
    /// Inspect `path`, labelling it with its file stem.
    pub fn discover(path: impl Into<Utf8PathBuf>) -> Result<Self> {
        let path = path.into();
        let version = path.file_stem().unwrap_or("unknown").to_string();
        let variant = ArtifactVariant::detect(&path)?;
        tracing::debug!("Discovered {} ({}) at {}", version, variant, path);
        Ok(Self {
            path,
            version,
            variant,
        })
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Identity of one run's input, recomputed from the file every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactIdentity {
    pub version: String,
    pub variant: ArtifactVariant,
    pub hash: ContentHash,
}

impl ArtifactIdentity {
    pub fn compute(input: &InputArtifact) -> Result<Self> {
        Ok(Self {
            version: input.version.clone(),
            variant: input.variant,
            hash: hash_file(&input.path)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::tests::utf8_dir;
    use crate::jar::write_entries;

    #[test]
    fn test_detect_variants() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);

        let installer = root.join("OptiFine_1.16.5_HD_U_G8.jar");
        write_entries(&installer, [(INSTALLER_MARKER, &b""[..])]).unwrap();
        let plain = root.join("mod.jar");
        write_entries(&plain, [("optifine/Config.class", &b""[..])]).unwrap();

        let input = InputArtifact::discover(installer.clone()).unwrap();
        assert_eq!(input.variant, ArtifactVariant::InstallerWrapped);
        assert_eq!(input.version, "OptiFine_1.16.5_HD_U_G8");
        assert_eq!(
            ArtifactVariant::detect(&plain).unwrap(),
            ArtifactVariant::Plain
        );
    }

    #[test]
    fn test_identity_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let path = root.join("mod.jar");
        write_entries(&path, [("a.class", &b"1"[..])]).unwrap();

        let input = InputArtifact::discover(path.clone()).unwrap();
        let first = ArtifactIdentity::compute(&input).unwrap();
        write_entries(&path, [("a.class", &b"2"[..])]).unwrap();
        let second = ArtifactIdentity::compute(&input).unwrap();

        assert_eq!(first.version, second.version);
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn test_not_a_jar() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_dir(&dir).join("broken.jar");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        assert!(matches!(
            InputArtifact::discover(path),
            Err(crate::Error::Zip(_))
        ));
    }
}
