//! Unwrapping of installer-packaged artifacts.

use crate::cache::VersionLayout;
use crate::error::{Error, Result};
use crate::identity::{ArtifactVariant, InputArtifact};
use crate::jar::remove_if_exists;
use crate::pipeline::SetupStage;
use crate::process::run_command;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Command;

/// Turns an installer jar into the mod jar it carries.
pub trait PayloadExtractor: Send + Sync {
    /// Write the payload of `installer` to `destination`.
    ///
    /// `game_jar` is the official-names game jar the installer patches against.
    fn extract(&self, installer: &Utf8Path, destination: &Utf8Path, game_jar: &Utf8Path)
        -> Result<()>;
}

/// Runs the installer's own patcher entry point.
#[derive(Debug, Clone)]
pub struct JavaPatcherExtractor {
    pub java: Utf8PathBuf,
    pub main_class: String,
}

impl JavaPatcherExtractor {
    pub fn new(java: impl Into<Utf8PathBuf>) -> Self {
        Self {
            java: java.into(),
            main_class: "optifine.Patcher".to_string(),
        }
    }
}

impl Default for JavaPatcherExtractor {
    fn default() -> Self {
        Self::new("java")
    }
}

impl PayloadExtractor for JavaPatcherExtractor {
    fn extract(
        &self,
        installer: &Utf8Path,
        destination: &Utf8Path,
        game_jar: &Utf8Path,
    ) -> Result<()> {
        let mut command = Command::new(self.java.as_std_path());
        command
            .arg("-cp")
            .arg(installer)
            .arg(&self.main_class)
            .arg(game_jar)
            .arg(installer)
            .arg(destination);
        run_command(SetupStage::NormalizingPayload, installer, &mut command)
    }
}

/// The jar later stages operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub jar: Utf8PathBuf,
    /// Set when `jar` was produced here and must be deleted at cleanup.
    pub intermediate: bool,
}

/// Resolve the mod jar for `input`, extracting installer payloads into the
/// version directory. An existing payload is reused.
pub fn normalize_payload(
    extractor: &dyn PayloadExtractor,
    input: &InputArtifact,
    layout: &VersionLayout,
    game_jar: &Utf8Path,
) -> Result<Normalized> {
    if input.variant == ArtifactVariant::Plain {
        return Ok(Normalized {
            jar: input.path.clone(),
            intermediate: false,
        });
    }

    let destination = layout.payload_jar();
    if destination.exists() {
        tracing::info!("Reusing extracted payload {}", destination);
    } else {
        tracing::info!("Extracting installer payload from {}", input.path);
        let extracted = extractor
            .extract(&input.path, &destination, game_jar)
            .and_then(|()| {
                if destination.exists() {
                    Ok(())
                } else {
                    Err(Error::collaborator(
                        SetupStage::NormalizingPayload,
                        &input.path,
                        "extractor finished without producing a payload",
                    ))
                }
            });
        if let Err(e) = extracted {
            remove_if_exists(&destination)?;
            return Err(e);
        }
    }

    Ok(Normalized {
        jar: destination,
        intermediate: true,
    })
}
