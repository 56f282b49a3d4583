mod clean;
mod hash;
mod setup;
mod status;

pub use clean::{clean_version, CleanArgs};
pub use hash::{hash_artifact, HashArgs};
pub use setup::{setup_artifact, SetupArgs};
pub use status::{status_artifact, StatusArgs};

use crate::errors::CliError;
use crate::utils::config::AppConfig;
use camino::{Utf8Path, Utf8PathBuf};
use jarpatch_setup::{ArtifactSetup, InputArtifact, TinyFileMappings, TinyRemapperEngine};
use std::sync::Arc;

/// Discover the artifact at `path`, optionally overriding its version label.
pub(crate) fn discover_input(
    path: &Utf8Path,
    version: Option<String>,
) -> Result<InputArtifact, CliError> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.to_path_buf()));
    }
    let input = InputArtifact::discover(path)?;
    Ok(match version {
        Some(version) => input.with_version(version),
        None => input,
    })
}

/// Build the pipeline from the configuration. The remapper and mappings are
/// optional here; a cache hit needs neither.
pub(crate) fn build_setup(
    config: &AppConfig,
    extract_classes: bool,
    game_jar: Option<Utf8PathBuf>,
) -> Result<ArtifactSetup, CliError> {
    let setup_config = config
        .setup_config()?
        .with_extract_classes(extract_classes)
        .with_game_jar_override(game_jar);
    let mut setup = ArtifactSetup::new(setup_config, config.host_environment()?);

    if let Some(jar) = &config.remapper_jar {
        let mut engine = TinyRemapperEngine::new(config.java(), jar.clone());
        if let Some(threads) = config.remapper_threads {
            engine = engine.with_threads(threads);
        }
        setup = setup.with_engine(Arc::new(engine));
    }
    if let Some(mappings) = &config.mappings {
        setup = setup.with_mappings(Arc::new(TinyFileMappings::new(mappings.clone())));
    }
    Ok(setup)
}
