use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::{load_config, AppConfig};
use camino::Utf8PathBuf;
use colored::Colorize;
use jarpatch_setup::{ArtifactCache, VersionLayout};
use miette::Result;

pub struct CleanArgs {
    pub config: Option<Utf8PathBuf>,
    pub version: String,
}

pub fn clean_version(args: CleanArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let (root, removed) = remove_version_dir(&config, &args.version)?;

    if removed {
        println_pad!(
            "{} {}",
            "🧹 Removed:".bright_green().bold(),
            root.as_str().bright_white()
        );
    } else {
        println_pad!(
            "{} {}",
            "Nothing to remove at".dimmed(),
            root.as_str().bright_white()
        );
    }

    Ok(())
}

/// Only the work root is needed here, never the host environment.
fn remove_version_dir(config: &AppConfig, version: &str) -> Result<(Utf8PathBuf, bool), CliError> {
    let layout = VersionLayout::new(&config.setup_config()?.work_root, version);
    let root = layout.root().to_path_buf();
    let removed = ArtifactCache::new(layout).clear()?;
    Ok((root, removed))
}
