use super::{build_setup, discover_input};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use camino::Utf8PathBuf;
use colored::Colorize;
use jarpatch_setup::CacheStatus;
use miette::Result;

pub struct StatusArgs {
    pub config: Option<Utf8PathBuf>,
    pub jar: Utf8PathBuf,
    pub version: Option<String>,
}

pub fn status_artifact(args: StatusArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let input = discover_input(&args.jar, args.version)?;
    let status = build_setup(&config, false, None)?
        .status(&input)
        .map_err(CliError::from)?;

    println_pad!(
        "{} {} {}",
        "📦 Artifact:".bright_blue().bold(),
        status.identity.version.bright_cyan().bold(),
        format!("({})", status.identity.hash).dimmed()
    );
    println_pad!(
        "{} {}",
        "📁 Directory:".bright_yellow(),
        status.layout.root().as_str().bright_white()
    );

    match (status.cache, status.record) {
        (CacheStatus::Hit, Some(record)) => {
            println_pad!(
                "{} {}",
                "🗃️ Cache:".bright_magenta(),
                "up to date".bright_green().bold()
            );
            println_pad!(
                "{} {}",
                "🧩 Class patches:".bright_yellow(),
                record.patches.len().to_string().bright_white()
            );
        }
        (CacheStatus::Stale, _) => println_pad!(
            "{} {}",
            "🗃️ Cache:".bright_magenta(),
            "stale, will be rebuilt".bright_yellow()
        ),
        _ => println_pad!(
            "{} {}",
            "🗃️ Cache:".bright_magenta(),
            "empty".bright_yellow()
        ),
    }

    Ok(())
}
