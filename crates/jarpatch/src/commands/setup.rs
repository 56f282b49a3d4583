use super::{build_setup, discover_input};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use crate::utils::format_bytes;
use camino::Utf8PathBuf;
use colored::Colorize;
use jarpatch_setup::CacheStatus;
use miette::Result;

pub struct SetupArgs {
    pub config: Option<Utf8PathBuf>,
    pub jar: Utf8PathBuf,
    pub version: Option<String>,
    pub extract: bool,
    pub game_jar: Option<Utf8PathBuf>,
}

pub fn setup_artifact(args: SetupArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let input = discover_input(&args.jar, args.version)?;
    let setup = build_setup(&config, args.extract, args.game_jar)?.with_progress(|progress| {
        tracing::debug!("Stage: {:?} ({})", progress.stage, progress.version);
    });

    println_pad!(
        "{} {}",
        "🔧 Setting up:".bright_blue().bold(),
        input.path.as_str().bright_cyan().bold()
    );

    let outcome = setup.run(&input).map_err(CliError::from)?;

    let cache = match outcome.cache {
        CacheStatus::Hit => "reused cached artifact".bright_green(),
        CacheStatus::Cold => "built".bright_yellow(),
        CacheStatus::Stale => "rebuilt (input changed)".bright_yellow(),
    };
    println_pad!("{} {}", "🗃️ Cache:".bright_magenta(), cache);
    println_pad!(
        "{} {}",
        "📁 Artifact:".bright_yellow(),
        outcome.artifact.as_str().bright_white().bold()
    );
    println_pad!(
        "{} {} ({})",
        "🧩 Class patches:".bright_yellow(),
        outcome.patches.len().to_string().bright_white().bold(),
        format_bytes(outcome.patches.byte_size())
    );
    println_pad!(
        "{} {:.2?}",
        "⏱️ Took:".bright_yellow(),
        outcome.build_time
    );
    if args.extract && outcome.cache != CacheStatus::Hit {
        let classes = setup.layout(&outcome.identity.version).classes_dir();
        println_pad!(
            "{} {}",
            "🔍 Classes extracted to:".bright_yellow(),
            classes.as_str().bright_white()
        );
    }
    println_pad!("{}", "✅ Setup complete!".bright_green().bold());

    Ok(())
}
