use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    clean_version, hash_artifact, setup_artifact, status_artifact, CleanArgs, HashArgs, SetupArgs,
    StatusArgs,
};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The path to the configuration file (defaults to jarpatch.toml next to the executable)
    #[arg(short, long, global = true, env = "JARPATCH_CONFIG")]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transform a mod jar for the configured host, reusing the cache if possible
    Setup {
        /// The path to the mod jar
        jar: Utf8PathBuf,

        /// Version label used for the working directory (defaults to the file stem)
        #[arg(long = "label", value_name = "LABEL")]
        version: Option<String>,

        /// Unpack the final classes into the version directory for inspection
        #[arg(long, env = "JARPATCH_EXTRACT")]
        extract: bool,

        /// Use this jar as the official-names game jar
        #[arg(long, env = "JARPATCH_GAME_JAR")]
        game_jar: Option<Utf8PathBuf>,
    },
    /// Print the identity of a mod jar
    Hash {
        /// The path to the mod jar
        jar: Utf8PathBuf,
    },
    /// Show whether a mod jar has an up-to-date cached artifact
    Status {
        /// The path to the mod jar
        jar: Utf8PathBuf,

        /// Version label used for the working directory (defaults to the file stem)
        #[arg(long = "label", value_name = "LABEL")]
        version: Option<String>,
    },
    /// Delete the working directory of a version
    Clean {
        /// The version label
        version: String,
    },
}

fn parse_args() -> Result<Args> {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).map_err(|e| miette::miette!("{}", e))
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jarpatch=info,jarpatch_setup=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let args = parse_args()?;
    let config = args.config;

    match args.command {
        Commands::Setup {
            jar,
            version,
            extract,
            game_jar,
        } => setup_artifact(SetupArgs {
            config,
            jar,
            version,
            extract,
            game_jar,
        }),
        Commands::Hash { jar } => hash_artifact(HashArgs { jar }),
        Commands::Status { jar, version } => status_artifact(StatusArgs {
            config,
            jar,
            version,
        }),
        Commands::Clean { version } => clean_version(CleanArgs { config, version }),
    }
}
