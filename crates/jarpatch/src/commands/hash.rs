use super::discover_input;
use crate::println_pad;
use camino::Utf8PathBuf;
use colored::Colorize;
use jarpatch_setup::ArtifactIdentity;
use miette::Result;

pub struct HashArgs {
    pub jar: Utf8PathBuf,
}

pub fn hash_artifact(args: HashArgs) -> Result<()> {
    let input = discover_input(&args.jar, None)?;
    let identity = ArtifactIdentity::compute(&input).map_err(crate::errors::CliError::from)?;

    println_pad!(
        "{} {}",
        "📦 Artifact:".bright_blue().bold(),
        input.path.as_str().bright_cyan().bold()
    );
    println_pad!(
        "{} {}",
        "🏷️ Version:".bright_green(),
        identity.version.bright_white().bold()
    );
    println_pad!(
        "{} {}",
        "🧩 Variant:".bright_yellow(),
        identity.variant.to_string().bright_white()
    );
    println_pad!(
        "{} {}",
        "#️⃣ Hash:".bright_magenta(),
        identity.hash.to_string().bright_white().bold()
    );

    Ok(())
}
