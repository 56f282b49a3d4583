use camino::Utf8PathBuf;
use jarpatch_setup::{ErrorKind, SetupStage};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(config::not_found),
        help("Create a jarpatch.toml next to the executable or pass --config")
    )]
    ConfigNotFound { path: Utf8PathBuf },

    #[error("Configuration file error in {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Check your jarpatch.toml file for syntax errors")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Missing setting: {key}")]
    #[diagnostic(code(config::missing_setting), help("Set `{key}` in jarpatch.toml"))]
    MissingSetting { key: &'static str },

    #[error("File not found: {path}")]
    #[diagnostic(
        code(file::not_found),
        help("Make sure the file exists and the path is correct")
    )]
    FileNotFound { path: Utf8PathBuf },

    #[error("{stage:?} failed for {input}")]
    #[diagnostic(code(setup::collaborator_failed), help("{message}"))]
    Collaborator {
        stage: SetupStage,
        input: Utf8PathBuf,
        message: String,
    },

    #[error("{message}")]
    #[diagnostic(
        code(setup::environment),
        help("Check the [host] table and the paths in jarpatch.toml")
    )]
    Environment { message: String },

    #[error("{message}")]
    #[diagnostic(code(io::operation_failed))]
    Io { message: String },
}

impl CliError {
    pub fn config_not_found(path: Utf8PathBuf) -> Self {
        Self::ConfigNotFound { path }
    }

    pub fn missing_setting(key: &'static str) -> Self {
        Self::MissingSetting { key }
    }

    pub fn file_not_found(path: Utf8PathBuf) -> Self {
        Self::FileNotFound { path }
    }
}

impl From<jarpatch_setup::Error> for CliError {
    fn from(error: jarpatch_setup::Error) -> Self {
        match error {
            jarpatch_setup::Error::Collaborator {
                stage,
                input,
                message,
            } => Self::Collaborator {
                stage,
                input,
                message,
            },
            other => match other.kind() {
                ErrorKind::Configuration => Self::Environment {
                    message: other.to_string(),
                },
                ErrorKind::Collaborator | ErrorKind::Io => Self::Io {
                    message: other.to_string(),
                },
            },
        }
    }
}
