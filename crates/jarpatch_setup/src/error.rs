//! Error types for artifact setup.
//!
//! All fallible functions in this crate return [`Result<T>`]. External error
//! types (`std::io::Error`, zip, class file and mapping errors) convert via
//! `From`. [`Error::kind`] folds every variant into the closed set the host
//! reacts to.

use crate::pipeline::SetupStage;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (hashing, copying jars, writing the cache).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A jar could not be read or written.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Class file error: {0}")]
    ClassFile(#[from] jarpatch_classfile::ClassFileError),

    #[error("Mapping error: {0}")]
    Mappings(#[from] jarpatch_mappings::MappingError),

    /// The patch metadata file is corrupt. Only surfaces inside cache loading.
    #[error("Corrupt patch cache: {0}")]
    Cache(String),

    /// An external collaborator (payload extractor, remapper) failed.
    #[error("{stage:?} failed for {input}: {message}")]
    Collaborator {
        stage: SetupStage,
        input: Utf8PathBuf,
        message: String,
    },

    /// In development mode the launch jar must be one of the load-time dependencies.
    #[error("Game jar {launch_jar} is not among the load-time dependencies: {candidates:?}")]
    GameJarNotOnClasspath {
        launch_jar: Utf8PathBuf,
        candidates: Vec<Utf8PathBuf>,
    },

    /// No official-names game jar was found next to the launch jar.
    #[error("Could not find the game jar, tried: {tried:?}")]
    GameJarNotFound { tried: Vec<Utf8PathBuf> },

    /// The host did not report any game context jars.
    #[error("No game context: the host reported no game jars")]
    NoGameContext,

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// The categories a caller can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An external tool failed or produced nothing.
    Collaborator,
    /// The host environment or configuration is unusable.
    Configuration,
    /// Reading or writing files failed.
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Zip(_) | Error::ClassFile(_) | Error::Cache(_) => ErrorKind::Io,
            Error::Collaborator { .. } => ErrorKind::Collaborator,
            Error::Mappings(jarpatch_mappings::MappingError::Io(_)) => ErrorKind::Io,
            Error::Mappings(_)
            | Error::GameJarNotOnClasspath { .. }
            | Error::GameJarNotFound { .. }
            | Error::NoGameContext
            | Error::Configuration(_) => ErrorKind::Configuration,
        }
    }

    pub(crate) fn collaborator(
        stage: SetupStage,
        input: impl Into<Utf8PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Error::Collaborator {
            stage,
            input: input.into(),
            message: message.into(),
        }
    }
}
