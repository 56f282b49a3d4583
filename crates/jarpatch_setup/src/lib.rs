//! Content-addressed setup of obfuscated-namespace mod jars.
//!
//! A mod jar compiled against the game's official (obfuscated) names cannot
//! be loaded by a host running the game in another namespace. This crate
//! transforms such a jar once per distinct input and caches the result:
//!
//! - **Hash gate**: the input is hashed on every run; an unchanged input
//!   reuses the stored jar and class patches.
//! - **Installer payloads**: installer-wrapped jars are unpacked first.
//! - **Filtering**: entries that would shadow game classes are dropped.
//! - **Lambda reconciliation**: renumbered `lambda$` methods get the names the
//!   game jar uses, so namespace mappings apply to them.
//! - **Two-pass remapping** through a pluggable [`RemapEngine`].
//! - **Class patches**: game classes the mod replaces are split out of the
//!   final jar and stored next to it.
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use jarpatch_setup::{
//!     ArtifactSetup, HostEnvironment, InputArtifact, SetupConfig, TinyFileMappings,
//!     TinyRemapperEngine,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let host = HostEnvironment {
//!     runtime_namespace: "intermediary".to_string(),
//!     development: false,
//!     game_version: "1.16.5".to_string(),
//!     game_dir: ".minecraft".into(),
//!     game_context_jars: vec![".minecraft/versions/1.16.5/1.16.5.jar".into()],
//!     load_time_dependencies: Vec::new(),
//! };
//! let config = SetupConfig::for_game_dir(Utf8Path::new(".minecraft"));
//!
//! let setup = ArtifactSetup::new(config, host)
//!     .with_engine(Arc::new(TinyRemapperEngine::new("java", "tiny-remapper.jar")))
//!     .with_mappings(Arc::new(TinyFileMappings::new("mappings.tiny")))
//!     .with_progress(|progress| println!("{:?}", progress.stage));
//!
//! let outcome = setup.run(&InputArtifact::discover("mods/OptiFine_1.16.5_HD_U_G8.jar")?)?;
//! println!("{} ({:?}), {} patches", outcome.artifact, outcome.cache, outcome.patches.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod hash;
pub mod identity;
pub mod jar;
pub mod lambda;
pub mod libraries;
pub mod normalize;
pub mod pipeline;
mod process;
pub mod remap;

pub use cache::{ArtifactCache, CacheCheck, CacheRecord, PatchSet, VersionLayout};
pub use config::{HostEnvironment, NamespaceRules, SetupConfig};
pub use error::{Error, ErrorKind, Result};
pub use filter::{filter_jar, EntryFilter, FilterStats};
pub use hash::{hash_bytes, hash_file, ContentHash};
pub use identity::{ArtifactIdentity, ArtifactVariant, InputArtifact};
pub use lambda::{
    BodyMatcher, CallSiteMatcher, ChainMatcher, LambdaCorrespondence, LambdaMatcher,
    LambdaReconciler,
};
pub use libraries::{locate_game_jar, resolve_libraries, LibrarySet};
pub use normalize::{normalize_payload, JavaPatcherExtractor, Normalized, PayloadExtractor};
pub use pipeline::{
    ArtifactSetup, CacheStatus, SetupOutcome, SetupProgress, SetupStage, SetupStatus,
};
pub use remap::{
    namespace_mappings, MappingProvider, RemapEngine, RemapEngineError, RemapRequest,
    TinyFileMappings, TinyRemapperEngine, TwoPassRemapper,
};
