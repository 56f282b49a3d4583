//! Host environment and setup configuration.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// What the host loader reports about the running game.
///
/// Passed explicitly at construction; nothing in this crate reads process
/// globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEnvironment {
    /// Namespace the host runs the game in, e.g. `intermediary` or `named`.
    pub runtime_namespace: String,
    /// Running from source with human-readable names.
    #[serde(default)]
    pub development: bool,
    pub game_version: String,
    pub game_dir: Utf8PathBuf,
    /// Jars that make up the game; the first one is the launch jar.
    #[serde(default)]
    pub game_context_jars: Vec<Utf8PathBuf>,
    /// Everything on the host's load-time classpath.
    #[serde(default)]
    pub load_time_dependencies: Vec<Utf8PathBuf>,
}

/// Class name prefixes that drive filtering and patch splitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceRules {
    /// Namespace the artifact was compiled against.
    pub source_namespace: String,
    /// Entries under these prefixes are dropped before remapping.
    pub reserved_prefixes: Vec<String>,
    /// Under these prefixes only deeply nested classes are dropped.
    pub guarded_prefixes: Vec<String>,
    /// Longest nested-class suffix kept under a guarded prefix.
    pub max_nested_suffix: usize,
    /// Classes under these prefixes become class patches.
    pub patch_prefixes: Vec<String>,
}

impl Default for NamespaceRules {
    fn default() -> Self {
        Self {
            source_namespace: "official".to_string(),
            reserved_prefixes: vec!["srg/".to_string(), "net/minecraft/".to_string()],
            guarded_prefixes: vec!["com/mojang/blaze3d/platform/".to_string()],
            max_nested_suffix: 2,
            patch_prefixes: vec!["net/minecraft/".to_string(), "com/mojang/".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Parent of the per-version working directories.
    pub work_root: Utf8PathBuf,
    /// Unpack the final classes into `classes/` for inspection.
    #[serde(default)]
    pub extract_classes: bool,
    /// Use this jar as the official-names game reference instead of locating it.
    #[serde(default)]
    pub game_jar_override: Option<Utf8PathBuf>,
    #[serde(default)]
    pub rules: NamespaceRules,
}

impl SetupConfig {
    pub fn new(work_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
            extract_classes: false,
            game_jar_override: None,
            rules: NamespaceRules::default(),
        }
    }

    /// Default layout: `<game_dir>/.optifine`.
    pub fn for_game_dir(game_dir: &Utf8Path) -> Self {
        Self::new(game_dir.join(".optifine"))
    }

    pub fn with_extract_classes(mut self, extract: bool) -> Self {
        self.extract_classes = extract;
        self
    }

    pub fn with_game_jar_override(mut self, game_jar: Option<Utf8PathBuf>) -> Self {
        self.game_jar_override = game_jar;
        self
    }
}
