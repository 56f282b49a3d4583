//! Configuration file handling.

use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use jarpatch_setup::{HostEnvironment, SetupConfig};
use serde::Deserialize;
use std::env;
use std::fs;
use walkdir::WalkDir;

pub const CONFIG_FILE_NAME: &str = "jarpatch.toml";

/// Application configuration stored in jarpatch.toml.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub game_dir: Option<Utf8PathBuf>,
    /// Defaults to `<game_dir>/.optifine`.
    pub work_root: Option<Utf8PathBuf>,
    pub java: Option<Utf8PathBuf>,
    pub remapper_jar: Option<Utf8PathBuf>,
    pub remapper_threads: Option<usize>,
    pub mappings: Option<Utf8PathBuf>,
    pub host: HostConfig,
}

/// The `[host]` table.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HostConfig {
    pub runtime_namespace: String,
    pub development: bool,
    pub game_version: String,
    pub game_context_jars: Vec<Utf8PathBuf>,
    pub libraries: Vec<Utf8PathBuf>,
    /// Scanned recursively for `*.jar` files.
    pub library_dirs: Vec<Utf8PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            runtime_namespace: "intermediary".to_string(),
            development: false,
            game_version: String::new(),
            game_context_jars: Vec::new(),
            libraries: Vec::new(),
            library_dirs: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn game_dir(&self) -> Result<&Utf8Path, CliError> {
        self.game_dir
            .as_deref()
            .ok_or(CliError::missing_setting("game_dir"))
    }

    pub fn java(&self) -> Utf8PathBuf {
        self.java.clone().unwrap_or_else(|| Utf8PathBuf::from("java"))
    }

    pub fn host_environment(&self) -> Result<HostEnvironment, CliError> {
        let mut load_time_dependencies = self.host.libraries.clone();
        for dir in &self.host.library_dirs {
            load_time_dependencies.extend(collect_jars(dir));
        }

        Ok(HostEnvironment {
            runtime_namespace: self.host.runtime_namespace.clone(),
            development: self.host.development,
            game_version: self.host.game_version.clone(),
            game_dir: self.game_dir()?.to_path_buf(),
            game_context_jars: self.host.game_context_jars.clone(),
            load_time_dependencies,
        })
    }

    pub fn setup_config(&self) -> Result<SetupConfig, CliError> {
        Ok(match &self.work_root {
            Some(work_root) => SetupConfig::new(work_root.clone()),
            None => SetupConfig::for_game_dir(self.game_dir()?),
        })
    }
}

/// Every `*.jar` below `dir`, in a stable order. Unreadable entries are skipped.
pub fn collect_jars(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut jars: Vec<Utf8PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .filter(|path| path.extension() == Some("jar"))
        .collect();
    jars.sort();
    jars
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (jarpatch.toml next to the executable).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Load `path`, or the default configuration file if none was given.
///
/// A missing default file yields the default configuration; a missing
/// explicit file is an error.
pub fn load_config(path: Option<&Utf8Path>) -> Result<AppConfig, CliError> {
    let path = match path {
        Some(path) if !path.exists() => return Err(CliError::config_not_found(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                return Ok(AppConfig::default());
            }
        },
    };

    let content = fs::read_to_string(&path).map_err(|e| CliError::Io {
        message: format!("failed to read {path}: {e}"),
    })?;
    let config = toml::from_str(&content)
        .map_err(|source| CliError::ConfigParseError { path: path.clone(), source })?;
    tracing::debug!("Loaded configuration from {}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn parses_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
game_dir = "/games/minecraft"
java = "/usr/bin/java"
remapper_jar = "tiny-remapper.jar"
mappings = "mappings.tiny"

[host]
runtime_namespace = "named"
development = true
game_version = "1.16.5"
game_context_jars = ["/games/minecraft/mapped.jar"]
libraries = ["/games/minecraft/mapped.jar"]
"#,
        )
        .unwrap();

        assert_eq!(config.java(), "/usr/bin/java");
        let host = config.host_environment().unwrap();
        assert_eq!(host.runtime_namespace, "named");
        assert!(host.development);
        assert_eq!(host.load_time_dependencies.len(), 1);
        assert_eq!(
            config.setup_config().unwrap().work_root,
            "/games/minecraft/.optifine"
        );
    }

    #[test]
    fn defaults_without_game_dir() {
        let config = AppConfig::default();
        assert_eq!(config.host.runtime_namespace, "intermediary");
        assert_eq!(config.java(), "java");
        assert!(matches!(
            config.host_environment(),
            Err(CliError::MissingSetting { key: "game_dir" })
        ));
    }

    #[test]
    fn library_dirs_are_scanned() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        fs::create_dir_all(root.join("libs/nested")).unwrap();
        fs::write(root.join("libs/b.jar"), b"").unwrap();
        fs::write(root.join("libs/nested/a.jar"), b"").unwrap();
        fs::write(root.join("libs/readme.txt"), b"").unwrap();

        assert_eq!(
            collect_jars(&root.join("libs")),
            vec![root.join("libs/b.jar"), root.join("libs/nested/a.jar")]
        );
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);

        let missing = root.join("jarpatch.toml");
        assert!(matches!(
            load_config(Some(missing.as_path())),
            Err(CliError::ConfigNotFound { .. })
        ));

        fs::write(&missing, "game_dir = [").unwrap();
        assert!(matches!(
            load_config(Some(missing.as_path())),
            Err(CliError::ConfigParseError { .. })
        ));

        fs::write(&missing, "game_dir = \"/games\"\n").unwrap();
        let config = load_config(Some(missing.as_path())).unwrap();
        assert_eq!(config.game_dir().unwrap(), Utf8Path::new("/games"));
    }
}
