//! Classpath resolution and game jar lookup.

use crate::config::HostEnvironment;
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Classpath handed to the remap engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySet {
    pub paths: Vec<Utf8PathBuf>,
    /// Index of the entry substituted with the reference game jar.
    pub game_slot: Option<usize>,
}

impl LibrarySet {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// The jar the game was launched from.
pub fn launch_jar(host: &HostEnvironment) -> Result<&Utf8Path> {
    host.game_context_jars
        .first()
        .map(Utf8PathBuf::as_path)
        .ok_or(Error::NoGameContext)
}

/// Collect the host's load-time dependencies that exist on disk.
///
/// When running from source the launch jar carries human-readable names and
/// would confuse the engine, so it is swapped for `game_jar`. Not finding it
/// is an error.
pub fn resolve_libraries(host: &HostEnvironment, game_jar: &Utf8Path) -> Result<LibrarySet> {
    let mut paths: Vec<Utf8PathBuf> = host
        .load_time_dependencies
        .iter()
        .filter(|path| path.exists())
        .cloned()
        .collect();

    let game_slot = if host.development {
        let launch = launch_jar(host)?;
        let Some(slot) = paths.iter().position(|path| path == launch) else {
            return Err(Error::GameJarNotOnClasspath {
                launch_jar: launch.to_path_buf(),
                candidates: paths,
            });
        };
        paths[slot] = game_jar.to_path_buf();
        Some(slot)
    } else {
        None
    };

    tracing::debug!("Resolved {} libraries (game slot {:?})", paths.len(), game_slot);
    Ok(LibrarySet { paths, game_slot })
}

/// Find the game jar in the artifact's source namespace.
///
/// An existing `override_jar` wins. Otherwise the launch jar is used, except
/// in development where the official-names jar is looked up next to the launch
/// jar and then next to its parent directory.
pub fn locate_game_jar(
    host: &HostEnvironment,
    override_jar: Option<&Utf8Path>,
) -> Result<Utf8PathBuf> {
    if let Some(jar) = override_jar {
        if jar.exists() {
            tracing::info!("Using supplied game jar {}", jar);
            return Ok(jar.to_path_buf());
        }
        tracing::warn!("Supplied game jar {} doesn't exist, falling back", jar);
    }

    let launch = launch_jar(host)?;
    if !host.development {
        return Ok(launch.to_path_buf());
    }

    let file_name = format!("minecraft-{}-client.jar", host.game_version);
    let parent = launch.parent().unwrap_or(Utf8Path::new(""));
    let mut tried = vec![parent.join(&file_name)];
    if let Some(grandparent) = parent.parent() {
        tried.push(grandparent.join(&file_name));
    }

    match tried.iter().find(|candidate| candidate.exists()) {
        Some(found) => {
            tracing::debug!("Found official game jar {}", found);
            Ok(found.clone())
        }
        None => Err(Error::GameJarNotFound { tried }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::tests::utf8_dir;
    use std::fs;

    fn host(root: &Utf8Path, development: bool) -> HostEnvironment {
        HostEnvironment {
            runtime_namespace: "named".to_string(),
            development,
            game_version: "1.16.5".to_string(),
            game_dir: root.to_path_buf(),
            game_context_jars: vec![root.join("mapped/minecraft-named.jar")],
            load_time_dependencies: vec![
                root.join("libs/a.jar"),
                root.join("libs/missing.jar"),
                root.join("mapped/minecraft-named.jar"),
            ],
        }
    }

    fn touch(path: &Utf8Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"jar").unwrap();
    }

    #[test]
    fn test_missing_libraries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        touch(&root.join("libs/a.jar"));
        touch(&root.join("mapped/minecraft-named.jar"));

        let libraries = resolve_libraries(&host(&root, false), &root.join("official.jar")).unwrap();
        assert_eq!(
            libraries.paths,
            vec![root.join("libs/a.jar"), root.join("mapped/minecraft-named.jar")]
        );
        assert_eq!(libraries.game_slot, None);
    }

    #[test]
    fn test_development_substitutes_game_jar() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        touch(&root.join("libs/a.jar"));
        touch(&root.join("mapped/minecraft-named.jar"));

        let official = root.join("minecraft-1.16.5-client.jar");
        let libraries = resolve_libraries(&host(&root, true), &official).unwrap();
        assert_eq!(libraries.paths, vec![root.join("libs/a.jar"), official]);
        assert_eq!(libraries.game_slot, Some(1));
    }

    #[test]
    fn test_development_requires_launch_jar_on_classpath() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        touch(&root.join("libs/a.jar"));

        let err = resolve_libraries(&host(&root, true), &root.join("official.jar")).unwrap_err();
        match err {
            Error::GameJarNotOnClasspath { launch_jar, candidates } => {
                assert_eq!(launch_jar, root.join("mapped/minecraft-named.jar"));
                assert_eq!(candidates, vec![root.join("libs/a.jar")]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_no_game_context() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let mut host = host(&root, true);
        host.game_context_jars.clear();

        assert!(matches!(locate_game_jar(&host, None), Err(Error::NoGameContext)));
        assert!(matches!(
            resolve_libraries(&host, &root.join("official.jar")),
            Err(Error::NoGameContext)
        ));
    }

    #[test]
    fn test_locate_prefers_existing_override() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let supplied = root.join("supplied.jar");
        touch(&supplied);

        let host = host(&root, false);
        assert_eq!(locate_game_jar(&host, Some(&supplied)).unwrap(), supplied);
        assert_eq!(
            locate_game_jar(&host, Some(&root.join("gone.jar"))).unwrap(),
            root.join("mapped/minecraft-named.jar")
        );
    }

    #[test]
    fn test_locate_development_jar() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let host = host(&root, true);

        let err = locate_game_jar(&host, None).unwrap_err();
        match err {
            Error::GameJarNotFound { tried } => assert_eq!(
                tried,
                vec![
                    root.join("mapped/minecraft-1.16.5-client.jar"),
                    root.join("minecraft-1.16.5-client.jar"),
                ]
            ),
            other => panic!("unexpected error {other:?}"),
        }

        touch(&root.join("minecraft-1.16.5-client.jar"));
        assert_eq!(
            locate_game_jar(&host, None).unwrap(),
            root.join("minecraft-1.16.5-client.jar")
        );

        touch(&root.join("mapped/minecraft-1.16.5-client.jar"));
        assert_eq!(
            locate_game_jar(&host, None).unwrap(),
            root.join("mapped/minecraft-1.16.5-client.jar")
        );
    }
}
