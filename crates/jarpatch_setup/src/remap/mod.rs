//! Two-pass symbol remapping.
//!
//! The first pass runs within the artifact's own namespace and only renames
//! lambdas to the names the reference jar uses. The second pass moves every
//! symbol from the artifact's namespace to the runtime namespace using the
//! mapping tree, with the override table layered on top.
//!
//! The remapping itself is delegated to a [`RemapEngine`].

mod engine;
mod provider;

pub use engine::TinyRemapperEngine;
pub use provider::{MappingProvider, TinyFileMappings};

use crate::error::{Error, Result};
use crate::jar::remove_if_exists;
use crate::lambda::LambdaCorrespondence;
use crate::pipeline::SetupStage;
use camino::{Utf8Path, Utf8PathBuf};
use jarpatch_mappings::{MappingSet, MappingTree, ResolvedOverride};
use thiserror::Error;

/// One invocation of a [`RemapEngine`].
#[derive(Debug, Clone, Copy)]
pub struct RemapRequest<'a> {
    pub input: &'a Utf8Path,
    pub output: &'a Utf8Path,
    /// Jars the engine may consult for inheritance, never rewritten.
    pub classpath: &'a [Utf8PathBuf],
    pub mappings: &'a MappingSet,
    pub from: &'a str,
    pub to: &'a str,
    pub rename_invalid_locals: bool,
}

/// Failure reported by a [`RemapEngine`].
#[derive(Error, Debug)]
#[error("{message}")]
pub struct RemapEngineError {
    message: String,
}

impl RemapEngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for RemapEngineError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Rewrites a jar according to a flat mapping set.
pub trait RemapEngine: Send + Sync {
    fn remap(&self, request: &RemapRequest<'_>) -> std::result::Result<(), RemapEngineError>;
}

/// Pass 2 mappings: the tree flattened from `from` to `to`, overrides last.
pub fn namespace_mappings(
    tree: &MappingTree,
    from: &str,
    to: &str,
    overrides: &[ResolvedOverride],
) -> Result<MappingSet> {
    let mut mappings = MappingSet::from_tree(tree, from, to)?;
    mappings.apply_overrides(overrides);
    tracing::debug!(
        "Built {} -> {} mappings with {} entries ({} overrides)",
        from,
        to,
        mappings.len(),
        overrides.len()
    );
    Ok(mappings)
}

pub struct TwoPassRemapper<'e> {
    engine: &'e dyn RemapEngine,
    rename_invalid_locals: bool,
}

impl<'e> TwoPassRemapper<'e> {
    pub fn new(engine: &'e dyn RemapEngine) -> Self {
        Self {
            engine,
            rename_invalid_locals: false,
        }
    }

    pub fn with_rename_invalid_locals(mut self, rename: bool) -> Self {
        self.rename_invalid_locals = rename;
        self
    }

    /// Pass 1: rename lambdas within `namespace`.
    pub fn lambda_pass(
        &self,
        input: &Utf8Path,
        output: &Utf8Path,
        classpath: &[Utf8PathBuf],
        correspondence: LambdaCorrespondence,
        namespace: &str,
    ) -> Result<()> {
        let mappings = correspondence.into_mapping_set();
        self.run_pass(
            SetupStage::RemapPass1,
            &RemapRequest {
                input,
                output,
                classpath,
                mappings: &mappings,
                from: namespace,
                to: namespace,
                rename_invalid_locals: self.rename_invalid_locals,
            },
        )
    }

    /// Pass 2: move every symbol from `from` to `to`.
    pub fn namespace_pass(
        &self,
        input: &Utf8Path,
        output: &Utf8Path,
        classpath: &[Utf8PathBuf],
        mappings: &MappingSet,
        from: &str,
        to: &str,
    ) -> Result<()> {
        self.run_pass(
            SetupStage::RemapPass2,
            &RemapRequest {
                input,
                output,
                classpath,
                mappings,
                from,
                to,
                rename_invalid_locals: self.rename_invalid_locals,
            },
        )
    }

    /// Run the engine once. A failed pass leaves no output behind.
    pub fn run_pass(&self, stage: SetupStage, request: &RemapRequest<'_>) -> Result<()> {
        remove_if_exists(request.output)?;

        tracing::info!(
            "{:?}: {} -> {} ({} -> {})",
            stage,
            request.input,
            request.output,
            request.from,
            request.to
        );

        if let Err(e) = self.engine.remap(request) {
            remove_if_exists(request.output)?;
            return Err(Error::collaborator(stage, request.input, e.message()));
        }
        if !request.output.exists() {
            return Err(Error::collaborator(
                stage,
                request.input,
                format!("engine finished without producing {}", request.output),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::jar::tests::utf8_dir;
    use jarpatch_mappings::{default_overrides, resolve_overrides, Member};
    use std::sync::Mutex;

    /// What a [`FakeEngine`] was asked to do.
    #[derive(Debug, Clone)]
    pub(crate) struct RecordedPass {
        pub from: String,
        pub to: String,
        pub mappings: MappingSet,
        pub classpath: Vec<Utf8PathBuf>,
    }

    /// Copies the input to the output and records the request.
    #[derive(Default)]
    pub(crate) struct FakeEngine {
        pub passes: Mutex<Vec<RecordedPass>>,
        /// Fail the pass with this index after writing a partial output.
        pub fail_on: Option<usize>,
    }

    impl FakeEngine {
        pub(crate) fn calls(&self) -> usize {
            self.passes.lock().unwrap().len()
        }
    }

    impl RemapEngine for FakeEngine {
        fn remap(&self, request: &RemapRequest<'_>) -> std::result::Result<(), RemapEngineError> {
            let mut passes = self.passes.lock().unwrap();
            let index = passes.len();
            passes.push(RecordedPass {
                from: request.from.to_string(),
                to: request.to.to_string(),
                mappings: request.mappings.clone(),
                classpath: request.classpath.to_vec(),
            });
            if self.fail_on == Some(index) {
                std::fs::write(request.output, b"partial")?;
                return Err(RemapEngineError::new("engine exploded"));
            }
            std::fs::copy(request.input, request.output)?;
            Ok(())
        }
    }

    /// Reports success without writing anything.
    struct SilentEngine;

    impl RemapEngine for SilentEngine {
        fn remap(&self, _: &RemapRequest<'_>) -> std::result::Result<(), RemapEngineError> {
            Ok(())
        }
    }

    const TREE: &str = "v1\tofficial\tintermediary\tnamed
CLASS\tdsa$a\tnet/minecraft/class_846$class_851\tnet/minecraft/Renderer$Chunk
CLASS\tdsa$a$a\tnet/minecraft/class_846$class_851$class_4578\tnet/minecraft/Renderer$Chunk$Task
FIELD\tdsa$a$a\tLdsa$a;\tthis$1\tfield_20839\tchunk
CLASS\tfoo\tnet/minecraft/class_1\tnet/minecraft/Thing
";

    #[test]
    fn test_failed_pass_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let input = root.join("in.jar");
        let output = root.join("out.jar");
        std::fs::write(&input, b"jar").unwrap();

        let engine = FakeEngine {
            fail_on: Some(0),
            ..Default::default()
        };
        let err = TwoPassRemapper::new(&engine)
            .lambda_pass(&input, &output, &[], LambdaCorrespondence::default(), "official")
            .unwrap_err();

        match err {
            Error::Collaborator { stage, input: failed, message } => {
                assert_eq!(stage, SetupStage::RemapPass1);
                assert_eq!(failed, input);
                assert_eq!(message, "engine exploded");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_stale_output_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let input = root.join("in.jar");
        let output = root.join("out.jar");
        std::fs::write(&input, b"fresh").unwrap();
        std::fs::write(&output, b"stale").unwrap();

        let engine = FakeEngine::default();
        TwoPassRemapper::new(&engine)
            .namespace_pass(&input, &output, &[], &MappingSet::new(), "official", "intermediary")
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"fresh");
        assert_eq!(engine.passes.lock().unwrap()[0].to, "intermediary");
    }

    #[test]
    fn test_missing_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let input = root.join("in.jar");
        std::fs::write(&input, b"jar").unwrap();

        let err = TwoPassRemapper::new(&SilentEngine)
            .namespace_pass(
                &input,
                &root.join("out.jar"),
                &[],
                &MappingSet::new(),
                "official",
                "named",
            )
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Collaborator);
    }

    #[test]
    fn test_lambda_pass_stays_in_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let input = root.join("in.jar");
        std::fs::write(&input, b"jar").unwrap();

        let mut renames = MappingSet::new();
        renames.insert_method(Member::new("a", "lambda$run$3", "()V"), "lambda$run$0");
        let engine = FakeEngine::default();
        let classpath = vec![root.join("lib.jar")];
        TwoPassRemapper::new(&engine)
            .run_pass(
                SetupStage::RemapPass1,
                &RemapRequest {
                    input: &input,
                    output: &root.join("out.jar"),
                    classpath: &classpath,
                    mappings: &renames,
                    from: "official",
                    to: "official",
                    rename_invalid_locals: false,
                },
            )
            .unwrap();

        let pass = &engine.passes.lock().unwrap()[0];
        assert_eq!((pass.from.as_str(), pass.to.as_str()), ("official", "official"));
        assert_eq!(pass.classpath, classpath);
        assert_eq!(
            pass.mappings.map_method(&Member::new("a", "lambda$run$3", "()V")),
            "lambda$run$0"
        );
    }

    #[test]
    fn test_overrides_win_over_tree() {
        let tree = MappingTree::read_tiny(TREE.as_bytes()).unwrap();
        let overrides =
            resolve_overrides(default_overrides(), &tree, "official", "named", false).unwrap();
        let mappings = namespace_mappings(&tree, "official", "named", &overrides).unwrap();

        // The tree maps the synthetic outer reference to `chunk`.
        assert_eq!(
            mappings.map_field(&Member::new("dsa$a$a", "this$1", "Ldsa$a;")),
            "field_20839"
        );
        assert_eq!(mappings.map_class("foo"), "net/minecraft/Thing");
    }
}
