//! The setup orchestrator.
//!
//! [`ArtifactSetup`] turns an [`InputArtifact`] into a jar in the host's
//! runtime namespace plus the class patches split out of it.
//!
//! # Run
//!
//! 1. Hash the input and derive the version directory.
//! 2. Check the [`ArtifactCache`]. A valid record ends the run; nothing else
//!    is touched, not even the game jar.
//! 3. Locate the reference game jar and resolve the engine classpath. Both
//!    happen before anything is written.
//! 4. Load the mapping tree and build the pass 2 mappings.
//! 5. Extract the installer payload if needed, filter reserved entries, and
//!    reconcile lambda names against the game jar.
//! 6. Remap within the source namespace (lambda renames only), then into the
//!    runtime namespace.
//! 7. Split the class patches out of the final jar and store the cache record.
//! 8. Delete the intermediates. This also happens when a stage fails.
//! 9. Unpack the final classes when debug extraction is on.

use crate::cache::{ArtifactCache, CacheCheck, CacheRecord, PatchSet, VersionLayout};
use crate::config::{HostEnvironment, SetupConfig};
use crate::error::{Error, Result};
use crate::filter::{filter_jar, EntryFilter};
use crate::identity::{ArtifactIdentity, ArtifactVariant, InputArtifact};
use crate::jar::{self, remove_if_exists};
use crate::lambda::{ChainMatcher, LambdaMatcher, LambdaReconciler};
use crate::libraries::{locate_game_jar, resolve_libraries, LibrarySet};
use crate::normalize::{normalize_payload, JavaPatcherExtractor, PayloadExtractor};
use crate::remap::{namespace_mappings, MappingProvider, RemapEngine, TwoPassRemapper};
use camino::{Utf8Path, Utf8PathBuf};
use jarpatch_mappings::{default_overrides, resolve_overrides, MappingOverride, MappingSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stages of a setup run, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupStage {
    Hashing,
    CheckingCache,
    /// Extracting the mod jar from an installer.
    NormalizingPayload,
    Filtering,
    ReconcilingLambdas,
    /// Lambda renames within the source namespace.
    RemapPass1,
    /// Source namespace to runtime namespace.
    RemapPass2,
    BuildingPatchCache,
    Cleanup,
    /// Debug-only unpacking of the final classes.
    ExtractingClasses,
    Complete,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupProgress {
    pub stage: SetupStage,
    /// Version label of the artifact being set up.
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheStatus {
    /// The stored record was reused.
    Hit,
    /// No record existed.
    Cold,
    /// A record existed for different input and was rebuilt.
    Stale,
}

#[derive(Debug)]
pub struct SetupOutcome {
    /// The transformed jar, without the patch classes.
    pub artifact: Utf8PathBuf,
    pub patches: PatchSet,
    pub identity: ArtifactIdentity,
    pub cache: CacheStatus,
    pub build_time: Duration,
}

/// What [`ArtifactSetup::status`] found on disk.
#[derive(Debug)]
pub struct SetupStatus {
    pub identity: ArtifactIdentity,
    pub layout: VersionLayout,
    pub cache: CacheStatus,
    pub record: Option<CacheRecord>,
}

type ProgressCallback = Arc<dyn Fn(SetupProgress) + Send + Sync>;

/// Runs the setup pipeline for one host.
///
/// A remap engine and a mapping provider must be supplied before the first
/// cache miss; the payload extractor and lambda matcher have defaults.
pub struct ArtifactSetup {
    config: SetupConfig,
    host: HostEnvironment,
    engine: Option<Arc<dyn RemapEngine>>,
    extractor: Arc<dyn PayloadExtractor>,
    mappings: Option<Arc<dyn MappingProvider>>,
    matcher: Arc<dyn LambdaMatcher>,
    overrides: Vec<MappingOverride>,
    progress_callback: Option<ProgressCallback>,
}

impl ArtifactSetup {
    pub fn new(config: SetupConfig, host: HostEnvironment) -> Self {
        Self {
            config,
            host,
            engine: None,
            extractor: Arc::new(JavaPatcherExtractor::default()),
            mappings: None,
            matcher: Arc::new(ChainMatcher::default()),
            overrides: default_overrides().to_vec(),
            progress_callback: None,
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn RemapEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PayloadExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_mappings(mut self, mappings: Arc<dyn MappingProvider>) -> Self {
        self.mappings = Some(mappings);
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn LambdaMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replace the default override table.
    pub fn with_overrides(mut self, overrides: Vec<MappingOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Register a callback that receives [`SetupProgress`] at each stage.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(SetupProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    pub fn host(&self) -> &HostEnvironment {
        &self.host
    }

    pub fn layout(&self, version: &str) -> VersionLayout {
        VersionLayout::new(&self.config.work_root, version)
    }

    /// Produce the runtime-namespace jar for `input`, reusing the cache when
    /// the input is unchanged.
    pub fn run(&self, input: &InputArtifact) -> Result<SetupOutcome> {
        let start_time = Instant::now();
        let version = input.version.as_str();

        self.emit_progress(SetupStage::Hashing, version);
        let identity = ArtifactIdentity::compute(input)?;
        tracing::info!(
            "Setting up {} ({}) from {}, hash {}",
            identity.version,
            identity.variant,
            input.path,
            identity.hash
        );

        self.emit_progress(SetupStage::CheckingCache, version);
        let cache = ArtifactCache::new(self.layout(version));
        let status = match cache.check(identity.hash)? {
            CacheCheck::Valid(record) => {
                tracing::info!("Reusing cached artifact {}", record.artifact);
                self.emit_progress(SetupStage::Complete, version);
                return Ok(SetupOutcome {
                    artifact: record.artifact,
                    patches: record.patches,
                    identity,
                    cache: CacheStatus::Hit,
                    build_time: start_time.elapsed(),
                });
            }
            CacheCheck::Stale => {
                tracing::info!("Cached artifact is out of date, rebuilding");
                CacheStatus::Stale
            }
            CacheCheck::Cold => CacheStatus::Cold,
        };

        let record = self.rebuild(input, &identity, &cache)?;

        if self.config.extract_classes {
            self.emit_progress(SetupStage::ExtractingClasses, version);
            let classes_dir = cache.layout().classes_dir();
            let count = jar::extract_classes(&record.artifact, &classes_dir)?;
            tracing::info!("Extracted {} classes to {}", count, classes_dir);
        }

        self.emit_progress(SetupStage::Complete, version);
        let build_time = start_time.elapsed();
        tracing::info!("Setup of {} finished in {:?}", identity.version, build_time);

        Ok(SetupOutcome {
            artifact: record.artifact,
            patches: record.patches,
            identity,
            cache: status,
            build_time,
        })
    }

    /// Report the cache state for `input` without changing anything on disk.
    pub fn status(&self, input: &InputArtifact) -> Result<SetupStatus> {
        let identity = ArtifactIdentity::compute(input)?;
        let layout = self.layout(&input.version);
        let (cache, record) = match ArtifactCache::new(layout.clone()).inspect(identity.hash) {
            CacheCheck::Valid(record) => (CacheStatus::Hit, Some(record)),
            CacheCheck::Stale => (CacheStatus::Stale, None),
            CacheCheck::Cold => (CacheStatus::Cold, None),
        };
        Ok(SetupStatus {
            identity,
            layout,
            cache,
            record,
        })
    }

    /// Delete the version directory. Returns whether there was one.
    pub fn clean(&self, version: &str) -> Result<bool> {
        ArtifactCache::new(self.layout(version)).clear()
    }

    fn rebuild(
        &self,
        input: &InputArtifact,
        identity: &ArtifactIdentity,
        cache: &ArtifactCache,
    ) -> Result<CacheRecord> {
        let engine = self
            .engine
            .as_deref()
            .ok_or_else(|| Error::Configuration("no remap engine configured".to_string()))?;
        let provider = self
            .mappings
            .as_deref()
            .ok_or_else(|| Error::Configuration("no mappings configured".to_string()))?;

        let game_jar = locate_game_jar(&self.host, self.config.game_jar_override.as_deref())?;
        let libraries = resolve_libraries(&self.host, &game_jar)?;
        tracing::info!(
            "Reference game jar {}, {} libraries",
            game_jar,
            libraries.len()
        );

        let source = self.config.rules.source_namespace.as_str();
        let target = self.host.runtime_namespace.as_str();
        let tree = provider.load()?;
        let overrides =
            resolve_overrides(&self.overrides, &tree, source, target, self.host.development)?;
        let mappings = namespace_mappings(&tree, source, target, &overrides)?;

        let layout = cache.layout();
        layout.ensure()?;

        let transformed = self.transform(
            engine,
            input,
            layout,
            &game_jar,
            &libraries,
            &mappings,
            identity,
        );

        self.emit_progress(SetupStage::Cleanup, &identity.version);
        let cleaned = self.cleanup(input, layout, transformed.is_err());
        let patches = transformed?;
        cleaned?;

        cache.store(patches, identity.hash)
    }

    #[allow(clippy::too_many_arguments)]
    fn transform(
        &self,
        engine: &dyn RemapEngine,
        input: &InputArtifact,
        layout: &VersionLayout,
        game_jar: &Utf8Path,
        libraries: &LibrarySet,
        mappings: &MappingSet,
        identity: &ArtifactIdentity,
    ) -> Result<PatchSet> {
        let version = identity.version.as_str();
        let source = self.config.rules.source_namespace.as_str();
        let target = self.host.runtime_namespace.as_str();

        self.emit_progress(SetupStage::NormalizingPayload, version);
        let normalized = normalize_payload(self.extractor.as_ref(), input, layout, game_jar)?;

        self.emit_progress(SetupStage::Filtering, version);
        let filtered = layout.filtered_jar();
        filter_jar(
            &normalized.jar,
            &filtered,
            &EntryFilter::new(&self.config.rules),
        )?;

        self.emit_progress(SetupStage::ReconcilingLambdas, version);
        let correspondence =
            LambdaReconciler::new(self.matcher.as_ref()).reconcile(&filtered, game_jar)?;

        let remapper = TwoPassRemapper::new(engine)
            .with_rename_invalid_locals(self.host.development);

        self.emit_progress(SetupStage::RemapPass1, version);
        let lambda_fixed = layout.lambda_fixed_jar();
        remapper.lambda_pass(&filtered, &lambda_fixed, &libraries.paths, correspondence, source)?;

        self.emit_progress(SetupStage::RemapPass2, version);
        let mapped = layout.mapped_jar();
        remapper.namespace_pass(&lambda_fixed, &mapped, &libraries.paths, mappings, source, target)?;

        self.emit_progress(SetupStage::BuildingPatchCache, version);
        jar::split_patches(&mapped, &self.config.rules.patch_prefixes)
    }

    /// Delete the intermediates; after a failure also the final jar.
    fn cleanup(&self, input: &InputArtifact, layout: &VersionLayout, failed: bool) -> Result<()> {
        let mut intermediates = vec![layout.filtered_jar(), layout.lambda_fixed_jar()];
        if input.variant == ArtifactVariant::InstallerWrapped {
            intermediates.push(layout.payload_jar());
        }
        if failed {
            intermediates.push(layout.mapped_jar());
        }
        for path in &intermediates {
            remove_if_exists(path)?;
        }
        tracing::debug!("Removed intermediates in {}", layout.root());
        Ok(())
    }

    fn emit_progress(&self, stage: SetupStage, version: &str) {
        if let Some(callback) = &self.progress_callback {
            callback(SetupProgress {
                stage,
                version: version.to_string(),
            });
        }
    }
}
