//! Lambda identity reconciliation.
//!
//! Recompiling a class renumbers its synthetic `lambda$<method>$<n>` methods,
//! so an artifact patched from the game's sources rarely agrees with the
//! game's own numbering. The namespace mappings only know the game's names,
//! so before remapping every artifact lambda that corresponds to a reference
//! lambda is renamed to the reference name.
//!
//! # Algorithm
//!
//! 1. Read the `.class` entries of both jars and keep the names present in both.
//! 2. For each shared class (in parallel), describe its lambda methods as
//!    [`LambdaCandidate`]s and let the configured [`LambdaMatcher`] pair them.
//! 3. Drop pairs that would not rename anything, then drop renames whose target
//!    name is still taken by a method that keeps its name. This repeats until
//!    stable, since every dropped rename keeps another method in place.
//!
//! Unparsable classes are skipped with a warning. Jar I/O errors are fatal.

pub mod candidate;
pub mod matcher;

pub use candidate::{collect_candidates, BodyShape, CallSiteShape, LambdaCandidate};
pub use matcher::{BodyMatcher, CallSiteMatcher, ChainMatcher, LambdaMatcher};

use crate::error::Result;
use crate::jar;
use camino::Utf8Path;
use jarpatch_classfile::ClassFile;
use jarpatch_mappings::{MappingSet, Member};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Renames of artifact lambdas to their reference names, keyed in the
/// artifact's namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LambdaCorrespondence {
    renames: BTreeMap<Member, String>,
}

impl LambdaCorrespondence {
    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn get(&self, member: &Member) -> Option<&str> {
        self.renames.get(member).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Member, &str)> {
        self.renames.iter().map(|(m, n)| (m, n.as_str()))
    }

    /// Method renames only; classes and fields map to themselves.
    pub fn into_mapping_set(self) -> MappingSet {
        let mut set = MappingSet::new();
        for (member, name) in self.renames {
            set.insert_method(member, name);
        }
        set
    }
}

pub struct LambdaReconciler<'m> {
    matcher: &'m dyn LambdaMatcher,
}

impl<'m> LambdaReconciler<'m> {
    pub fn new(matcher: &'m dyn LambdaMatcher) -> Self {
        Self { matcher }
    }

    pub fn reconcile(
        &self,
        artifact_jar: &Utf8Path,
        reference_jar: &Utf8Path,
    ) -> Result<LambdaCorrespondence> {
        let artifact = jar::read_class_entries(artifact_jar)?;
        let reference = jar::read_class_entries(reference_jar)?;
        let correspondence = self.reconcile_classes(&artifact, &reference);

        tracing::info!(
            "Reconciled lambdas with {} matcher: {} renames across {} shared classes",
            self.matcher.name(),
            correspondence.len(),
            artifact.keys().filter(|k| reference.contains_key(*k)).count()
        );
        Ok(correspondence)
    }

    /// Reconcile in-memory class entries keyed by entry name.
    pub fn reconcile_classes(
        &self,
        artifact: &BTreeMap<String, Vec<u8>>,
        reference: &BTreeMap<String, Vec<u8>>,
    ) -> LambdaCorrespondence {
        let shared: Vec<(&String, &Vec<u8>, &Vec<u8>)> = artifact
            .iter()
            .filter_map(|(name, bytes)| reference.get(name).map(|r| (name, bytes, r)))
            .collect();

        let renames = shared
            .par_iter()
            .flat_map_iter(|(name, artifact_bytes, reference_bytes)| {
                let parsed = ClassFile::parse(artifact_bytes)
                    .and_then(|a| ClassFile::parse(reference_bytes).map(|r| (a, r)));
                let renames = match parsed {
                    Ok((a, r)) => self.reconcile_class(&a, &r),
                    Err(e) => {
                        tracing::warn!("Skipping lambda reconciliation for {}: {}", name, e);
                        Vec::new()
                    }
                };
                renames.into_iter()
            })
            .collect::<BTreeMap<_, _>>();

        LambdaCorrespondence { renames }
    }

    fn reconcile_class(&self, artifact: &ClassFile, reference: &ClassFile) -> Vec<(Member, String)> {
        let (artifact_lambdas, reference_lambdas) =
            match (collect_candidates(artifact), collect_candidates(reference)) {
                (Ok(a), Ok(r)) => (a, r),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(
                        "Skipping lambda reconciliation for {}: {}",
                        artifact.this_class,
                        e
                    );
                    return Vec::new();
                }
            };
        if artifact_lambdas.is_empty() || reference_lambdas.is_empty() {
            return Vec::new();
        }

        let mut renames: Vec<(usize, String)> = Vec::new();
        let mut targets = HashSet::new();
        for (a, r) in self.matcher.correspond(&artifact_lambdas, &reference_lambdas) {
            let from = &artifact_lambdas[a];
            let to = &reference_lambdas[r];
            if from.name == to.name {
                continue;
            }
            if from.descriptor != to.descriptor {
                tracing::debug!(
                    "Ignoring lambda pair with different descriptors: {}.{}{} / {}{}",
                    artifact.this_class,
                    from.name,
                    from.descriptor,
                    to.name,
                    to.descriptor
                );
                continue;
            }
            if !targets.insert((to.name.as_str(), to.descriptor.as_str())) {
                tracing::warn!(
                    "Lambda {}.{}{} is targeted twice; keeping the first",
                    artifact.this_class,
                    to.name,
                    to.descriptor
                );
                continue;
            }
            renames.push((a, to.name.clone()));
        }

        // Drop renames onto names still held by methods that are not renamed away.
        loop {
            let moving: HashSet<(&str, &str)> = renames
                .iter()
                .map(|(a, _)| {
                    let c = &artifact_lambdas[*a];
                    (c.name.as_str(), c.descriptor.as_str())
                })
                .collect();
            let before = renames.len();
            renames.retain(|(a, target)| {
                let descriptor = artifact_lambdas[*a].descriptor.as_str();
                let taken = artifact.methods.iter().any(|m| {
                    m.name == *target
                        && m.descriptor == descriptor
                        && !moving.contains(&(m.name.as_str(), m.descriptor.as_str()))
                });
                if taken {
                    tracing::debug!(
                        "Not renaming {}.{} onto retained method {}",
                        artifact.this_class,
                        artifact_lambdas[*a].name,
                        target
                    );
                }
                !taken
            });
            if renames.len() == before {
                break;
            }
        }

        renames
            .into_iter()
            .map(|(a, target)| {
                let candidate = &artifact_lambdas[a];
                (
                    Member::new(
                        artifact.this_class.as_str(),
                        candidate.name.as_str(),
                        candidate.descriptor.as_str(),
                    ),
                    target,
                )
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::jar::tests::utf8_dir;
    use crate::jar::write_entries;
    use jarpatch_classfile::access::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SYNTHETIC};
    use jarpatch_classfile::code::{POP, RETURN};
    use jarpatch_classfile::{ClassWriter, CodeBuilder};

    const LAMBDA: u16 = ACC_PRIVATE | ACC_STATIC | ACC_SYNTHETIC;

    /// A class whose `tick` creates lambdas that call `a.<callee>()`, in order.
    /// Lambda methods are named by `names`, parallel to `callees`.
    pub(crate) fn class_bytes(owner: &str, names: &[&str], callees: &[&str], extra: &[&str]) -> Vec<u8> {
        let mut w = ClassWriter::new(owner, Some("java/lang/Object"));
        let mut tick = CodeBuilder::new();
        for (name, callee) in names.iter().zip(callees) {
            let call = w.method_ref("a", callee, "()V");
            let bsm = w.lambda_bootstrap("()V", name, "()V", "()V");
            let site = w.invoke_dynamic(bsm, "run", "()Ljava/lang/Runnable;");
            w.method(LAMBDA, name, "()V", Some(CodeBuilder::new().invokestatic(call).op(RETURN).finish()));
            tick = tick.invokedynamic(site).op(POP);
        }
        for name in extra {
            w.method(LAMBDA, name, "()V", Some(CodeBuilder::new().op(RETURN).finish()));
        }
        w.method(ACC_PUBLIC, "tick", "()V", Some(tick.op(RETURN).finish()));
        w.to_bytes()
    }

    fn classes(entries: &[(&str, Vec<u8>)]) -> BTreeMap<String, Vec<u8>> {
        entries
            .iter()
            .map(|(name, bytes)| (name.to_string(), bytes.clone()))
            .collect()
    }

    #[test]
    fn test_renumbered_lambdas_are_renamed() {
        let artifact = classes(&[(
            "dzg.class",
            class_bytes("dzg", &["lambda$tick$4", "lambda$tick$5"], &["b", "c"], &[]),
        )]);
        let reference = classes(&[(
            "dzg.class",
            class_bytes("dzg", &["lambda$tick$0", "lambda$tick$1"], &["b", "c"], &[]),
        )]);

        let matcher = ChainMatcher::default();
        let result = LambdaReconciler::new(&matcher).reconcile_classes(&artifact, &reference);

        assert_eq!(result.len(), 2);
        assert_eq!(
            result.get(&Member::new("dzg", "lambda$tick$4", "()V")),
            Some("lambda$tick$0")
        );
        assert_eq!(
            result.get(&Member::new("dzg", "lambda$tick$5", "()V")),
            Some("lambda$tick$1")
        );
    }

    #[test]
    fn test_identity_pairs_are_dropped() {
        let bytes = class_bytes("dzg", &["lambda$tick$0"], &["b"], &[]);
        let artifact = classes(&[("dzg.class", bytes.clone())]);
        let reference = classes(&[("dzg.class", bytes)]);

        let matcher = ChainMatcher::default();
        let result = LambdaReconciler::new(&matcher).reconcile_classes(&artifact, &reference);
        assert!(result.is_empty());
    }

    #[test]
    fn test_no_rename_onto_retained_method() {
        // The artifact adds an unmatched lambda that already holds the reference name.
        let artifact = classes(&[(
            "dzg.class",
            class_bytes("dzg", &["lambda$tick$2"], &["b"], &["lambda$tick$0"]),
        )]);
        let reference = classes(&[(
            "dzg.class",
            class_bytes("dzg", &["lambda$tick$0"], &["b"], &[]),
        )]);

        let matcher = CallSiteMatcher;
        let result = LambdaReconciler::new(&matcher).reconcile_classes(&artifact, &reference);
        assert!(result.is_empty());
    }

    #[test]
    fn test_swapped_names_are_allowed() {
        let artifact = classes(&[(
            "dzg.class",
            class_bytes("dzg", &["lambda$tick$1", "lambda$tick$0"], &["b", "c"], &[]),
        )]);
        let reference = classes(&[(
            "dzg.class",
            class_bytes("dzg", &["lambda$tick$0", "lambda$tick$1"], &["b", "c"], &[]),
        )]);

        let matcher = ChainMatcher::default();
        let result = LambdaReconciler::new(&matcher).reconcile_classes(&artifact, &reference);

        assert_eq!(result.len(), 2);
        let set = result.into_mapping_set();
        assert_eq!(set.map_method(&Member::new("dzg", "lambda$tick$1", "()V")), "lambda$tick$0");
        assert_eq!(set.map_method(&Member::new("dzg", "lambda$tick$0", "()V")), "lambda$tick$1");
    }

    #[test]
    fn test_unparsable_and_unshared_classes_are_skipped() {
        let artifact = classes(&[
            ("broken.class", vec![0xCA, 0xFE]),
            ("only_here.class", class_bytes("only_here", &["lambda$tick$3"], &["b"], &[])),
        ]);
        let reference = classes(&[("broken.class", vec![0xCA, 0xFE, 0xBA, 0xBE])]);

        let matcher = ChainMatcher::default();
        let result = LambdaReconciler::new(&matcher).reconcile_classes(&artifact, &reference);
        assert!(result.is_empty());
    }

    #[test]
    fn test_reconcile_jars() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let artifact = root.join("artifact.jar");
        let reference = root.join("reference.jar");
        let a = class_bytes("dzg", &["lambda$tick$9"], &["b"], &[]);
        let r = class_bytes("dzg", &["lambda$tick$0"], &["b"], &[]);
        write_entries(&artifact, [("dzg.class", a.as_slice())]).unwrap();
        write_entries(&reference, [("dzg.class", r.as_slice())]).unwrap();

        let matcher = ChainMatcher::default();
        let reconciler = LambdaReconciler::new(&matcher);
        let result = reconciler.reconcile(&artifact, &reference).unwrap();
        assert_eq!(result.len(), 1);

        assert!(reconciler
            .reconcile(&artifact, &root.join("missing.jar"))
            .is_err());
    }
}
