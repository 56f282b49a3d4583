//! Strategies for pairing artifact lambdas with reference lambdas.

use super::candidate::{BodyShape, CallSiteShape, LambdaCandidate};
use itertools::Itertools;
use std::hash::Hash;

/// Produces a partial correspondence between the lambdas of one class in
/// two jars.
///
/// Returned pairs are `(artifact index, reference index)`. Each index may
/// appear at most once on either side.
pub trait LambdaMatcher: Send + Sync {
    fn name(&self) -> &str;

    fn correspond(
        &self,
        artifact: &[LambdaCandidate],
        reference: &[LambdaCandidate],
    ) -> Vec<(usize, usize)>;
}

/// Pair candidates whose key is present exactly once on each side.
fn pair_unique<K, F>(
    artifact: &[LambdaCandidate],
    reference: &[LambdaCandidate],
    key: F,
) -> Vec<(usize, usize)>
where
    K: Hash + Eq,
    F: Fn(&LambdaCandidate) -> Option<K>,
{
    let group = |candidates: &[LambdaCandidate]| {
        candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| key(candidate).map(|k| (k, index)))
            .into_group_map()
    };
    let artifact_groups = group(artifact);
    let mut reference_groups = group(reference);

    artifact_groups
        .into_iter()
        .filter_map(|(key, indices)| match (indices.as_slice(), reference_groups.remove(&key)) {
            ([a], Some(matches)) if matches.len() == 1 => Some((*a, matches[0])),
            _ => None,
        })
        .sorted()
        .collect()
}

/// Matches on where the lambda is created.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallSiteMatcher;

impl LambdaMatcher for CallSiteMatcher {
    fn name(&self) -> &str {
        "call-site"
    }

    fn correspond(
        &self,
        artifact: &[LambdaCandidate],
        reference: &[LambdaCandidate],
    ) -> Vec<(usize, usize)> {
        pair_unique(artifact, reference, |c| -> Option<CallSiteShape> { c.site.clone() })
    }
}

/// Matches on descriptor and body fingerprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyMatcher;

impl LambdaMatcher for BodyMatcher {
    fn name(&self) -> &str {
        "body"
    }

    fn correspond(
        &self,
        artifact: &[LambdaCandidate],
        reference: &[LambdaCandidate],
    ) -> Vec<(usize, usize)> {
        pair_unique(artifact, reference, |c| -> Option<(String, BodyShape)> {
            Some((c.descriptor.clone(), c.body))
        })
    }
}

/// Runs matchers in order, each over what the previous ones left unmatched.
pub struct ChainMatcher {
    matchers: Vec<Box<dyn LambdaMatcher>>,
}

impl ChainMatcher {
    pub fn new(matchers: Vec<Box<dyn LambdaMatcher>>) -> Self {
        Self { matchers }
    }
}

impl Default for ChainMatcher {
    fn default() -> Self {
        Self::new(vec![Box::new(CallSiteMatcher), Box::new(BodyMatcher)])
    }
}

impl LambdaMatcher for ChainMatcher {
    fn name(&self) -> &str {
        "chain"
    }

    fn correspond(
        &self,
        artifact: &[LambdaCandidate],
        reference: &[LambdaCandidate],
    ) -> Vec<(usize, usize)> {
        let mut artifact_left: Vec<usize> = (0..artifact.len()).collect();
        let mut reference_left: Vec<usize> = (0..reference.len()).collect();
        let mut pairs = Vec::new();

        for matcher in &self.matchers {
            if artifact_left.is_empty() || reference_left.is_empty() {
                break;
            }
            let a: Vec<LambdaCandidate> = artifact_left.iter().map(|&i| artifact[i].clone()).collect();
            let r: Vec<LambdaCandidate> = reference_left.iter().map(|&i| reference[i].clone()).collect();

            let found = matcher.correspond(&a, &r);
            tracing::trace!("Matcher {} paired {} lambdas", matcher.name(), found.len());

            let (matched_a, matched_r): (Vec<usize>, Vec<usize>) = found
                .into_iter()
                .map(|(ai, ri)| (artifact_left[ai], reference_left[ri]))
                .unzip();
            pairs.extend(matched_a.iter().copied().zip(matched_r.iter().copied()));
            artifact_left.retain(|i| !matched_a.contains(i));
            reference_left.retain(|i| !matched_r.contains(i));
        }

        pairs.sort_unstable();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarpatch_classfile::ReferenceKind;

    fn candidate(name: &str, site: Option<(&str, usize)>, fingerprint: u64) -> LambdaCandidate {
        LambdaCandidate {
            name: name.to_string(),
            descriptor: "()V".to_string(),
            access: 0x100a,
            site: site.map(|(enclosing, ordinal)| CallSiteShape {
                enclosing_name: enclosing.to_string(),
                enclosing_descriptor: "()V".to_string(),
                interface_method: "run".to_string(),
                factory_descriptor: "()Ljava/lang/Runnable;".to_string(),
                sam_descriptor: "()V".to_string(),
                instantiated_descriptor: "()V".to_string(),
                implementation_kind: ReferenceKind::InvokeStatic,
                implementation_descriptor: "()V".to_string(),
                ordinal,
            }),
            body: BodyShape {
                fingerprint,
                instructions: 3,
            },
        }
    }

    #[test]
    fn test_call_site_pairs_unique_shapes() {
        let artifact = vec![
            candidate("lambda$a$5", Some(("a", 0)), 1),
            candidate("lambda$b$6", Some(("b", 0)), 2),
        ];
        let reference = vec![
            candidate("lambda$b$0", Some(("b", 0)), 2),
            candidate("lambda$a$1", Some(("a", 0)), 1),
        ];

        assert_eq!(
            CallSiteMatcher.correspond(&artifact, &reference),
            vec![(0, 1), (1, 0)]
        );
    }

    #[test]
    fn test_ambiguous_keys_are_not_paired() {
        let artifact = vec![candidate("lambda$x$0", None, 9), candidate("lambda$x$1", None, 9)];
        let reference = vec![candidate("lambda$x$0", None, 9)];

        assert!(BodyMatcher.correspond(&artifact, &reference).is_empty());
        assert!(CallSiteMatcher.correspond(&artifact, &reference).is_empty());
    }

    #[test]
    fn test_chain_falls_back_to_body() {
        let artifact = vec![
            candidate("lambda$a$3", Some(("a", 0)), 1),
            candidate("lambda$static$4", None, 7),
        ];
        let reference = vec![
            candidate("lambda$static$0", None, 7),
            candidate("lambda$a$1", Some(("a", 0)), 1),
        ];

        let pairs = ChainMatcher::default().correspond(&artifact, &reference);
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_chain_does_not_reuse_matched_candidates() {
        // Both artifact lambdas share a body with the first reference lambda,
        // but only one of them is left once call sites are matched.
        let artifact = vec![
            candidate("lambda$a$3", Some(("a", 0)), 1),
            candidate("lambda$b$4", Some(("b", 0)), 1),
        ];
        let reference = vec![
            candidate("lambda$a$0", Some(("a", 0)), 1),
            candidate("lambda$c$1", Some(("c", 0)), 1),
        ];

        let pairs = ChainMatcher::default().correspond(&artifact, &reference);
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    }
}
