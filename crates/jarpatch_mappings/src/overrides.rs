//! Hand-maintained mapping entries that win over the generated tables.
//!
//! The artifact declares a few members whose names collide with, or are
//! missing from, the game's own mappings. Each override is written against the
//! stable logical namespace and resolved against the live tree at call time,
//! so the same table works whatever the source and target namespaces are.

use crate::error::Result;
use crate::set::{MappingSet, Member};
use crate::tree::MappingTree;

/// Namespace the override table is written in.
pub const LOGICAL_NAMESPACE: &str = "intermediary";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
}

/// How the overridden member is named in the source namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberName {
    /// Used verbatim; the artifact introduces this name itself.
    Literal(&'static str),
    /// A logical field name, translated into the source namespace.
    Logical(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    Literal(&'static str),
    /// The target-namespace name of the logical member.
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideScope {
    Always,
    /// Only when the host runs from source with human-readable names.
    DevelopmentOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingOverride {
    /// Logical owner class.
    pub owner: &'static str,
    pub kind: MemberKind,
    pub member: MemberName,
    /// Logical descriptor.
    pub descriptor: &'static str,
    pub replacement: Replacement,
    pub scope: OverrideScope,
}

/// Known collisions between the artifact and the game's mappings.
pub const DEFAULT_OVERRIDES: &[MappingOverride] = &[
    MappingOverride {
        owner: "net/minecraft/class_846$class_851$class_4578",
        kind: MemberKind::Field,
        member: MemberName::Literal("this$1"),
        descriptor: "Lnet/minecraft/class_846$class_851;",
        replacement: Replacement::Literal("field_20839"),
        scope: OverrideScope::Always,
    },
    MappingOverride {
        owner: "net/minecraft/class_702",
        kind: MemberKind::Field,
        member: MemberName::Logical("field_3835"),
        descriptor: "Ljava/util/Map;",
        replacement: Replacement::Target,
        scope: OverrideScope::Always,
    },
    MappingOverride {
        owner: "net/minecraft/class_316",
        kind: MemberKind::Field,
        member: MemberName::Literal("CLOUDS"),
        descriptor: "Lnet/minecraft/class_4064;",
        replacement: Replacement::Literal("CLOUDS_OF"),
        scope: OverrideScope::DevelopmentOnly,
    },
    MappingOverride {
        owner: "net/minecraft/class_761",
        kind: MemberKind::Field,
        member: MemberName::Literal("renderDistance"),
        descriptor: "I",
        replacement: Replacement::Literal("renderDistance_OF"),
        scope: OverrideScope::DevelopmentOnly,
    },
];

pub fn default_overrides() -> &'static [MappingOverride] {
    DEFAULT_OVERRIDES
}

/// An override translated into concrete source-namespace coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOverride {
    pub kind: MemberKind,
    pub member: Member,
    pub replacement: String,
}

/// Resolve `overrides` for a `from` → `to` remap.
///
/// Entries whose logical owner or field is missing from `tree` are skipped
/// with a warning; an unknown namespace is an error.
pub fn resolve_overrides(
    overrides: &[MappingOverride],
    tree: &MappingTree,
    from: &str,
    to: &str,
    development: bool,
) -> Result<Vec<ResolvedOverride>> {
    let logical = tree.namespace_index(LOGICAL_NAMESPACE)?;
    let from = tree.namespace_index(from)?;
    let to = tree.namespace_index(to)?;

    let mut resolved = Vec::with_capacity(overrides.len());
    for entry in overrides {
        if entry.scope == OverrideScope::DevelopmentOnly && !development {
            continue;
        }

        let Some(class) = tree.class_by(logical, entry.owner) else {
            tracing::warn!(
                "Skipping mapping override: class {} is not in the mappings",
                entry.owner
            );
            continue;
        };

        let logical_member = match entry.member {
            MemberName::Literal(_) => None,
            MemberName::Logical(name) => {
                let found = match entry.kind {
                    MemberKind::Field => class.field_by(logical, name),
                    MemberKind::Method => class.method_by(logical, name),
                };
                match found {
                    Some(member) => Some(member),
                    None => {
                        tracing::warn!(
                            "Skipping mapping override: {}.{} is not in the mappings",
                            entry.owner,
                            name
                        );
                        continue;
                    }
                }
            }
        };

        let name = match (entry.member, logical_member) {
            (MemberName::Literal(name), _) => name.to_string(),
            (MemberName::Logical(_), Some(member)) => member.name(from).to_string(),
            (MemberName::Logical(name), None) => name.to_string(),
        };
        let replacement = match (entry.replacement, logical_member) {
            (Replacement::Literal(name), _) => name.to_string(),
            (Replacement::Target, Some(member)) => member.name(to).to_string(),
            (Replacement::Target, None) => name.clone(),
        };

        let member = Member::new(
            class.name(from),
            name,
            tree.map_descriptor(entry.descriptor, logical, from),
        );
        tracing::debug!("Mapping override {} -> {}", member, replacement);
        resolved.push(ResolvedOverride {
            kind: entry.kind,
            member,
            replacement,
        });
    }

    Ok(resolved)
}

impl MappingSet {
    /// Overlay resolved overrides; they replace any existing entry.
    pub fn apply_overrides(&mut self, overrides: &[ResolvedOverride]) {
        for entry in overrides {
            match entry.kind {
                MemberKind::Field => {
                    self.insert_field(entry.member.clone(), entry.replacement.clone())
                }
                MemberKind::Method => {
                    self.insert_method(entry.member.clone(), entry.replacement.clone())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const MAPPINGS: &str = "v1\tofficial\tintermediary\tnamed
CLASS\tdzg\tnet/minecraft/class_846\tnet/minecraft/ChunkBuilder
CLASS\tdzg$c\tnet/minecraft/class_846$class_851\tnet/minecraft/ChunkBuilder$BuiltChunk
CLASS\tdzg$c$a\tnet/minecraft/class_846$class_851$class_4578\tnet/minecraft/ChunkBuilder$BuiltChunk$RebuildTask
CLASS\tdpa\tnet/minecraft/class_702\tnet/minecraft/ParticleManager
FIELD\tdpa\tLjava/util/Map;\tf\tfield_3835\tfactories
CLASS\tdkb\tnet/minecraft/class_316\tnet/minecraft/Option
CLASS\tdka\tnet/minecraft/class_4064\tnet/minecraft/CloudRenderMode
";

    fn tree() -> MappingTree {
        MappingTree::read_tiny(Cursor::new(MAPPINGS)).unwrap()
    }

    #[test]
    fn test_production_overrides() {
        let resolved =
            resolve_overrides(DEFAULT_OVERRIDES, &tree(), "official", "intermediary", false)
                .unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(
            resolved[0].member,
            Member::new("dzg$c$a", "this$1", "Ldzg$c;")
        );
        assert_eq!(resolved[0].replacement, "field_20839");
        assert_eq!(resolved[1].member, Member::new("dpa", "f", "Ljava/util/Map;"));
        assert_eq!(resolved[1].replacement, "field_3835");
    }

    #[test]
    fn test_development_overrides_and_missing_owner() {
        let resolved =
            resolve_overrides(DEFAULT_OVERRIDES, &tree(), "official", "named", true).unwrap();

        // class_761 is absent from the mappings and is skipped.
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[1].replacement, "factories");
        assert_eq!(
            resolved[2].member,
            Member::new("dkb", "CLOUDS", "Ldka;")
        );
        assert_eq!(resolved[2].replacement, "CLOUDS_OF");
    }

    #[test]
    fn test_overrides_win_over_generated_entries() {
        let tree = tree();
        let mut set = MappingSet::from_tree(&tree, "official", "intermediary").unwrap();
        let field = Member::new("dpa", "f", "Ljava/util/Map;");
        assert_eq!(set.map_field(&field), "field_3835");

        let custom = [MappingOverride {
            owner: "net/minecraft/class_702",
            kind: MemberKind::Field,
            member: MemberName::Logical("field_3835"),
            descriptor: "Ljava/util/Map;",
            replacement: Replacement::Literal("particleFactories"),
            scope: OverrideScope::Always,
        }];
        let resolved = resolve_overrides(&custom, &tree, "official", "intermediary", false).unwrap();
        set.apply_overrides(&resolved);

        assert_eq!(set.map_field(&field), "particleFactories");
    }

    #[test]
    fn test_missing_logical_namespace_is_an_error() {
        let tree = MappingTree::read_tiny(Cursor::new("v1\tofficial\tnamed\n")).unwrap();
        assert!(resolve_overrides(DEFAULT_OVERRIDES, &tree, "official", "named", false).is_err());
    }
}
