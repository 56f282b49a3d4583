//! Removal of entries that would shadow the host's own classes.

use crate::config::NamespaceRules;
use crate::error::Result;
use crate::jar;
use camino::Utf8Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterStats {
    pub kept: usize,
    pub dropped: usize,
}

/// Decides which jar entries survive the filter stage.
#[derive(Debug, Clone)]
pub struct EntryFilter<'a> {
    rules: &'a NamespaceRules,
}

impl<'a> EntryFilter<'a> {
    pub fn new(rules: &'a NamespaceRules) -> Self {
        Self { rules }
    }

    /// Dropped iff it starts with a reserved prefix, or sits under a guarded
    /// prefix as a nested class whose suffix is longer than allowed.
    pub fn keeps(&self, name: &str) -> bool {
        let reserved = self
            .rules
            .reserved_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()));
        !reserved && !self.is_long_nested_guarded(name)
    }

    fn is_long_nested_guarded(&self, name: &str) -> bool {
        if !self
            .rules
            .guarded_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
        {
            return false;
        }
        let stem = name.strip_suffix(".class").unwrap_or(name);
        stem.split('$')
            .nth(1)
            .is_some_and(|suffix| suffix.chars().count() > self.rules.max_nested_suffix)
    }
}

/// Copy the entries `filter` keeps from `input` to `output`, in order.
pub fn filter_jar(input: &Utf8Path, output: &Utf8Path, filter: &EntryFilter<'_>) -> Result<FilterStats> {
    let (kept, dropped) = jar::copy_entries(input, output, |name| filter.keeps(name))?;
    tracing::info!("Filtered {}: kept {} entries, dropped {}", input, kept, dropped);
    Ok(FilterStats { kept, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::tests::utf8_dir;
    use crate::jar::{entry_names, write_entries};

    #[test]
    fn test_keeps() {
        let rules = NamespaceRules::default();
        let filter = EntryFilter::new(&rules);

        assert!(!filter.keeps("net/minecraft/Outer$A.class"));
        assert!(!filter.keeps("net/minecraft/client/Main.class"));
        assert!(!filter.keeps("srg/Foo.class"));
        assert!(filter.keeps("com/mojang/blaze3d/platform/Outer$A.class"));
        assert!(filter.keeps("com/mojang/blaze3d/platform/Outer$AB.class"));
        assert!(!filter.keeps("com/mojang/blaze3d/platform/Outer$Inner2.class"));
        assert!(filter.keeps("com/mojang/blaze3d/platform/GlStateManager.class"));
        assert!(filter.keeps("optifine/Config.class"));
        assert!(filter.keeps("META-INF/MANIFEST.MF"));
    }

    #[test]
    fn test_reserved_prefix_applies_under_guarded_prefix() {
        let rules = NamespaceRules {
            reserved_prefixes: vec!["com/mojang/".to_string()],
            ..NamespaceRules::default()
        };
        let filter = EntryFilter::new(&rules);

        assert!(!filter.keeps("com/mojang/blaze3d/platform/GlStateManager.class"));
        assert!(!filter.keeps("com/mojang/blaze3d/platform/Outer$A.class"));
        assert!(!filter.keeps("com/mojang/authlib/Foo.class"));
        assert!(filter.keeps("optifine/Config.class"));
    }

    #[test]
    fn test_filter_jar_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = utf8_dir(&dir);
        let input = root.join("in.jar");
        write_entries(
            &input,
            [
                ("optifine/Config.class", &b"a"[..]),
                ("net/minecraft/Outer$A.class", &b"b"[..]),
                ("com/mojang/blaze3d/platform/Outer$Inner2.class", &b"c"[..]),
                ("com/mojang/blaze3d/platform/Outer$A.class", &b"d"[..]),
                ("notch/a.class", &b"e"[..]),
            ],
        )
        .unwrap();

        let rules = NamespaceRules::default();
        let filter = EntryFilter::new(&rules);
        let once = root.join("once.jar");
        let twice = root.join("twice.jar");

        let stats = filter_jar(&input, &once, &filter).unwrap();
        assert_eq!(stats, FilterStats { kept: 3, dropped: 2 });

        let stats = filter_jar(&once, &twice, &filter).unwrap();
        assert_eq!(stats.dropped, 0);
        assert_eq!(entry_names(&once).unwrap(), entry_names(&twice).unwrap());
        assert_eq!(
            entry_names(&twice).unwrap(),
            vec![
                "optifine/Config.class",
                "com/mojang/blaze3d/platform/Outer$A.class",
                "notch/a.class"
            ]
        );
    }
}
