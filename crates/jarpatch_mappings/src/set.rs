//! Flat two-namespace mapping tables.

use crate::descriptor;
use crate::error::Result;
use crate::tree::MappingTree;
use std::collections::BTreeMap;
use std::io::Write;

/// A field or method, identified in the source namespace of a [`MappingSet`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Member {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl Member {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// Renames from one namespace to another.
///
/// Keys are always in the source namespace. Inserting an existing key
/// replaces its target, so later entries take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingSet {
    classes: BTreeMap<String, String>,
    fields: BTreeMap<Member, String>,
    methods: BTreeMap<Member, String>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten the `from` → `to` view of a tree.
    pub fn from_tree(tree: &MappingTree, from: &str, to: &str) -> Result<Self> {
        let from = tree.namespace_index(from)?;
        let to = tree.namespace_index(to)?;
        let mut set = Self::new();

        for class in tree.classes() {
            let owner = class.name(from);
            set.insert_class(owner, class.name(to));

            for field in class.fields() {
                let descriptor = tree.map_descriptor(field.descriptor(), 0, from);
                set.insert_field(Member::new(owner, field.name(from), descriptor), field.name(to));
            }
            for method in class.methods() {
                let descriptor = tree.map_descriptor(method.descriptor(), 0, from);
                set.insert_method(
                    Member::new(owner, method.name(from), descriptor),
                    method.name(to),
                );
            }
        }

        tracing::debug!(
            "Flattened mappings: {} classes, {} fields, {} methods",
            set.classes.len(),
            set.fields.len(),
            set.methods.len()
        );
        Ok(set)
    }

    pub fn insert_class(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.classes.insert(from.into(), to.into());
    }

    pub fn insert_field(&mut self, member: Member, to: impl Into<String>) {
        self.fields.insert(member, to.into());
    }

    pub fn insert_method(&mut self, member: Member, to: impl Into<String>) {
        self.methods.insert(member, to.into());
    }

    pub fn map_class<'a>(&'a self, name: &'a str) -> &'a str {
        self.classes.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn map_descriptor(&self, descriptor: &str) -> String {
        descriptor::map_descriptor(descriptor, |class| self.classes.get(class).cloned())
    }

    pub fn map_field<'a>(&'a self, member: &'a Member) -> &'a str {
        self.fields
            .get(member)
            .map(String::as_str)
            .unwrap_or(&member.name)
    }

    pub fn map_method<'a>(&'a self, member: &'a Member) -> &'a str {
        self.methods
            .get(member)
            .map(String::as_str)
            .unwrap_or(&member.name)
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.classes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Member, &str)> {
        self.fields.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn methods(&self) -> impl Iterator<Item = (&Member, &str)> {
        self.methods.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.fields.len() + self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the set as a two-column Tiny v1 file.
    pub fn write_tiny_v1<W: Write>(
        &self,
        writer: &mut W,
        from_label: &str,
        to_label: &str,
    ) -> std::io::Result<()> {
        writeln!(writer, "v1\t{from_label}\t{to_label}")?;
        for (from, to) in &self.classes {
            writeln!(writer, "CLASS\t{from}\t{to}")?;
        }
        for (member, to) in &self.fields {
            writeln!(
                writer,
                "FIELD\t{}\t{}\t{}\t{to}",
                member.owner, member.descriptor, member.name
            )?;
        }
        for (member, to) in &self.methods {
            writeln!(
                writer,
                "METHOD\t{}\t{}\t{}\t{to}",
                member.owner, member.descriptor, member.name
            )?;
        }
        Ok(())
    }
}
