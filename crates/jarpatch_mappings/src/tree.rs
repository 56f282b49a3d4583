//! Multi-namespace mapping tree.

use crate::descriptor;
use crate::error::{MappingError, Result};
use std::collections::HashMap;

/// Classes and their members, named in every declared namespace.
///
/// Member descriptors are stored in the first namespace and translated on
/// demand with [`MappingTree::map_descriptor`].
#[derive(Debug, Clone, Default)]
pub struct MappingTree {
    namespaces: Vec<String>,
    classes: Vec<ClassMapping>,
    /// Per namespace: class name -> position in `classes`.
    index: Vec<HashMap<String, usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMapping {
    names: Vec<String>,
    fields: Vec<MemberMapping>,
    methods: Vec<MemberMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMapping {
    descriptor: String,
    names: Vec<String>,
}

/// Fill empty names with the first namespace's name.
fn complete_names(mut names: Vec<String>, width: usize) -> Vec<String> {
    names.resize(width, String::new());
    let fallback = names[0].clone();
    for name in names.iter_mut().skip(1) {
        if name.is_empty() {
            name.clone_from(&fallback);
        }
    }
    names
}

impl MappingTree {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let namespaces: Vec<String> = namespaces.into_iter().map(Into::into).collect();
        let index = vec![HashMap::new(); namespaces.len()];
        Self {
            namespaces,
            classes: Vec::new(),
            index,
        }
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn namespace_index(&self, namespace: &str) -> Result<usize> {
        self.namespaces
            .iter()
            .position(|ns| ns == namespace)
            .ok_or_else(|| MappingError::UnknownNamespace(namespace.to_string()))
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.iter().any(|ns| ns == namespace)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassMapping> {
        self.classes.iter()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Insert or update a class, keyed by its first-namespace name.
    ///
    /// Returns the class position for use with [`MappingTree::class_mut`].
    pub fn add_class(&mut self, names: Vec<String>) -> usize {
        let names = complete_names(names, self.namespaces.len());

        let position = match self.index[0].get(&names[0]) {
            Some(&position) => {
                let class = &mut self.classes[position];
                for (ns, old) in class.names.iter().enumerate() {
                    self.index[ns].remove(old);
                }
                class.names = names;
                position
            }
            None => {
                self.classes.push(ClassMapping {
                    names,
                    fields: Vec::new(),
                    methods: Vec::new(),
                });
                self.classes.len() - 1
            }
        };

        for (ns, name) in self.classes[position].names.iter().enumerate() {
            self.index[ns].insert(name.clone(), position);
        }
        position
    }

    /// Position of the class named `name` in the first namespace, creating an
    /// identity entry if it is unknown.
    pub(crate) fn ensure_class(&mut self, name: &str) -> usize {
        match self.index[0].get(name) {
            Some(&position) => position,
            None => self.add_class(vec![name.to_string()]),
        }
    }

    pub fn class_mut(&mut self, position: usize) -> &mut ClassMapping {
        &mut self.classes[position]
    }

    /// Look up a class by its name in namespace `namespace`.
    pub fn class_by(&self, namespace: usize, name: &str) -> Option<&ClassMapping> {
        self.index
            .get(namespace)?
            .get(name)
            .map(|&position| &self.classes[position])
    }

    /// Translate a class name, or `None` if it is not in the tree.
    pub fn map_class_name(&self, name: &str, from: usize, to: usize) -> Option<&str> {
        self.class_by(from, name).map(|class| class.name(to))
    }

    /// Translate every class reference in a descriptor; unknown classes are kept.
    pub fn map_descriptor(&self, descriptor: &str, from: usize, to: usize) -> String {
        if from == to {
            return descriptor.to_string();
        }
        descriptor::map_descriptor(descriptor, |class| {
            self.map_class_name(class, from, to).map(str::to_string)
        })
    }
}

impl ClassMapping {
    pub fn name(&self, namespace: usize) -> &str {
        &self.names[namespace]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn fields(&self) -> &[MemberMapping] {
        &self.fields
    }

    pub fn methods(&self) -> &[MemberMapping] {
        &self.methods
    }

    pub fn add_field(&mut self, descriptor: impl Into<String>, names: Vec<String>) {
        let width = self.names.len();
        self.fields.push(MemberMapping {
            descriptor: descriptor.into(),
            names: complete_names(names, width),
        });
    }

    pub fn add_method(&mut self, descriptor: impl Into<String>, names: Vec<String>) {
        let width = self.names.len();
        self.methods.push(MemberMapping {
            descriptor: descriptor.into(),
            names: complete_names(names, width),
        });
    }

    /// First field called `name` in `namespace`.
    pub fn field_by(&self, namespace: usize, name: &str) -> Option<&MemberMapping> {
        self.fields.iter().find(|f| f.names[namespace] == name)
    }

    pub fn method_by(&self, namespace: usize, name: &str) -> Option<&MemberMapping> {
        self.methods.iter().find(|m| m.names[namespace] == name)
    }
}

impl MemberMapping {
    /// Descriptor in the tree's first namespace.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn name(&self, namespace: usize) -> &str {
        &self.names[namespace]
    }
}
