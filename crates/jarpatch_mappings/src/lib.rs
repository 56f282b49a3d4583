//! Namespace mappings for jarpatch.
//!
//! - [`MappingTree`]: classes, fields and methods named in several namespaces,
//!   read from Tiny v1 or Tiny v2 files.
//! - [`MappingSet`]: a flat `from` → `to` view used to drive a remapper,
//!   writable as Tiny v1.
//! - [`MappingOverride`]: declarative entries that patch known collisions,
//!   resolved against a live tree with [`resolve_overrides`].
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use jarpatch_mappings::{default_overrides, resolve_overrides, MappingSet, MappingTree};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tree = MappingTree::read_tiny_file(Utf8Path::new("mappings.tiny"))?;
//! let mut set = MappingSet::from_tree(&tree, "official", "intermediary")?;
//! let overrides = resolve_overrides(default_overrides(), &tree, "official", "intermediary", false)?;
//! set.apply_overrides(&overrides);
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod error;
pub mod overrides;
pub mod set;
pub mod tiny;
pub mod tree;

pub use error::{MappingError, Result};
pub use overrides::{
    default_overrides, resolve_overrides, MappingOverride, MemberKind, MemberName, OverrideScope,
    Replacement, ResolvedOverride, DEFAULT_OVERRIDES, LOGICAL_NAMESPACE,
};
pub use set::{MappingSet, Member};
pub use tree::{ClassMapping, MappingTree, MemberMapping};
