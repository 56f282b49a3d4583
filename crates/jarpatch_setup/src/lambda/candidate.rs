//! Structural descriptions of synthetic lambda methods.

use crate::error::Result;
use jarpatch_classfile::{code, is_lambda_name, ClassFile, MemberInfo, ReferenceKind};
use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3;

/// Where and how a lambda is created.
///
/// Two lambdas with equal shapes are created by the same expression in the
/// same method, independent of what javac numbered them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSiteShape {
    pub enclosing_name: String,
    pub enclosing_descriptor: String,
    pub interface_method: String,
    pub factory_descriptor: String,
    pub sam_descriptor: String,
    pub instantiated_descriptor: String,
    pub implementation_kind: ReferenceKind,
    pub implementation_descriptor: String,
    /// Position among sites with an otherwise identical shape in the enclosing method.
    pub ordinal: usize,
}

/// Fingerprint of a method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyShape {
    /// xxh3-64 over opcodes and the members they reference, with lambda names erased.
    pub fingerprint: u64,
    pub instructions: usize,
}

/// One synthetic `lambda$…` method of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaCandidate {
    pub name: String,
    pub descriptor: String,
    pub access: u16,
    /// `None` if no call site in the class refers to the method.
    pub site: Option<CallSiteShape>,
    pub body: BodyShape,
}

/// Describe every lambda implementation method of `class`.
pub fn collect_candidates(class: &ClassFile) -> Result<Vec<LambdaCandidate>> {
    let all_sites = class.lambda_sites()?;
    let mut sites: HashMap<(&str, &str), CallSiteShape> = HashMap::new();
    let mut ordinals: HashMap<CallSiteShape, usize> = HashMap::new();

    for site in &all_sites {
        let mut shape = CallSiteShape {
            enclosing_name: site.enclosing_name.clone(),
            enclosing_descriptor: site.enclosing_descriptor.clone(),
            interface_method: site.interface_method.clone(),
            factory_descriptor: site.factory_descriptor.clone(),
            sam_descriptor: site.sam_descriptor.clone(),
            instantiated_descriptor: site.instantiated_descriptor.clone(),
            implementation_kind: site.implementation.kind,
            implementation_descriptor: site.implementation.descriptor.clone(),
            ordinal: 0,
        };
        let seen = ordinals.entry(shape.clone()).or_insert(0);
        shape.ordinal = *seen;
        *seen += 1;

        sites
            .entry((
                site.implementation.name.as_str(),
                site.implementation.descriptor.as_str(),
            ))
            .or_insert(shape);
    }

    class
        .methods
        .iter()
        .filter(|method| is_lambda_name(&method.name))
        .map(|method| {
            Ok(LambdaCandidate {
                name: method.name.clone(),
                descriptor: method.descriptor.clone(),
                access: method.access_flags,
                site: sites
                    .get(&(method.name.as_str(), method.descriptor.as_str()))
                    .cloned(),
                body: body_shape(class, method)?,
            })
        })
        .collect()
}

fn body_shape(class: &ClassFile, method: &MemberInfo) -> Result<BodyShape> {
    let mut hasher = Xxh3::new();
    let mut instructions = 0;

    let Some(body) = method.code() else {
        return Ok(BodyShape {
            fingerprint: hasher.digest(),
            instructions,
        });
    };

    let pool = &class.constant_pool;
    for instruction in body.instructions() {
        let instruction = instruction?;
        instructions += 1;
        hasher.update(&[instruction.opcode]);

        let Some(index) = instruction.member_index() else {
            continue;
        };
        if instruction.opcode == code::INVOKEDYNAMIC {
            let (_, name, descriptor) = pool.invoke_dynamic(index)?;
            hash_str(&mut hasher, name);
            hash_str(&mut hasher, descriptor);
            continue;
        }
        let member = pool.member_ref(index)?;
        hash_str(&mut hasher, member.owner);
        if member.owner == class.this_class && is_lambda_name(member.name) {
            hash_str(&mut hasher, "lambda$");
        } else {
            hash_str(&mut hasher, member.name);
        }
        hash_str(&mut hasher, member.descriptor);
    }

    Ok(BodyShape {
        fingerprint: hasher.digest(),
        instructions,
    })
}

fn hash_str(hasher: &mut Xxh3, value: &str) {
    hasher.update(&(value.len() as u32).to_le_bytes());
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarpatch_classfile::access::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SYNTHETIC};
    use jarpatch_classfile::code::{POP, RETURN};
    use jarpatch_classfile::{ClassWriter, CodeBuilder};

    const LAMBDA: u16 = ACC_PRIVATE | ACC_STATIC | ACC_SYNTHETIC;

    /// `tick` creates two Runnables: the first calls `a.b()`, the second `a.c()`.
    fn class(first: &str, second: &str) -> ClassFile {
        let mut w = ClassWriter::new("dzg", Some("java/lang/Object"));
        let calls_b = w.method_ref("a", "b", "()V");
        let calls_c = w.method_ref("a", "c", "()V");
        let bsm_first = w.lambda_bootstrap("()V", first, "()V", "()V");
        let bsm_second = w.lambda_bootstrap("()V", second, "()V", "()V");
        let site_first = w.invoke_dynamic(bsm_first, "run", "()Ljava/lang/Runnable;");
        let site_second = w.invoke_dynamic(bsm_second, "run", "()Ljava/lang/Runnable;");

        w.method(LAMBDA, first, "()V", Some(CodeBuilder::new().invokestatic(calls_b).op(RETURN).finish()));
        w.method(LAMBDA, second, "()V", Some(CodeBuilder::new().invokestatic(calls_c).op(RETURN).finish()));
        w.method(
            ACC_PUBLIC,
            "tick",
            "()V",
            Some(
                CodeBuilder::new()
                    .invokedynamic(site_first)
                    .op(POP)
                    .invokedynamic(site_second)
                    .op(POP)
                    .op(RETURN)
                    .finish(),
            ),
        );
        ClassFile::parse(&w.to_bytes()).unwrap()
    }

    #[test]
    fn test_identical_shapes_get_ordinals() {
        let candidates = collect_candidates(&class("lambda$tick$0", "lambda$tick$1")).unwrap();

        assert_eq!(candidates.len(), 2);
        let first = candidates[0].site.as_ref().unwrap();
        let second = candidates[1].site.as_ref().unwrap();
        assert_eq!(first.ordinal, 0);
        assert_eq!(second.ordinal, 1);
        assert_eq!(first.enclosing_name, "tick");
        assert_ne!(candidates[0].body, candidates[1].body);
    }

    #[test]
    fn test_shapes_ignore_lambda_numbering() {
        let original = collect_candidates(&class("lambda$tick$0", "lambda$tick$1")).unwrap();
        let renumbered = collect_candidates(&class("lambda$tick$7", "lambda$tick$3")).unwrap();

        assert_eq!(original[0].site, renumbered[0].site);
        assert_eq!(original[0].body, renumbered[0].body);
        assert_eq!(original[1].body, renumbered[1].body);
    }

    #[test]
    fn test_unreferenced_lambda_has_no_site() {
        let mut w = ClassWriter::new("dzg", Some("java/lang/Object"));
        w.method(LAMBDA, "lambda$orphan$0", "()V", Some(CodeBuilder::new().op(RETURN).finish()));
        let class = ClassFile::parse(&w.to_bytes()).unwrap();

        let candidates = collect_candidates(&class).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].site.is_none());
        assert_eq!(candidates[0].body.instructions, 1);
    }
}
