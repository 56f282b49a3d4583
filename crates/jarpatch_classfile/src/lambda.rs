//! Discovery of lambda call sites.

use crate::class::ClassFile;
use crate::code::INVOKEDYNAMIC;
use crate::constant_pool::ReferenceKind;
use crate::error::{ClassFileError, Result};

/// Owner of the bootstrap methods javac emits for lambdas and method references.
pub const LAMBDA_METAFACTORY: &str = "java/lang/invoke/LambdaMetafactory";

/// Name prefix javac gives to synthetic lambda implementation methods.
pub const LAMBDA_PREFIX: &str = "lambda$";

pub fn is_lambda_name(name: &str) -> bool {
    name.starts_with(LAMBDA_PREFIX)
}

/// The method a lambda call site binds to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LambdaImplementation {
    pub kind: ReferenceKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// An `invokedynamic` bootstrapped by [`LAMBDA_METAFACTORY`] whose
/// implementation method lives in the same class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LambdaSite {
    pub enclosing_name: String,
    pub enclosing_descriptor: String,
    /// Bytecode offset of the `invokedynamic`.
    pub offset: usize,
    /// Zero-based position among the lambda sites of the enclosing method.
    pub ordinal: usize,
    /// Name of the functional interface method, e.g. `run` or `apply`.
    pub interface_method: String,
    /// Descriptor of the factory call, whose return type is the functional interface.
    pub factory_descriptor: String,
    pub sam_descriptor: String,
    pub instantiated_descriptor: String,
    pub implementation: LambdaImplementation,
}

impl ClassFile {
    /// Every lambda call site in this class, in method then bytecode order.
    pub fn lambda_sites(&self) -> Result<Vec<LambdaSite>> {
        let pool = &self.constant_pool;
        let bootstrap_methods = self.bootstrap_methods();
        let mut sites = Vec::new();

        for method in &self.methods {
            let Some(code) = method.code() else {
                continue;
            };

            let mut ordinal = 0;
            for instruction in code.instructions() {
                let instruction = instruction?;
                if instruction.opcode != INVOKEDYNAMIC {
                    continue;
                }
                let Some(index) = instruction.member_index() else {
                    continue;
                };

                let (bsm_index, interface_method, factory_descriptor) =
                    pool.invoke_dynamic(index)?;
                let bootstrap = bootstrap_methods
                    .get(usize::from(bsm_index))
                    .ok_or(ClassFileError::MissingBootstrapMethod(bsm_index))?;

                let handle = pool.method_handle(bootstrap.method_ref)?;
                if handle.member.owner != LAMBDA_METAFACTORY
                    || !matches!(handle.member.name, "metafactory" | "altMetafactory")
                {
                    continue;
                }

                let [sam, implementation, instantiated, ..] = bootstrap.arguments[..] else {
                    continue;
                };
                let implementation = pool.method_handle(implementation)?;
                if implementation.member.owner != self.this_class {
                    continue;
                }

                sites.push(LambdaSite {
                    enclosing_name: method.name.clone(),
                    enclosing_descriptor: method.descriptor.clone(),
                    offset: instruction.offset,
                    ordinal,
                    interface_method: interface_method.to_string(),
                    factory_descriptor: factory_descriptor.to_string(),
                    sam_descriptor: pool.method_type(sam)?.to_string(),
                    instantiated_descriptor: pool.method_type(instantiated)?.to_string(),
                    implementation: LambdaImplementation {
                        kind: implementation.kind,
                        owner: implementation.member.owner.to_string(),
                        name: implementation.member.name.to_string(),
                        descriptor: implementation.member.descriptor.to_string(),
                    },
                });
                ordinal += 1;
            }
        }

        Ok(sites)
    }
}
