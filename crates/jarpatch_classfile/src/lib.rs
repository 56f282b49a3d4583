//! Read-only model of JVM class files.
//!
//! This crate decodes just enough of the class file format for structural
//! comparison of compiled code:
//!
//! - **Constant pool**: every tag up to Java 21, with typed accessors for
//!   classes, member references, method handles and method types.
//! - **Members**: fields and methods with their access flags and attributes.
//! - **`Code` and `BootstrapMethods`**: decoded; all other attributes are kept
//!   as raw bytes.
//! - **Instruction walking**: correct instruction boundaries, including
//!   `tableswitch`/`lookupswitch` padding and `wide`.
//! - **Lambda call sites**: `invokedynamic` instructions bootstrapped by
//!   `LambdaMetafactory` that point at an implementation method of the same
//!   class.
//!
//! Nothing here rewrites classes. Parsing never panics on truncated or
//! malformed input; it returns a [`ClassFileError`] instead.
//!
//! # Example
//!
//! ```no_run
//! use jarpatch_classfile::ClassFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("Example.class")?;
//! let class = ClassFile::parse(&bytes)?;
//! for site in class.lambda_sites()? {
//!     println!(
//!         "{}{} -> {}",
//!         site.enclosing_name, site.enclosing_descriptor, site.implementation.name
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod access;
mod class;
pub mod code;
mod constant_pool;
mod error;
mod lambda;
mod mutf8;

#[cfg(any(test, feature = "testing"))]
mod writer;

pub use class::{Attribute, BootstrapMethod, ClassFile, Code, ExceptionHandler, MemberInfo};
pub use code::{Instruction, Instructions};
pub use constant_pool::{
    Constant, ConstantPool, MemberRef, MemberRefKind, MethodHandleRef, ReferenceKind,
};
pub use error::{ClassFileError, Result};
pub use lambda::{
    is_lambda_name, LambdaImplementation, LambdaSite, LAMBDA_METAFACTORY, LAMBDA_PREFIX,
};

#[cfg(any(test, feature = "testing"))]
pub use writer::{ClassWriter, CodeBuilder};
