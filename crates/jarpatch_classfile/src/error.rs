//! Error types for class file decoding.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClassFileError>;

/// Errors that can occur while decoding a class file.
#[derive(Error, Debug)]
pub enum ClassFileError {
    /// The input ended before a complete structure could be read.
    #[error("Truncated class data: {0}")]
    Truncated(#[from] std::io::Error),

    /// The first four bytes are not `0xCAFEBABE`.
    #[error("Bad class file magic: {0:#010x}")]
    BadMagic(u32),

    /// A constant pool entry uses a tag this reader does not know.
    #[error("Unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    /// A constant pool index is zero, out of range, or the second slot of a wide constant.
    #[error("Invalid constant pool index {0}")]
    InvalidConstantIndex(u16),

    /// A constant pool entry has a different type than the referencing structure requires.
    #[error("Constant pool entry {index} is not a {expected}")]
    UnexpectedConstant { index: u16, expected: &'static str },

    /// A method handle uses a reference kind outside `1..=9`.
    #[error("Invalid method handle reference kind {0}")]
    InvalidReferenceKind(u8),

    /// The bytecode contains an opcode with no defined length.
    #[error("Unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    /// An instruction's operands run past the end of the bytecode.
    #[error("Truncated instruction at offset {0}")]
    TruncatedInstruction(usize),

    /// An attribute's declared length disagrees with its content.
    #[error("Malformed {name} attribute: {reason}")]
    MalformedAttribute { name: String, reason: String },

    /// An `invokedynamic` refers to a bootstrap method that does not exist.
    #[error("Bootstrap method {0} is not defined")]
    MissingBootstrapMethod(u16),
}
