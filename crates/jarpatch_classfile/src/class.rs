//! Class, member and attribute structures.

use crate::access::ACC_SYNTHETIC;
use crate::code::Instructions;
use crate::constant_pool::ConstantPool;
use crate::error::{ClassFileError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

const MAGIC: u32 = 0xCAFE_BABE;

/// A decoded class file.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: String,
    /// `None` only for `java/lang/Object` and module-info.
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<Attribute>,
}

/// A field or method declaration.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<Attribute>,
}

/// Attributes this crate understands; everything else is kept opaque.
#[derive(Debug, Clone)]
pub enum Attribute {
    Code(Code),
    BootstrapMethods(Vec<BootstrapMethod>),
    Other { name: String, data: Vec<u8> },
}

/// The body of a method.
#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytecode: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Zero for `finally` handlers.
    pub catch_type: u16,
}

/// One entry of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    /// Index of a `CONSTANT_MethodHandle`.
    pub method_ref: u16,
    /// Constant pool indices of the static arguments.
    pub arguments: Vec<u16>,
}

impl ClassFile {
    /// Decode a complete class file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(bytes);

        let magic = reader.read_u32::<BigEndian>()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = reader.read_u16::<BigEndian>()?;
        let major_version = reader.read_u16::<BigEndian>()?;
        let constant_pool = ConstantPool::read(&mut reader)?;

        let access_flags = reader.read_u16::<BigEndian>()?;
        let this_class = constant_pool
            .class_name(reader.read_u16::<BigEndian>()?)?
            .to_string();
        let super_index = reader.read_u16::<BigEndian>()?;
        let super_class = match super_index {
            0 => None,
            index => Some(constant_pool.class_name(index)?.to_string()),
        };

        let interface_count = reader.read_u16::<BigEndian>()?;
        let interfaces = (0..interface_count)
            .map(|_| {
                let index = reader.read_u16::<BigEndian>()?;
                Ok(constant_pool.class_name(index)?.to_string())
            })
            .collect::<Result<Vec<_>>>()?;

        let fields = read_members(&mut reader, &constant_pool)?;
        let methods = read_members(&mut reader, &constant_pool)?;
        let attributes = read_attributes(&mut reader, &constant_pool)?;

        Ok(Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Entries of the class-level `BootstrapMethods` attribute, empty if absent.
    pub fn bootstrap_methods(&self) -> &[BootstrapMethod] {
        self.attributes
            .iter()
            .find_map(|attribute| match attribute {
                Attribute::BootstrapMethods(methods) => Some(methods.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MemberInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn field(&self, name: &str, descriptor: &str) -> Option<&MemberInfo> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.descriptor == descriptor)
    }
}

impl MemberInfo {
    /// The `Code` attribute, if this is a concrete method.
    pub fn code(&self) -> Option<&Code> {
        self.attributes.iter().find_map(|attribute| match attribute {
            Attribute::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags & ACC_SYNTHETIC != 0
    }
}

impl Code {
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(&self.bytecode)
    }
}

fn read_members(reader: &mut Cursor<&[u8]>, pool: &ConstantPool) -> Result<Vec<MemberInfo>> {
    let count = reader.read_u16::<BigEndian>()?;
    let mut members = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let access_flags = reader.read_u16::<BigEndian>()?;
        let name = pool.utf8(reader.read_u16::<BigEndian>()?)?.to_string();
        let descriptor = pool.utf8(reader.read_u16::<BigEndian>()?)?.to_string();
        let attributes = read_attributes(reader, pool)?;
        members.push(MemberInfo {
            access_flags,
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}

fn read_attributes<R: Read>(reader: &mut R, pool: &ConstantPool) -> Result<Vec<Attribute>> {
    let count = reader.read_u16::<BigEndian>()?;
    let mut attributes = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let name = pool.utf8(reader.read_u16::<BigEndian>()?)?;
        let length = reader.read_u32::<BigEndian>()?;
        let mut data = Vec::new();
        reader.by_ref().take(u64::from(length)).read_to_end(&mut data)?;
        if data.len() as u64 != u64::from(length) {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        let attribute = match name {
            "Code" => Attribute::Code(parse_code(&data, pool)?),
            "BootstrapMethods" => Attribute::BootstrapMethods(parse_bootstrap_methods(&data)?),
            _ => Attribute::Other {
                name: name.to_string(),
                data,
            },
        };
        attributes.push(attribute);
    }
    Ok(attributes)
}

fn parse_code(data: &[u8], pool: &ConstantPool) -> Result<Code> {
    let malformed = |reason: &str| ClassFileError::MalformedAttribute {
        name: "Code".to_string(),
        reason: reason.to_string(),
    };

    let mut reader = Cursor::new(data);
    let max_stack = reader.read_u16::<BigEndian>()?;
    let max_locals = reader.read_u16::<BigEndian>()?;
    let code_length = reader.read_u32::<BigEndian>()? as usize;
    if code_length > data.len().saturating_sub(8) {
        return Err(malformed("code_length exceeds attribute length"));
    }
    let mut bytecode = vec![0u8; code_length];
    reader.read_exact(&mut bytecode)?;

    let handler_count = reader.read_u16::<BigEndian>()?;
    let mut exception_table = Vec::with_capacity(usize::from(handler_count));
    for _ in 0..handler_count {
        exception_table.push(ExceptionHandler {
            start_pc: reader.read_u16::<BigEndian>()?,
            end_pc: reader.read_u16::<BigEndian>()?,
            handler_pc: reader.read_u16::<BigEndian>()?,
            catch_type: reader.read_u16::<BigEndian>()?,
        });
    }

    let attributes = read_attributes(&mut reader, pool)?;
    if reader.position() as usize != data.len() {
        return Err(malformed("trailing bytes after nested attributes"));
    }

    Ok(Code {
        max_stack,
        max_locals,
        bytecode,
        exception_table,
        attributes,
    })
}

fn parse_bootstrap_methods(data: &[u8]) -> Result<Vec<BootstrapMethod>> {
    let mut reader = Cursor::new(data);
    let count = reader.read_u16::<BigEndian>()?;
    let mut methods = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let method_ref = reader.read_u16::<BigEndian>()?;
        let argument_count = reader.read_u16::<BigEndian>()?;
        let arguments = (0..argument_count)
            .map(|_| reader.read_u16::<BigEndian>())
            .collect::<std::io::Result<Vec<_>>>()?;
        methods.push(BootstrapMethod {
            method_ref,
            arguments,
        });
    }

    if reader.position() as usize != data.len() {
        return Err(ClassFileError::MalformedAttribute {
            name: "BootstrapMethods".to_string(),
            reason: "trailing bytes".to_string(),
        });
    }
    Ok(methods)
}
