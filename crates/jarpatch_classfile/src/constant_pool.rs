//! Constant pool decoding and typed accessors.

use crate::error::{ClassFileError, Result};
use crate::mutf8;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// A single constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    FieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    MethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
    /// Slot 0, and the slot following every `Long`/`Double`.
    Unusable,
}

/// Which kind of member a `*ref` constant points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRefKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A resolved `Fieldref`, `Methodref` or `InterfaceMethodref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberRef<'a> {
    pub kind: MemberRefKind,
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// Method handle behaviour, JVMS §5.4.3.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReferenceKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl TryFrom<u8> for ReferenceKind {
    type Error = ClassFileError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            1 => Self::GetField,
            2 => Self::GetStatic,
            3 => Self::PutField,
            4 => Self::PutStatic,
            5 => Self::InvokeVirtual,
            6 => Self::InvokeStatic,
            7 => Self::InvokeSpecial,
            8 => Self::NewInvokeSpecial,
            9 => Self::InvokeInterface,
            other => return Err(ClassFileError::InvalidReferenceKind(other)),
        })
    }
}

/// A resolved `MethodHandle` constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandleRef<'a> {
    pub kind: ReferenceKind,
    pub member: MemberRef<'a>,
}

/// The constant pool of a class, indexed from 1 as in the class file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Read `constant_pool_count` followed by the entries.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let count = reader.read_u16::<BigEndian>()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        entries.push(Constant::Unusable);

        let mut index: u16 = 1;
        while index < count {
            let tag = reader.read_u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = reader.read_u16::<BigEndian>()?;
                    let mut bytes = vec![0u8; usize::from(len)];
                    reader.read_exact(&mut bytes)?;
                    Constant::Utf8(mutf8::decode(&bytes))
                }
                TAG_INTEGER => Constant::Integer(reader.read_i32::<BigEndian>()?),
                TAG_FLOAT => Constant::Float(reader.read_f32::<BigEndian>()?),
                TAG_LONG => Constant::Long(reader.read_i64::<BigEndian>()?),
                TAG_DOUBLE => Constant::Double(reader.read_f64::<BigEndian>()?),
                TAG_CLASS => Constant::Class {
                    name_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_STRING => Constant::String {
                    string_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_FIELDREF => Constant::FieldRef {
                    class_index: reader.read_u16::<BigEndian>()?,
                    name_and_type_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_METHODREF => Constant::MethodRef {
                    class_index: reader.read_u16::<BigEndian>()?,
                    name_and_type_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_INTERFACE_METHODREF => Constant::InterfaceMethodRef {
                    class_index: reader.read_u16::<BigEndian>()?,
                    name_and_type_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name_index: reader.read_u16::<BigEndian>()?,
                    descriptor_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    reference_kind: reader.read_u8()?,
                    reference_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType {
                    descriptor_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_DYNAMIC => Constant::Dynamic {
                    bootstrap_method_attr_index: reader.read_u16::<BigEndian>()?,
                    name_and_type_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap_method_attr_index: reader.read_u16::<BigEndian>()?,
                    name_and_type_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_MODULE => Constant::Module {
                    name_index: reader.read_u16::<BigEndian>()?,
                },
                TAG_PACKAGE => Constant::Package {
                    name_index: reader.read_u16::<BigEndian>()?,
                },
                tag => return Err(ClassFileError::UnknownConstantTag { tag, index }),
            };

            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(constant);
            index += 1;
            if wide {
                entries.push(Constant::Unusable);
                index = index.saturating_add(1);
            }
        }

        Ok(Self { entries })
    }

    /// Number of slots, including the unusable slot 0 (the class file's `constant_pool_count`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool has no usable entries.
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Look up an entry by its class file index.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(usize::from(index)) {
            Some(Constant::Unusable) | None => Err(ClassFileError::InvalidConstantIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    /// Resolve a `CONSTANT_Utf8` entry.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Resolve a `CONSTANT_Class` entry to its internal name.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "Class",
            }),
        }
    }

    /// Resolve a `CONSTANT_NameAndType` entry to `(name, descriptor)`.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolve a field, method or interface method reference.
    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>> {
        let (kind, class_index, nat_index) = match self.get(index)? {
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            } => (MemberRefKind::Field, *class_index, *name_and_type_index),
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => (MemberRefKind::Method, *class_index, *name_and_type_index),
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (MemberRefKind::InterfaceMethod, *class_index, *name_and_type_index),
            _ => {
                return Err(ClassFileError::UnexpectedConstant {
                    index,
                    expected: "member reference",
                })
            }
        };

        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberRef {
            kind,
            owner,
            name,
            descriptor,
        })
    }

    /// Resolve a `CONSTANT_MethodHandle` entry.
    pub fn method_handle(&self, index: u16) -> Result<MethodHandleRef<'_>> {
        match self.get(index)? {
            Constant::MethodHandle {
                reference_kind,
                reference_index,
            } => Ok(MethodHandleRef {
                kind: ReferenceKind::try_from(*reference_kind)?,
                member: self.member_ref(*reference_index)?,
            }),
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "MethodHandle",
            }),
        }
    }

    /// Resolve a `CONSTANT_MethodType` entry to its descriptor.
    pub fn method_type(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::MethodType { descriptor_index } => self.utf8(*descriptor_index),
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "MethodType",
            }),
        }
    }

    /// Resolve a `CONSTANT_InvokeDynamic` entry to `(bootstrap index, name, descriptor)`.
    pub fn invoke_dynamic(&self, index: u16) -> Result<(u16, &str, &str)> {
        match self.get(index)? {
            Constant::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
                Ok((*bootstrap_method_attr_index, name, descriptor))
            }
            _ => Err(ClassFileError::UnexpectedConstant {
                index,
                expected: "InvokeDynamic",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pool_bytes(count: u16, body: &[u8]) -> Vec<u8> {
        let mut data = count.to_be_bytes().to_vec();
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_wide_constants_take_two_slots() {
        // 1: Long, 3: Utf8 "x"
        let mut body = vec![TAG_LONG];
        body.extend_from_slice(&42i64.to_be_bytes());
        body.extend_from_slice(&[TAG_UTF8, 0, 1, b'x']);
        let pool = ConstantPool::read(&mut Cursor::new(pool_bytes(4, &body))).unwrap();

        assert_eq!(pool.len(), 4);
        assert_eq!(pool.get(1).unwrap(), &Constant::Long(42));
        assert!(matches!(
            pool.get(2),
            Err(ClassFileError::InvalidConstantIndex(2))
        ));
        assert_eq!(pool.utf8(3).unwrap(), "x");
    }

    #[test]
    fn test_member_ref_resolution() {
        // 1: Utf8 "Owner", 2: Class #1, 3: Utf8 "run", 4: Utf8 "()V", 5: NaT #3 #4, 6: Methodref #2 #5
        let body = [
            &[TAG_UTF8, 0, 5][..],
            b"Owner",
            &[TAG_CLASS, 0, 1],
            &[TAG_UTF8, 0, 3],
            b"run",
            &[TAG_UTF8, 0, 3],
            b"()V",
            &[TAG_NAME_AND_TYPE, 0, 3, 0, 4],
            &[TAG_METHODREF, 0, 2, 0, 5],
        ]
        .concat();
        let pool = ConstantPool::read(&mut Cursor::new(pool_bytes(7, &body))).unwrap();

        let member = pool.member_ref(6).unwrap();
        assert_eq!(member.kind, MemberRefKind::Method);
        assert_eq!(member.owner, "Owner");
        assert_eq!(member.name, "run");
        assert_eq!(member.descriptor, "()V");
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let body = [&[TAG_UTF8, 0, 1][..], b"x"].concat();
        let pool = ConstantPool::read(&mut Cursor::new(pool_bytes(2, &body))).unwrap();

        assert!(matches!(
            pool.class_name(1),
            Err(ClassFileError::UnexpectedConstant {
                expected: "Class",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let pool = ConstantPool::read(&mut Cursor::new(pool_bytes(2, &[99])));
        assert!(matches!(
            pool,
            Err(ClassFileError::UnknownConstantTag { tag: 99, index: 1 })
        ));
    }

    #[test]
    fn test_truncated_pool() {
        let pool = ConstantPool::read(&mut Cursor::new(pool_bytes(2, &[TAG_UTF8, 0, 10, b'a'])));
        assert!(matches!(pool, Err(ClassFileError::Truncated(_))));
    }
}
