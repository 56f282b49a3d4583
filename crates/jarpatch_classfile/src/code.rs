//! Bytecode instruction boundaries.

use crate::error::{ClassFileError, Result};

pub const NOP: u8 = 0x00;
pub const ALOAD_0: u8 = 0x2a;
pub const POP: u8 = 0x57;
pub const TABLESWITCH: u8 = 0xaa;
pub const LOOKUPSWITCH: u8 = 0xab;
pub const IRETURN: u8 = 0xac;
pub const ARETURN: u8 = 0xb0;
pub const RETURN: u8 = 0xb1;
pub const GETSTATIC: u8 = 0xb2;
pub const PUTSTATIC: u8 = 0xb3;
pub const GETFIELD: u8 = 0xb4;
pub const PUTFIELD: u8 = 0xb5;
pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;
pub const INVOKEDYNAMIC: u8 = 0xba;
pub const IINC: u8 = 0x84;
pub const WIDE: u8 = 0xc4;

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub offset: usize,
    pub opcode: u8,
    /// The bytes following the opcode, including switch padding.
    pub operands: &'a [u8],
}

impl Instruction<'_> {
    /// The constant pool index operand of field, method and `invokedynamic` instructions.
    pub fn member_index(&self) -> Option<u16> {
        match self.opcode {
            GETSTATIC..=INVOKEDYNAMIC => {
                Some(u16::from_be_bytes([*self.operands.first()?, *self.operands.get(1)?]))
            }
            _ => None,
        }
    }
}

/// Iterator over the instructions of a method body.
///
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    bytecode: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            offset: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytecode.len() {
            return None;
        }

        let offset = self.offset;
        let result = instruction_length(self.bytecode, offset).and_then(|len| {
            let end = offset + len;
            if end > self.bytecode.len() {
                return Err(ClassFileError::TruncatedInstruction(offset));
            }
            Ok(Instruction {
                offset,
                opcode: self.bytecode[offset],
                operands: &self.bytecode[offset + 1..end],
            })
        });

        match &result {
            Ok(instruction) => self.offset = offset + 1 + instruction.operands.len(),
            Err(_) => self.failed = true,
        }
        Some(result)
    }
}

/// Total length in bytes of the instruction starting at `offset`.
pub fn instruction_length(code: &[u8], offset: usize) -> Result<usize> {
    let opcode = code[offset];
    let len = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13 | 0x14 => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3,
        0xa9 => 2,
        TABLESWITCH => {
            let pad = switch_padding(offset);
            let low = read_i32(code, offset + 1 + pad + 4, offset)?;
            let high = read_i32(code, offset + 1 + pad + 8, offset)?;
            let count = i64::from(high) - i64::from(low) + 1;
            if count < 0 {
                return Err(ClassFileError::TruncatedInstruction(offset));
            }
            1 + pad + 12 + 4 * count as usize
        }
        LOOKUPSWITCH => {
            let pad = switch_padding(offset);
            let pairs = read_i32(code, offset + 1 + pad + 4, offset)?;
            if pairs < 0 {
                return Err(ClassFileError::TruncatedInstruction(offset));
            }
            1 + pad + 8 + 8 * pairs as usize
        }
        0xac..=0xb1 => 1,
        0xb2..=0xb8 => 3,
        INVOKEINTERFACE | INVOKEDYNAMIC => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        WIDE => match code.get(offset + 1) {
            Some(&IINC) => 6,
            Some(_) => 4,
            None => return Err(ClassFileError::TruncatedInstruction(offset)),
        },
        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        opcode => return Err(ClassFileError::UnknownOpcode { opcode, offset }),
    };
    Ok(len)
}

fn switch_padding(offset: usize) -> usize {
    (4 - ((offset + 1) % 4)) % 4
}

fn read_i32(code: &[u8], at: usize, instruction: usize) -> Result<i32> {
    code.get(at..at + 4)
        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ClassFileError::TruncatedInstruction(instruction))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcodes(code: &[u8]) -> Vec<(usize, u8)> {
        Instructions::new(code)
            .map(|i| i.map(|i| (i.offset, i.opcode)))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_simple_sequence() {
        // aload_0; getfield #2; invokevirtual #3; return
        let code = [ALOAD_0, GETFIELD, 0, 2, INVOKEVIRTUAL, 0, 3, RETURN];
        assert_eq!(
            opcodes(&code),
            vec![(0, ALOAD_0), (1, GETFIELD), (4, INVOKEVIRTUAL), (7, RETURN)]
        );
    }

    #[test]
    fn test_tableswitch_padding() {
        // iload_1 at 0, tableswitch at 1 -> pad 2, low 0, high 1, two targets
        let mut code = vec![0x1b, TABLESWITCH, 0, 0];
        code.extend_from_slice(&20i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&20i32.to_be_bytes());
        code.extend_from_slice(&20i32.to_be_bytes());
        code.push(RETURN);

        assert_eq!(opcodes(&code), vec![(0, 0x1b), (1, TABLESWITCH), (24, RETURN)]);
    }

    #[test]
    fn test_lookupswitch() {
        // lookupswitch at 0 -> pad 3, default, npairs 1, one pair
        let mut code = vec![LOOKUPSWITCH, 0, 0, 0];
        code.extend_from_slice(&16i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&7i32.to_be_bytes());
        code.extend_from_slice(&16i32.to_be_bytes());
        code.push(RETURN);

        assert_eq!(opcodes(&code), vec![(0, LOOKUPSWITCH), (20, RETURN)]);
    }

    #[test]
    fn test_wide_iinc() {
        let code = [WIDE, IINC, 1, 0, 0, 5, WIDE, 0x15, 1, 0, RETURN];
        assert_eq!(opcodes(&code), vec![(0, WIDE), (6, WIDE), (10, RETURN)]);
    }

    #[test]
    fn test_member_index() {
        let code = [INVOKEDYNAMIC, 0x01, 0x02, 0, 0];
        let instruction = Instructions::new(&code).next().unwrap().unwrap();
        assert_eq!(instruction.member_index(), Some(0x0102));
    }

    #[test]
    fn test_truncated_operands() {
        let code = [GETSTATIC, 0];
        let mut iter = Instructions::new(&code);
        assert!(matches!(
            iter.next(),
            Some(Err(ClassFileError::TruncatedInstruction(0)))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_unknown_opcode() {
        let code = [NOP, 0xfe];
        let result: Result<Vec<_>> = Instructions::new(&code).collect();
        assert!(matches!(
            result,
            Err(ClassFileError::UnknownOpcode {
                opcode: 0xfe,
                offset: 1
            })
        ));
    }
}
