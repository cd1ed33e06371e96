//! Instruction boundaries of a `Code` attribute.
//!
//! Only lengths are decoded; operands are handed out as raw slices.

use crate::error::{ClassFileError, Result};

pub(crate) const GETSTATIC: u8 = 0xB2;

const TABLESWITCH: u8 = 0xAA;
const LOOKUPSWITCH: u8 = 0xAB;
const WIDE: u8 = 0xC4;
const IINC: u8 = 0x84;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub offset: usize,
    pub opcode: u8,
    /// Operand bytes following the opcode (including switch padding).
    pub operands: &'a [u8],
}

impl Instruction<'_> {
    /// First two operand bytes as a constant pool index.
    pub fn index_operand(&self) -> Option<u16> {
        match self.operands {
            [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }
}

/// Iterator over the instructions of a method body.
///
/// Yields an error and then stops at the first undecodable instruction.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    code: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            pos: 0,
            failed: false,
        }
    }

    fn decode(&self) -> Result<Instruction<'a>> {
        let offset = self.pos;
        let opcode = self.code[offset];
        let len = match opcode {
            TABLESWITCH => self.tableswitch_len(offset)?,
            LOOKUPSWITCH => self.lookupswitch_len(offset)?,
            WIDE => match self.code.get(offset + 1) {
                Some(&IINC) => 6,
                Some(_) => 4,
                None => return Err(ClassFileError::UnexpectedEof),
            },
            _ => fixed_len(opcode).ok_or(ClassFileError::InvalidOpcode { opcode, offset })?,
        };

        let end = offset + len;
        if end > self.code.len() {
            return Err(ClassFileError::UnexpectedEof);
        }
        Ok(Instruction {
            offset,
            opcode,
            operands: &self.code[offset + 1..end],
        })
    }

    fn read_i4(&self, at: usize) -> Result<i32> {
        self.code
            .get(at..at + 4)
            .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or(ClassFileError::UnexpectedEof)
    }

    /// Operands start on the next 4-byte boundary relative to the method start.
    fn switch_operands(offset: usize) -> usize {
        let after = offset + 1;
        after + (4 - after % 4) % 4
    }

    fn tableswitch_len(&self, offset: usize) -> Result<usize> {
        let base = Self::switch_operands(offset);
        let low = self.read_i4(base + 4)? as i64;
        let high = self.read_i4(base + 8)? as i64;
        if high < low {
            return Err(ClassFileError::MalformedAttribute("Code"));
        }
        let jumps = (high - low + 1) as usize;
        Ok(base + 12 + jumps * 4 - offset)
    }

    fn lookupswitch_len(&self, offset: usize) -> Result<usize> {
        let base = Self::switch_operands(offset);
        let npairs = self.read_i4(base + 4)?;
        if npairs < 0 {
            return Err(ClassFileError::MalformedAttribute("Code"));
        }
        Ok(base + 8 + npairs as usize * 8 - offset)
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.code.len() {
            return None;
        }
        match self.decode() {
            Ok(insn) => {
                self.pos += 1 + insn.operands.len();
                Some(Ok(insn))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Total length (opcode included) of fixed-size instructions.
fn fixed_len(opcode: u8) -> Option<usize> {
    let len = match opcode {
        0x00..=0x0F => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13 | 0x14 => 3,
        0x15..=0x19 => 2,
        0x1A..=0x35 => 1,
        0x36..=0x3A => 2,
        0x3B..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xA8 => 3,
        0xA9 => 2,
        0xAC..=0xB1 => 1,
        0xB2..=0xB8 => 3,
        0xB9 | 0xBA => 5,
        0xBB => 3,
        0xBC => 2,
        0xBD => 3,
        0xBE | 0xBF => 1,
        0xC0 | 0xC1 => 3,
        0xC2 | 0xC3 => 1,
        0xC5 => 4,
        0xC6 | 0xC7 => 3,
        0xC8 | 0xC9 => 5,
        0xCA | 0xFE | 0xFF => 1,
        _ => return None,
    };
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcodes(code: &[u8]) -> Vec<(usize, u8)> {
        Instructions::new(code)
            .map(|insn| insn.map(|i| (i.offset, i.opcode)))
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn walks_fixed_width_instructions() {
        // aload_0; getstatic #7; pop; iinc 1 1; return
        let code = [0x2A, 0xB2, 0x00, 0x07, 0x57, 0x84, 0x01, 0x01, 0xB1];
        assert_eq!(
            opcodes(&code),
            vec![(0, 0x2A), (1, 0xB2), (4, 0x57), (5, 0x84), (8, 0xB1)]
        );
        let getstatic = Instructions::new(&code).nth(1).unwrap().unwrap();
        assert_eq!(getstatic.index_operand(), Some(7));
    }

    #[test]
    fn tableswitch_padding_is_relative_to_code_start() {
        // iload_0 at 0, tableswitch at 1: operands start at 4.
        let mut code = vec![0x1A, TABLESWITCH, 0, 0];
        code.extend_from_slice(&16i32.to_be_bytes()); // default
        code.extend_from_slice(&0i32.to_be_bytes()); // low
        code.extend_from_slice(&1i32.to_be_bytes()); // high
        code.extend_from_slice(&16i32.to_be_bytes());
        code.extend_from_slice(&16i32.to_be_bytes());
        code.push(0xB1);
        assert_eq!(opcodes(&code), vec![(0, 0x1A), (1, TABLESWITCH), (24, 0xB1)]);
    }

    #[test]
    fn lookupswitch_and_wide() {
        let mut code = vec![LOOKUPSWITCH, 0, 0, 0];
        code.extend_from_slice(&12i32.to_be_bytes()); // default
        code.extend_from_slice(&1i32.to_be_bytes()); // npairs
        code.extend_from_slice(&5i32.to_be_bytes());
        code.extend_from_slice(&12i32.to_be_bytes());
        code.extend_from_slice(&[WIDE, IINC, 0, 1, 0, 1]);
        code.extend_from_slice(&[WIDE, 0x15, 0, 1]);
        assert_eq!(
            opcodes(&code),
            vec![(0, LOOKUPSWITCH), (20, WIDE), (26, WIDE)]
        );
    }

    #[test]
    fn undefined_opcode_stops_iteration() {
        let mut iter = Instructions::new(&[0x00, 0xE0, 0x00]);
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(
            iter.next(),
            Some(Err(ClassFileError::InvalidOpcode { opcode: 0xE0, offset: 1 }))
        ));
        assert!(iter.next().is_none());
    }
}
