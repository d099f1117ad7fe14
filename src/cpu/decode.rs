//! Instruction decoder for the LC-3.
//!
//! Every instruction is one 16-bit word. Bits 15-12 select the opcode and the
//! remaining 12 bits are laid out per opcode:
//!
//! ```text
//!  15  12 11  9 8   6 5 4   0
//! +------+-----+-----+-+-----+
//! |  op  | DR  | SR1 |i| imm |   ADD / AND
//! +------+-----+-----+-+-----+
//! |  op  | DR  |    PCoffset9 |  LD / LDI / LEA / ST / STI
//! +------+-----+-----+-------+
//! |  op  | DR  |BaseR| off6  |   LDR / STR
//! +------+-----+-----+-------+
//! ```

use serde::{Deserialize, Serialize};

use crate::cpu::arith::{bits, sign_extend};
use crate::cpu::registers::CondFlags;

/// The sixteen opcode values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Br = 0,
    Add = 1,
    Ld = 2,
    St = 3,
    Jsr = 4,
    And = 5,
    Ldr = 6,
    Str = 7,
    Rti = 8,
    Not = 9,
    Ldi = 10,
    Sti = 11,
    Jmp = 12,
    Reserved = 13,
    Lea = 14,
    Trap = 15,
}

impl Opcode {
    /// The opcode in bits 15-12 of `word`.
    pub fn from_word(word: u16) -> Self {
        match word >> 12 {
            0 => Opcode::Br,
            1 => Opcode::Add,
            2 => Opcode::Ld,
            3 => Opcode::St,
            4 => Opcode::Jsr,
            5 => Opcode::And,
            6 => Opcode::Ldr,
            7 => Opcode::Str,
            8 => Opcode::Rti,
            9 => Opcode::Not,
            10 => Opcode::Ldi,
            11 => Opcode::Sti,
            12 => Opcode::Jmp,
            13 => Opcode::Reserved,
            14 => Opcode::Lea,
            _ => Opcode::Trap,
        }
    }

    /// Numeric value as it appears in bits 15-12.
    pub fn bits(self) -> u16 {
        self as u16
    }
}

/// Second operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Bit 5 clear: SR2 in bits 2-0
    Reg(u8),
    /// Bit 5 set: sign-extended imm5
    Imm(i16),
}

/// Decoded LC-3 instruction.
///
/// Offsets are already sign-extended. Register fields are 0-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + operand
    Add { dr: u8, sr1: u8, operand: Operand },

    /// DR := SR1 & operand
    And { dr: u8, sr1: u8, operand: Operand },

    /// DR := !SR
    Not { dr: u8, sr: u8 },

    // ==================== Control Flow ====================

    /// if (mask & COND) != 0 then PC := PC + offset
    Br { mask: CondFlags, offset: i16 },

    /// PC := BaseR (RET when BaseR is R7)
    Jmp { base: u8 },

    /// R7 := PC; PC := PC + offset
    Jsr { offset: i16 },

    /// R7 := PC; PC := BaseR
    Jsrr { base: u8 },

    /// R7 := PC; call system routine
    Trap { vector: u8 },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset]
    Ld { dr: u8, offset: i16 },

    /// DR := mem[mem[PC + offset]]
    Ldi { dr: u8, offset: i16 },

    /// DR := mem[BaseR + offset]
    Ldr { dr: u8, base: u8, offset: i16 },

    /// DR := PC + offset
    Lea { dr: u8, offset: i16 },

    /// mem[PC + offset] := SR
    St { sr: u8, offset: i16 },

    /// mem[mem[PC + offset]] := SR
    Sti { sr: u8, offset: i16 },

    /// mem[BaseR + offset] := SR
    Str { sr: u8, base: u8, offset: i16 },

    // ==================== Unsupported ====================

    /// RTI or the reserved opcode.
    Unsupported(Opcode),
}

#[inline]
fn reg(word: u16, lsb: u32) -> u8 {
    bits(word, lsb, 3) as u8
}

#[inline]
fn offset(word: u16, width: u32) -> i16 {
    sign_extend(word, width) as i16
}

/// Decode a 16-bit instruction word.
///
/// Decoding never fails: the two opcodes without a handler come back as
/// [`Instruction::Unsupported`] and are rejected at execution time.
pub fn decode(word: u16) -> Instruction {
    let dr = reg(word, 9);
    let sr1 = reg(word, 6);

    match Opcode::from_word(word) {
        op @ (Opcode::Add | Opcode::And) => {
            let operand = if bits(word, 5, 1) == 1 {
                Operand::Imm(offset(word, 5))
            } else {
                Operand::Reg(reg(word, 0))
            };
            if op == Opcode::Add {
                Instruction::Add { dr, sr1, operand }
            } else {
                Instruction::And { dr, sr1, operand }
            }
        }
        Opcode::Not => Instruction::Not { dr, sr: sr1 },
        Opcode::Br => Instruction::Br {
            mask: CondFlags::from_bits_truncate(bits(word, 9, 3)),
            offset: offset(word, 9),
        },
        Opcode::Jmp => Instruction::Jmp { base: sr1 },
        Opcode::Jsr => {
            if bits(word, 11, 1) == 1 {
                Instruction::Jsr { offset: offset(word, 11) }
            } else {
                Instruction::Jsrr { base: sr1 }
            }
        }
        Opcode::Trap => Instruction::Trap { vector: bits(word, 0, 8) as u8 },
        Opcode::Ld => Instruction::Ld { dr, offset: offset(word, 9) },
        Opcode::Ldi => Instruction::Ldi { dr, offset: offset(word, 9) },
        Opcode::Ldr => Instruction::Ldr { dr, base: sr1, offset: offset(word, 6) },
        Opcode::Lea => Instruction::Lea { dr, offset: offset(word, 9) },
        Opcode::St => Instruction::St { sr: dr, offset: offset(word, 9) },
        Opcode::Sti => Instruction::Sti { sr: dr, offset: offset(word, 9) },
        Opcode::Str => Instruction::Str { sr: dr, base: sr1, offset: offset(word, 6) },
        op @ (Opcode::Rti | Opcode::Reserved) => Instruction::Unsupported(op),
    }
}

/// Encode an instruction back to a word.
///
/// Fields are truncated to their encoded width, so out-of-range offsets wrap
/// rather than fail.
pub fn encode(instr: &Instruction) -> u16 {
    fn field(value: i16, width: u32) -> u16 {
        (value as u16) & ((1 << width) - 1)
    }
    fn r(value: u8, lsb: u32) -> u16 {
        ((value & 0x7) as u16) << lsb
    }
    fn operate(op: Opcode, dr: u8, sr1: u8, operand: Operand) -> u16 {
        let tail = match operand {
            Operand::Reg(sr2) => r(sr2, 0),
            Operand::Imm(imm) => 1 << 5 | field(imm, 5),
        };
        op.bits() << 12 | r(dr, 9) | r(sr1, 6) | tail
    }

    match *instr {
        Instruction::Add { dr, sr1, operand } => operate(Opcode::Add, dr, sr1, operand),
        Instruction::And { dr, sr1, operand } => operate(Opcode::And, dr, sr1, operand),
        Instruction::Not { dr, sr } => Opcode::Not.bits() << 12 | r(dr, 9) | r(sr, 6) | 0x3F,
        Instruction::Br { mask, offset } => {
            Opcode::Br.bits() << 12 | (mask.bits() & 0x7) << 9 | field(offset, 9)
        }
        Instruction::Jmp { base } => Opcode::Jmp.bits() << 12 | r(base, 6),
        Instruction::Jsr { offset } => Opcode::Jsr.bits() << 12 | 1 << 11 | field(offset, 11),
        Instruction::Jsrr { base } => Opcode::Jsr.bits() << 12 | r(base, 6),
        Instruction::Trap { vector } => Opcode::Trap.bits() << 12 | vector as u16,
        Instruction::Ld { dr, offset } => Opcode::Ld.bits() << 12 | r(dr, 9) | field(offset, 9),
        Instruction::Ldi { dr, offset } => Opcode::Ldi.bits() << 12 | r(dr, 9) | field(offset, 9),
        Instruction::Ldr { dr, base, offset } => {
            Opcode::Ldr.bits() << 12 | r(dr, 9) | r(base, 6) | field(offset, 6)
        }
        Instruction::Lea { dr, offset } => Opcode::Lea.bits() << 12 | r(dr, 9) | field(offset, 9),
        Instruction::St { sr, offset } => Opcode::St.bits() << 12 | r(sr, 9) | field(offset, 9),
        Instruction::Sti { sr, offset } => Opcode::Sti.bits() << 12 | r(sr, 9) | field(offset, 9),
        Instruction::Str { sr, base, offset } => {
            Opcode::Str.bits() << 12 | r(sr, 9) | r(base, 6) | field(offset, 6)
        }
        Instruction::Unsupported(op) => op.bits() << 12,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_from_every_nibble() {
        for nibble in 0u16..16 {
            let op = Opcode::from_word(nibble << 12 | 0x0ABC);
            assert_eq!(op.bits(), nibble);
        }
    }

    #[test]
    fn test_unsupported_opcodes() {
        assert_eq!(decode(0x8000), Instruction::Unsupported(Opcode::Rti));
        assert_eq!(decode(0xD123), Instruction::Unsupported(Opcode::Reserved));
    }

    #[test]
    fn test_decode_add_register() {
        // ADD R2, R3, R4
        assert_eq!(
            decode(0x14C4),
            Instruction::Add { dr: 2, sr1: 3, operand: Operand::Reg(4) }
        );
    }

    #[test]
    fn test_decode_add_immediate() {
        // ADD R1, R0, #-1
        assert_eq!(
            decode(0x123F),
            Instruction::Add { dr: 1, sr1: 0, operand: Operand::Imm(-1) }
        );
    }

    #[test]
    fn test_decode_and_immediate_zero() {
        // AND R0, R0, #0
        assert_eq!(
            decode(0x5020),
            Instruction::And { dr: 0, sr1: 0, operand: Operand::Imm(0) }
        );
    }

    #[test]
    fn test_decode_br() {
        // BRnzp #-1
        let instr = decode(0x0FFF);
        assert_eq!(instr, Instruction::Br { mask: CondFlags::all(), offset: -1 });

        // BRz #3
        assert_eq!(decode(0x0403), Instruction::Br { mask: CondFlags::ZERO, offset: 3 });
    }

    #[test]
    fn test_decode_jsr_and_jsrr() {
        assert_eq!(decode(0x4FFE), Instruction::Jsr { offset: -2 });
        assert_eq!(decode(0x4C00), Instruction::Jsr { offset: -1024 });
        // Bit 11 alone picks JSR over JSRR; bit 10 is part of the offset.
        assert_eq!(decode(0x4400), Instruction::Jsrr { base: 0 });
        assert_eq!(decode(0x4080), Instruction::Jsrr { base: 2 });
    }

    #[test]
    fn test_decode_ret() {
        assert_eq!(decode(0xC1C0), Instruction::Jmp { base: 7 });
    }

    #[test]
    fn test_decode_memory_forms() {
        assert_eq!(decode(0x2A05), Instruction::Ld { dr: 5, offset: 5 });
        assert_eq!(decode(0xA1FF), Instruction::Ldi { dr: 0, offset: -1 });
        assert_eq!(decode(0x6A7F), Instruction::Ldr { dr: 5, base: 1, offset: -1 });
        assert_eq!(decode(0xE202), Instruction::Lea { dr: 1, offset: 2 });
        assert_eq!(decode(0x3E10), Instruction::St { sr: 7, offset: 16 });
        assert_eq!(decode(0xB400), Instruction::Sti { sr: 2, offset: 0 });
        assert_eq!(decode(0x7460), Instruction::Str { sr: 2, base: 1, offset: -32 });
    }

    #[test]
    fn test_decode_trap() {
        assert_eq!(decode(0xF025), Instruction::Trap { vector: 0x25 });
    }

    #[test]
    fn test_encode_known_words() {
        assert_eq!(encode(&Instruction::Trap { vector: 0x25 }), 0xF025);
        assert_eq!(encode(&Instruction::Jmp { base: 7 }), 0xC1C0);
        assert_eq!(encode(&Instruction::Not { dr: 1, sr: 2 }), 0x92BF);
        assert_eq!(
            encode(&Instruction::Add { dr: 1, sr1: 0, operand: Operand::Imm(5) }),
            0x1225
        );
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let test_cases = [
            Instruction::And { dr: 7, sr1: 6, operand: Operand::Reg(5) },
            Instruction::Br { mask: CondFlags::NEGATIVE | CondFlags::POSITIVE, offset: -256 },
            Instruction::Jsr { offset: 1023 },
            Instruction::Ldr { dr: 3, base: 6, offset: 31 },
            Instruction::Sti { sr: 4, offset: 255 },
        ];

        for instr in test_cases {
            assert_eq!(decode(encode(&instr)), instr);
        }
    }
}
