use std::fmt;

use crate::bits::{extract_bit, extract_bits, sign_extend};

pub const OP_R: u32 = 0b0110011;
pub const OP_I_ARITH: u32 = 0b0010011;
pub const OP_LOAD: u32 = 0b0000011;
pub const OP_STORE: u32 = 0b0100011;
pub const OP_JAL: u32 = 0b1101111;
pub const OP_JALR: u32 = 0b1100111;
pub const OP_BRANCH: u32 = 0b1100011;

/// Instruction format, used to give decode errors some context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    R,
    IArith,
    Load,
    Store,
    Branch,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::R => write!(f, "R-type"),
            Format::IArith => write!(f, "I-type"),
            Format::Load => write!(f, "I-type (load)"),
            Format::Store => write!(f, "S-type"),
            Format::Branch => write!(f, "B-type"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    UnsupportedOpcode { opcode: u32 },
    UnsupportedFunct3 { format: Format, funct3: u32 },
    UnsupportedFunct7 { format: Format, funct7: u32 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnsupportedOpcode { opcode } => {
                write!(f, "unsupported opcode 0b{:07b}", opcode)
            }
            DecodeError::UnsupportedFunct3 { format, funct3 } => {
                write!(f, "unsupported {} funct3 0b{:03b}", format, funct3)
            }
            DecodeError::UnsupportedFunct7 { format, funct7 } => {
                write!(f, "unsupported {} funct7 0b{:07b}", format, funct7)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instr {
    // R-type (0b0110011)
    Add { rd: u8, rs1: u8, rs2: u8 },
    Sub { rd: u8, rs1: u8, rs2: u8 },
    Mul { rd: u8, rs1: u8, rs2: u8 },
    Sll { rd: u8, rs1: u8, rs2: u8 },
    Div { rd: u8, rs1: u8, rs2: u8 },
    Srl { rd: u8, rs1: u8, rs2: u8 },
    Rem { rd: u8, rs1: u8, rs2: u8 },
    And { rd: u8, rs1: u8, rs2: u8 },
    // I-type arithmetic (0b0010011)
    Addi { rd: u8, rs1: u8, imm: i64 },
    Srli { rd: u8, rs1: u8, shamt: u8 },
    // I-type load (0b0000011); offsets are the raw 12-bit field
    Lb { rd: u8, rs1: u8, off: u64 },
    Ld { rd: u8, rs1: u8, off: u64 },
    // S-type (0b0100011); offsets are the raw 12-bit field
    Sb { rs1: u8, rs2: u8, off: u64 },
    Sd { rs1: u8, rs2: u8, off: u64 },
    // J-type (0b1101111)
    Jal { rd: u8, off: i64 },
    // I-type jump (0b1100111), only used as a return
    Jalr { rs1: u8 },
    // B-type (0b1100011)
    Beq { rs1: u8, rs2: u8, off: i64 },
    Bne { rs1: u8, rs2: u8, off: i64 },
    Blt { rs1: u8, rs2: u8, off: i64 },
}

#[inline]
fn rd(inst: u32) -> u8 {
    extract_bits(inst, 7, 5) as u8
}

#[inline]
fn rs1(inst: u32) -> u8 {
    extract_bits(inst, 15, 5) as u8
}

#[inline]
fn rs2(inst: u32) -> u8 {
    extract_bits(inst, 20, 5) as u8
}

#[inline]
fn funct3(inst: u32) -> u32 {
    extract_bits(inst, 12, 3)
}

#[inline]
fn funct7(inst: u32) -> u32 {
    extract_bits(inst, 25, 7)
}

/// Routes an instruction word to its format decoder by opcode.
pub fn decode(inst: u32) -> Result<Instr, DecodeError> {
    let opcode = extract_bits(inst, 0, 7);
    match opcode {
        OP_R => decode_r(inst),
        OP_I_ARITH => decode_i_arith(inst),
        OP_LOAD => decode_load(inst),
        OP_STORE => decode_store(inst),
        OP_JAL => Ok(decode_jal(inst)),
        OP_JALR => Ok(Instr::Jalr { rs1: rs1(inst) }),
        OP_BRANCH => decode_branch(inst),
        _ => Err(DecodeError::UnsupportedOpcode { opcode }),
    }
}

fn decode_r(inst: u32) -> Result<Instr, DecodeError> {
    let (rd, rs1, rs2) = (rd(inst), rs1(inst), rs2(inst));
    match (funct3(inst), funct7(inst)) {
        (0b000, 0b0000000) => Ok(Instr::Add { rd, rs1, rs2 }),
        (0b000, 0b0100000) => Ok(Instr::Sub { rd, rs1, rs2 }),
        (0b000, 0b0000001) => Ok(Instr::Mul { rd, rs1, rs2 }),
        (0b001, 0b0000000) => Ok(Instr::Sll { rd, rs1, rs2 }),
        (0b100, 0b0000001) => Ok(Instr::Div { rd, rs1, rs2 }),
        (0b101, 0b0000000) => Ok(Instr::Srl { rd, rs1, rs2 }),
        (0b110, 0b0000001) => Ok(Instr::Rem { rd, rs1, rs2 }),
        (0b111, 0b0000000) => Ok(Instr::And { rd, rs1, rs2 }),
        (0b000 | 0b001 | 0b100 | 0b101 | 0b110 | 0b111, funct7) => {
            Err(DecodeError::UnsupportedFunct7 {
                format: Format::R,
                funct7,
            })
        }
        (funct3, _) => Err(DecodeError::UnsupportedFunct3 {
            format: Format::R,
            funct3,
        }),
    }
}

fn decode_i_arith(inst: u32) -> Result<Instr, DecodeError> {
    let (rd, rs1) = (rd(inst), rs1(inst));
    match (funct3(inst), funct7(inst)) {
        (0b101, 0) => Ok(Instr::Srli {
            rd,
            rs1,
            shamt: extract_bits(inst, 20, 5) as u8,
        }),
        (0b101, funct7) => Err(DecodeError::UnsupportedFunct7 {
            format: Format::IArith,
            funct7,
        }),
        (0b000, _) => Ok(Instr::Addi {
            rd,
            rs1,
            imm: sign_extend(extract_bits(inst, 20, 12), 12) as i64,
        }),
        (funct3, _) => Err(DecodeError::UnsupportedFunct3 {
            format: Format::IArith,
            funct3,
        }),
    }
}

fn decode_load(inst: u32) -> Result<Instr, DecodeError> {
    let (rd, rs1) = (rd(inst), rs1(inst));
    let off = extract_bits(inst, 20, 12) as u64;
    match funct3(inst) {
        0b000 => Ok(Instr::Lb { rd, rs1, off }),
        0b011 => Ok(Instr::Ld { rd, rs1, off }),
        funct3 => Err(DecodeError::UnsupportedFunct3 {
            format: Format::Load,
            funct3,
        }),
    }
}

fn decode_store(inst: u32) -> Result<Instr, DecodeError> {
    let (rs1, rs2) = (rs1(inst), rs2(inst));
    let off = (extract_bits(inst, 7, 5) | (extract_bits(inst, 25, 7) << 5)) as u64;
    match funct3(inst) {
        0b000 => Ok(Instr::Sb { rs1, rs2, off }),
        0b011 => Ok(Instr::Sd { rs1, rs2, off }),
        funct3 => Err(DecodeError::UnsupportedFunct3 {
            format: Format::Store,
            funct3,
        }),
    }
}

fn decode_jal(inst: u32) -> Instr {
    let imm = (extract_bit(inst, 31) << 20)
        | (extract_bits(inst, 21, 10) << 1)
        | (extract_bit(inst, 20) << 11)
        | (extract_bits(inst, 12, 8) << 12);
    Instr::Jal {
        rd: rd(inst),
        off: sign_extend(imm, 21) as i64,
    }
}

fn decode_branch(inst: u32) -> Result<Instr, DecodeError> {
    let (rs1, rs2) = (rs1(inst), rs2(inst));
    let imm = (extract_bits(inst, 8, 4) << 1)
        | (extract_bit(inst, 7) << 11)
        | (extract_bit(inst, 31) << 12)
        | (extract_bits(inst, 25, 6) << 5);
    let off = sign_extend(imm, 13) as i64;

    match funct3(inst) {
        0b000 => Ok(Instr::Beq { rs1, rs2, off }),
        0b001 => Ok(Instr::Bne { rs1, rs2, off }),
        0b100 => Ok(Instr::Blt { rs1, rs2, off }),
        funct3 => Err(DecodeError::UnsupportedFunct3 {
            format: Format::Branch,
            funct3,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm;

    #[test]
    fn decodes_r_type_table() {
        assert_eq!(
            decode(asm::add(3, 4, 5)).unwrap(),
            Instr::Add { rd: 3, rs1: 4, rs2: 5 }
        );
        assert_eq!(
            decode(asm::sub(31, 1, 2)).unwrap(),
            Instr::Sub { rd: 31, rs1: 1, rs2: 2 }
        );
        assert_eq!(
            decode(asm::rem(10, 11, 12)).unwrap(),
            Instr::Rem { rd: 10, rs1: 11, rs2: 12 }
        );
    }

    #[test]
    fn known_funct3_unknown_funct7_is_funct7_error() {
        // sra: funct3 101 with funct7 0100000
        let sra = asm::r_type(0b0100000, 2, 1, 0b101, 3);
        assert_eq!(
            decode(sra),
            Err(DecodeError::UnsupportedFunct7 {
                format: Format::R,
                funct7: 0b0100000
            })
        );
        // slt: funct3 010 is not supported at all
        let slt = asm::r_type(0, 2, 1, 0b010, 3);
        assert_eq!(
            decode(slt),
            Err(DecodeError::UnsupportedFunct3 {
                format: Format::R,
                funct3: 0b010
            })
        );
    }

    #[test]
    fn unknown_opcode() {
        // lui
        let err = decode(0x0000_02b7).unwrap_err();
        assert_eq!(err, DecodeError::UnsupportedOpcode { opcode: 0b0110111 });
        assert_eq!(err.to_string(), "unsupported opcode 0b0110111");
    }

    #[test]
    fn addi_immediate_is_sign_extended() {
        assert_eq!(
            decode(asm::addi(2, 2, -16)).unwrap(),
            Instr::Addi { rd: 2, rs1: 2, imm: -16 }
        );
        assert_eq!(
            decode(asm::addi(1, 0, 2047)).unwrap(),
            Instr::Addi { rd: 1, rs1: 0, imm: 2047 }
        );
    }

    #[test]
    fn srli_requires_zero_funct7() {
        assert_eq!(
            decode(asm::srli(5, 6, 3)).unwrap(),
            Instr::Srli { rd: 5, rs1: 6, shamt: 3 }
        );
        // srai
        let srai = asm::i_type(0x400 | 3, 6, 0b101, 5, OP_I_ARITH);
        assert_eq!(
            decode(srai),
            Err(DecodeError::UnsupportedFunct7 {
                format: Format::IArith,
                funct7: 0b0100000
            })
        );
        // xori
        let xori = asm::i_type(1, 6, 0b100, 5, OP_I_ARITH);
        assert!(matches!(
            decode(xori),
            Err(DecodeError::UnsupportedFunct3 { funct3: 0b100, .. })
        ));
    }

    #[test]
    fn load_store_offsets_are_not_sign_extended() {
        assert_eq!(
            decode(asm::ld(5, 2, -8)).unwrap(),
            Instr::Ld { rd: 5, rs1: 2, off: 0xff8 }
        );
        assert_eq!(
            decode(asm::sd(2, 5, -8)).unwrap(),
            Instr::Sd { rs1: 2, rs2: 5, off: 0xff8 }
        );
        assert_eq!(
            decode(asm::sb(3, 4, 37)).unwrap(),
            Instr::Sb { rs1: 3, rs2: 4, off: 37 }
        );
        // lw
        let lw = asm::i_type(0, 2, 0b010, 5, OP_LOAD);
        assert_eq!(
            decode(lw),
            Err(DecodeError::UnsupportedFunct3 {
                format: Format::Load,
                funct3: 0b010
            })
        );
    }

    #[test]
    fn jump_and_branch_offsets() {
        for off in [-1_048_576i32, -4096, -8, 8, 2048, 1_048_574] {
            assert_eq!(
                decode(asm::jal(1, off)).unwrap(),
                Instr::Jal { rd: 1, off: off as i64 }
            );
        }
        for off in [-4096i32, -2, 2, 2048, 4094] {
            assert_eq!(
                decode(asm::blt(7, 8, off)).unwrap(),
                Instr::Blt { rs1: 7, rs2: 8, off: off as i64 }
            );
        }
        assert_eq!(decode(asm::ret()).unwrap(), Instr::Jalr { rs1: 1 });
        // bge
        let bge = asm::b_type(8, 2, 1, 0b101);
        assert!(matches!(
            decode(bge),
            Err(DecodeError::UnsupportedFunct3 { format: Format::Branch, .. })
        ));
    }
}
