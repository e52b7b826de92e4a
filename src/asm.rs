//! Instruction encoder for the supported RV64 subset.
//!
//! Register arguments are architectural register numbers. Immediates are
//! signed byte offsets and are truncated to the width of their field.

use crate::cpu::decode::{OP_BRANCH, OP_I_ARITH, OP_JAL, OP_JALR, OP_LOAD, OP_R, OP_STORE};

pub fn r_type(funct7: u32, rs2: u8, rs1: u8, funct3: u32, rd: u8) -> u32 {
    (funct7 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((rd as u32) << 7)
        | OP_R
}

pub fn i_type(imm: i32, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    (((imm as u32) & 0xfff) << 20) | ((rs1 as u32) << 15) | (funct3 << 12) | ((rd as u32) << 7) | opcode
}

pub fn s_type(imm: i32, rs2: u8, rs1: u8, funct3: u32) -> u32 {
    let imm = imm as u32;
    let imm11_5 = (imm >> 5) & 0x7f;
    let imm4_0 = imm & 0x1f;
    (imm11_5 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | (imm4_0 << 7)
        | OP_STORE
}

pub fn b_type(imm: i32, rs2: u8, rs1: u8, funct3: u32) -> u32 {
    let imm = imm as u32;
    let imm12 = (imm >> 12) & 0x1;
    let imm10_5 = (imm >> 5) & 0x3f;
    let imm4_1 = (imm >> 1) & 0xf;
    let imm11 = (imm >> 11) & 0x1;
    (imm12 << 31)
        | (imm10_5 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | (imm4_1 << 8)
        | (imm11 << 7)
        | OP_BRANCH
}

pub fn j_type(imm: i32, rd: u8) -> u32 {
    let imm = imm as u32;
    let imm20 = (imm >> 20) & 0x1;
    let imm10_1 = (imm >> 1) & 0x3ff;
    let imm11 = (imm >> 11) & 0x1;
    let imm19_12 = (imm >> 12) & 0xff;
    (imm20 << 31) | (imm10_1 << 21) | (imm11 << 20) | (imm19_12 << 12) | ((rd as u32) << 7) | OP_JAL
}

/// ADD: rd = rs1 + rs2
pub fn add(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0b0000000, rs2, rs1, 0b000, rd)
}

/// SUB: rd = rs1 - rs2
pub fn sub(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0b0100000, rs2, rs1, 0b000, rd)
}

/// MUL: rd = rs1 * rs2
pub fn mul(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0b0000001, rs2, rs1, 0b000, rd)
}

/// SLL: rd = rs1 << rs2
pub fn sll(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0b0000000, rs2, rs1, 0b001, rd)
}

/// DIV: rd = rs1 / rs2
pub fn div(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0b0000001, rs2, rs1, 0b100, rd)
}

/// SRL: rd = rs1 >> rs2
pub fn srl(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0b0000000, rs2, rs1, 0b101, rd)
}

/// REM: rd = rs1 % rs2
pub fn rem(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0b0000001, rs2, rs1, 0b110, rd)
}

/// AND: rd = rs1 & rs2
pub fn and(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0b0000000, rs2, rs1, 0b111, rd)
}

/// ADDI: rd = rs1 + imm
pub fn addi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(imm, rs1, 0b000, rd, OP_I_ARITH)
}

/// LI: rd = imm (12-bit)
pub fn li(rd: u8, imm: i32) -> u32 {
    addi(rd, 0, imm)
}

/// SRLI: rd = rs1 >> shamt
pub fn srli(rd: u8, rs1: u8, shamt: u8) -> u32 {
    i_type((shamt & 0x1f) as i32, rs1, 0b101, rd, OP_I_ARITH)
}

/// LB: rd = mem[rs1 + imm] (one byte)
pub fn lb(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(imm, rs1, 0b000, rd, OP_LOAD)
}

/// LD: rd = mem[rs1 + imm] (eight bytes)
pub fn ld(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(imm, rs1, 0b011, rd, OP_LOAD)
}

/// SB: mem[rs1 + imm] = rs2 (low byte)
pub fn sb(rs1: u8, rs2: u8, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0b000)
}

/// SD: mem[rs1 + imm] = rs2
pub fn sd(rs1: u8, rs2: u8, imm: i32) -> u32 {
    s_type(imm, rs2, rs1, 0b011)
}

/// JAL: rd = pc + 4; pc = pc + imm
pub fn jal(rd: u8, imm: i32) -> u32 {
    j_type(imm, rd)
}

/// JALR: pc = rs1
pub fn jalr(rs1: u8) -> u32 {
    i_type(0, rs1, 0b000, 0, OP_JALR)
}

/// RET: pc = ra
pub fn ret() -> u32 {
    jalr(1)
}

/// BEQ: if rs1 == rs2, pc = pc + imm
pub fn beq(rs1: u8, rs2: u8, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 0b000)
}

/// BNE: if rs1 != rs2, pc = pc + imm
pub fn bne(rs1: u8, rs2: u8, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 0b001)
}

/// BLT: if rs1 < rs2 (signed), pc = pc + imm
pub fn blt(rs1: u8, rs2: u8, imm: i32) -> u32 {
    b_type(imm, rs2, rs1, 0b100)
}
