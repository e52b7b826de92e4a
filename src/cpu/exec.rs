use super::Machine;
use super::analysis::Analysis;
use super::decode::Instr;
use super::trap::{Trap, WithPc};
use crate::mem::Bus;

fn count(a: &mut Analysis, instr: &Instr) {
    a.i_count += 1;
    match instr {
        Instr::Add { .. }
        | Instr::Sub { .. }
        | Instr::Mul { .. }
        | Instr::Sll { .. }
        | Instr::Div { .. }
        | Instr::Srl { .. }
        | Instr::Rem { .. }
        | Instr::And { .. }
        | Instr::Addi { .. }
        | Instr::Srli { .. } => a.ir_count += 1,
        Instr::Lb { .. } | Instr::Ld { .. } => a.ld_count += 1,
        Instr::Sb { .. } | Instr::Sd { .. } => a.st_count += 1,
        Instr::Jal { .. } | Instr::Jalr { .. } => a.j_count += 1,
        // counted as taken or not taken below
        Instr::Beq { .. } | Instr::Bne { .. } | Instr::Blt { .. } => {}
    }
}

pub fn execute<B: Bus>(m: &mut Machine<B>, instr: Instr) -> Result<(), Trap> {
    let pc = m.cpu.pc;

    match instr {
        Instr::Add { rd, rs1, rs2 } => {
            m.cpu.set_reg(rd, m.cpu.reg(rs1).wrapping_add(m.cpu.reg(rs2)));
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Sub { rd, rs1, rs2 } => {
            m.cpu.set_reg(rd, m.cpu.reg(rs1).wrapping_sub(m.cpu.reg(rs2)));
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Mul { rd, rs1, rs2 } => {
            m.cpu.set_reg(rd, m.cpu.reg(rs1).wrapping_mul(m.cpu.reg(rs2)));
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Sll { rd, rs1, rs2 } => {
            let shamt = (m.cpu.reg(rs2) & 0x3f) as u32;
            m.cpu.set_reg(rd, m.cpu.reg(rs1).wrapping_shl(shamt));
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Div { rd, rs1, rs2 } => {
            // unsigned; x / 0 gives all ones
            let q = m.cpu.reg(rs1).checked_div(m.cpu.reg(rs2)).unwrap_or(u64::MAX);
            m.cpu.set_reg(rd, q);
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Srl { rd, rs1, rs2 } => {
            let shamt = (m.cpu.reg(rs2) & 0x3f) as u32;
            m.cpu.set_reg(rd, m.cpu.reg(rs1).wrapping_shr(shamt));
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Rem { rd, rs1, rs2 } => {
            // unsigned; x % 0 gives x
            let a = m.cpu.reg(rs1);
            m.cpu.set_reg(rd, a.checked_rem(m.cpu.reg(rs2)).unwrap_or(a));
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::And { rd, rs1, rs2 } => {
            m.cpu.set_reg(rd, m.cpu.reg(rs1) & m.cpu.reg(rs2));
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Addi { rd, rs1, imm } => {
            m.cpu.set_reg(rd, m.cpu.reg(rs1).wrapping_add(imm as u64));
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Srli { rd, rs1, shamt } => {
            m.cpu.set_reg(rd, m.cpu.reg(rs1) >> shamt);
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Lb { rd, rs1, off } => {
            let addr = m.cpu.reg(rs1).wrapping_add(off);
            let byte = m.data(addr, 1).read_u8(addr).with_pc(pc)?;
            m.cpu.set_reg(rd, byte as u64);
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Ld { rd, rs1, off } => {
            let addr = m.cpu.reg(rs1).wrapping_add(off);
            let word = m.data(addr, 8).read_u64(addr).with_pc(pc)?;
            m.cpu.set_reg(rd, word);
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Sb { rs1, rs2, off } => {
            let addr = m.cpu.reg(rs1).wrapping_add(off);
            let byte = (m.cpu.reg(rs2) & 0xff) as u8;
            m.data_mut(addr, 1).write_u8(addr, byte).with_pc(pc)?;
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Sd { rs1, rs2, off } => {
            let addr = m.cpu.reg(rs1).wrapping_add(off);
            let val = m.cpu.reg(rs2);
            m.data_mut(addr, 8).write_u64(addr, val).with_pc(pc)?;
            m.cpu.pc = pc.wrapping_add(4);
        }
        Instr::Jal { rd, off } => {
            if rd != 0 {
                m.cpu.set_reg(rd, pc.wrapping_add(4));
            }
            m.cpu.pc = pc.wrapping_add(off as u64);
        }
        Instr::Jalr { rs1 } => {
            m.cpu.pc = m.cpu.reg(rs1);
        }
        Instr::Beq { rs1, rs2, off } => {
            let taken = (m.cpu.reg(rs1) as i64) == (m.cpu.reg(rs2) as i64);
            branch(m, pc, taken, off);
        }
        Instr::Bne { rs1, rs2, off } => {
            let taken = (m.cpu.reg(rs1) as i64) != (m.cpu.reg(rs2) as i64);
            branch(m, pc, taken, off);
        }
        Instr::Blt { rs1, rs2, off } => {
            let taken = (m.cpu.reg(rs1) as i64) < (m.cpu.reg(rs2) as i64);
            branch(m, pc, taken, off);
        }
    }
    // faulting instructions are not counted
    count(&mut m.analysis, &instr);
    Ok(())
}

fn branch<B: Bus>(m: &mut Machine<B>, pc: u64, taken: bool, off: i64) {
    if taken {
        m.analysis.b_taken += 1;
        m.cpu.pc = pc.wrapping_add(off as u64);
    } else {
        m.analysis.b_not_taken += 1;
        m.cpu.pc = pc.wrapping_add(4);
    }
}
