use crate::cpu::{Cpu, RV_A0, RV_A1, RV_RA, RV_SP};

pub fn trace(cpu: &Cpu, step: u64) {
    log::trace!(
        "[{:08}] pc=0x{:016x} ra=0x{:016x} sp=0x{:016x} a0=0x{:016x} a1=0x{:016x}",
        step,
        cpu.pc,
        cpu.regs[RV_RA],
        cpu.regs[RV_SP],
        cpu.regs[RV_A0],
        cpu.regs[RV_A1]
    );
}
