pub mod analysis;
pub mod decode;
pub mod exec;
pub mod trap;

use crate::cache::Cache;
use crate::mem::{Bus, Memory};
use analysis::Analysis;
use trap::{Trap, WithPc};

// ABI register numbers
pub const RV_ZERO: usize = 0;
pub const RV_RA: usize = 1;
pub const RV_SP: usize = 2;
pub const RV_A0: usize = 10;
pub const RV_A1: usize = 11;
pub const RV_A2: usize = 12;
pub const RV_A3: usize = 13;
pub const RV_NUM_REGS: usize = 32;

/// Return address that ends the run once jumped to.
pub const RV_STOP: u64 = 0;

pub const STACK_SIZE: usize = 8192;
/// The stack occupies `[STACK_BASE, STACK_BASE + STACK_SIZE)` and grows down.
pub const STACK_BASE: u64 = 0x7ff0_0000;

/// Whether `[start, start + len)` intersects the stack region. Host memory
/// placed there would be shadowed by the stack for loads and stores.
pub fn overlaps_stack(start: u64, len: u64) -> bool {
    let stack_end = STACK_BASE + STACK_SIZE as u64;
    len > 0 && start < stack_end && start.saturating_add(len) > STACK_BASE
}

#[derive(Debug, Default, Clone)]
pub struct Cpu {
    pub regs: [u64; RV_NUM_REGS],
    pub pc: u64,
}

impl Cpu {
    #[inline]
    pub fn reg(&self, idx: u8) -> u64 {
        self.regs[idx as usize]
    }

    /// Writes are not filtered: storing to x0 sticks.
    #[inline]
    pub fn set_reg(&mut self, idx: u8, val: u64) {
        self.regs[idx as usize] = val;
    }
}

/// State of one emulation run.
///
/// Loads and stores whose full extent lies in the stack go to the
/// machine-owned stack; everything else, including instruction fetch, goes to
/// `mem`.
pub struct Machine<B: Bus = Memory> {
    pub cpu: Cpu,
    pub mem: B,
    pub stack: Memory,
    pub analysis: Analysis,
    pub icache: Cache,
}

impl<B: Bus> Machine<B> {
    /// Prepares a call of the function at `entry` with `args` in a0..a3.
    pub fn new(mem: B, entry: u64, args: [u64; 4]) -> Self {
        let mut cpu = Cpu {
            pc: entry,
            ..Cpu::default()
        };
        cpu.regs[RV_A0] = args[0];
        cpu.regs[RV_A1] = args[1];
        cpu.regs[RV_A2] = args[2];
        cpu.regs[RV_A3] = args[3];
        cpu.regs[RV_ZERO] = 0;
        cpu.regs[RV_RA] = RV_STOP;
        cpu.regs[RV_SP] = STACK_BASE + STACK_SIZE as u64;

        Self {
            cpu,
            mem,
            stack: Memory::with_base(STACK_BASE, STACK_SIZE),
            analysis: Analysis::default(),
            icache: Cache::disabled(),
        }
    }

    pub fn with_icache(mut self, icache: Cache) -> Self {
        self.icache = icache;
        self
    }

    pub fn is_stopped(&self) -> bool {
        self.cpu.pc == RV_STOP
    }

    /// Runs until the PC reaches [`RV_STOP`] and returns a0.
    pub fn run(&mut self) -> Result<u64, Trap> {
        while !self.is_stopped() {
            self.step()?;
        }
        log::debug!(
            "stopped after {} instructions, a0=0x{:x}",
            self.analysis.i_count,
            self.cpu.regs[RV_A0]
        );
        Ok(self.cpu.regs[RV_A0])
    }

    /// Executes exactly one instruction.
    pub fn step(&mut self) -> Result<(), Trap> {
        if log::log_enabled!(log::Level::Trace) {
            crate::debug::trace(&self.cpu, self.analysis.i_count);
        }

        // Fetch
        let pc = self.cpu.pc;
        let inst = self.icache.lookup(pc, &self.mem).with_pc(pc)?;

        // Decode
        let decoded = decode::decode(inst).with_pc(pc)?;

        // Execute
        exec::execute(self, decoded)
    }

    pub(crate) fn data(&self, addr: u64, size: u64) -> &dyn Bus {
        if self.stack.contains(addr, size) {
            &self.stack
        } else {
            &self.mem
        }
    }

    pub(crate) fn data_mut(&mut self, addr: u64, size: u64) -> &mut dyn Bus {
        if self.stack.contains(addr, size) {
            &mut self.stack
        } else {
            &mut self.mem
        }
    }
}
