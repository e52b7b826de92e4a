use rv_emu::asm::*;
use rv_emu::cache::{Cache, CacheConfig, CacheKind};
use rv_emu::cpu::decode::{DecodeError, Format};
use rv_emu::cpu::trap::Trap;
use rv_emu::cpu::{Machine, RV_SP, STACK_BASE, STACK_SIZE};
use rv_emu::mem::{Bus, Memory};

const BASE: u64 = 0x8000_0000;

// ABI names used by the programs below
const ZERO: u8 = 0;
const RA: u8 = 1;
const SP: u8 = 2;
const T0: u8 = 5;
const T1: u8 = 6;
const T2: u8 = 7;
const A0: u8 = 10;
const A1: u8 = 11;

fn load(code: &[u32], args: [u64; 4]) -> Machine {
    let mut mem = Memory::new(4096);
    mem.write_words(BASE, code).unwrap();
    Machine::new(mem, BASE, args)
}

/// sum(n) = 1 + 2 + ... + n
fn sum_program() -> Vec<u32> {
    vec![
        li(T0, 0),
        li(T1, 1),
        blt(A0, T1, 16),
        add(T0, T0, T1),
        addi(T1, T1, 1),
        jal(ZERO, -12),
        addi(A0, T0, 0),
        ret(),
    ]
}

#[test]
fn sum_loop() {
    let mut m = load(&sum_program(), [10, 0, 0, 0]);
    assert_eq!(m.run().unwrap(), 55);

    let a = m.analysis;
    assert_eq!(a.i_count, 45);
    assert_eq!(a.ir_count, 23);
    assert_eq!(a.j_count, 11);
    assert_eq!(a.b_taken, 1);
    assert_eq!(a.b_not_taken, 10);
    assert_eq!((a.ld_count, a.st_count), (0, 0));
}

#[test]
fn call_with_stack_frame() {
    // saves ra, calls double(a0), restores ra and returns
    let code = [
        addi(SP, SP, -16),
        sd(SP, RA, 8),
        jal(RA, 16),
        ld(RA, SP, 8),
        addi(SP, SP, 16),
        ret(),
        // double:
        add(A0, A0, A0),
        ret(),
    ];
    let mut m = load(&code, [21, 0, 0, 0]);
    assert_eq!(m.run().unwrap(), 42);
    assert_eq!(m.cpu.regs[RV_SP], STACK_BASE + STACK_SIZE as u64);
    assert_eq!((m.analysis.ld_count, m.analysis.st_count), (1, 1));
    assert_eq!(m.analysis.j_count, 3);
}

#[test]
fn jal_then_jalr_returns_after_the_jal() {
    let code = [jal(RA, 12), li(A0, 1), ret(), jalr(RA)];
    let mut m = load(&code, [0; 4]);
    m.step().unwrap();
    assert_eq!(m.cpu.pc, BASE + 12);
    m.step().unwrap();
    assert_eq!(m.cpu.pc, BASE + 4);
}

#[test]
fn string_length_over_host_memory() {
    let code = [
        li(T0, 0),
        add(T1, A0, T0),
        lb(T2, T1, 0),
        beq(T2, ZERO, 12),
        addi(T0, T0, 1),
        jal(ZERO, -16),
        addi(A0, T0, 0),
        ret(),
    ];
    let mut m = load(&code, [BASE + 0x100, 0, 0, 0]);
    m.mem.write_bytes(BASE + 0x100, b"hello\0").unwrap();
    assert_eq!(m.run().unwrap(), 5);
}

#[test]
fn byte_stores_reach_host_memory() {
    // a0[i] = a1 for i in 0..4
    let code = [
        li(T0, 0),
        li(T2, 4),
        add(T1, A0, T0),
        sb(T1, A1, 0),
        addi(T0, T0, 1),
        blt(T0, T2, -12),
        ret(),
    ];
    let mut m = load(&code, [BASE + 0x200, 0x1ab, 0, 0]);
    m.run().unwrap();
    assert_eq!(m.mem.read_u32(BASE + 0x200).unwrap(), 0xabab_abab);
    assert_eq!(m.mem.read_u8(BASE + 0x204).unwrap(), 0);
}

#[test]
fn gcd_with_rem() {
    let code = [
        beq(A1, ZERO, 20),
        rem(T0, A0, A1),
        addi(A0, A1, 0),
        addi(A1, T0, 0),
        jal(ZERO, -16),
        ret(),
    ];
    let mut m = load(&code, [48, 18, 0, 0]);
    assert_eq!(m.run().unwrap(), 6);
}

#[test]
fn unsupported_funct7_aborts_the_run() {
    // xor shares funct3 100 with div
    let xor = r_type(0b0000000, A1, A0, 0b100, A0);
    let mut m = load(&[li(T0, 9), xor, ret()], [0; 4]);
    assert_eq!(
        m.run().unwrap_err(),
        Trap::Unsupported {
            pc: BASE + 4,
            err: DecodeError::UnsupportedFunct7 {
                format: Format::R,
                funct7: 0
            }
        }
    );
    assert_eq!(m.cpu.regs[T0 as usize], 9);
}

#[test]
fn icache_hit_counts_for_a_loop() {
    for kind in [CacheKind::DirectMapped, CacheKind::SetAssociative] {
        let cache = Cache::new(CacheConfig {
            kind,
            size: 64,
            block_size: 4,
            ways: 4,
        })
        .unwrap();
        let mut m = load(&sum_program(), [10, 0, 0, 0]).with_icache(cache);
        assert_eq!(m.run().unwrap(), 55);

        // eight instructions in two 4-word blocks
        let s = *m.icache.stats();
        assert_eq!(s.refs, m.analysis.i_count);
        assert_eq!(s.misses, 2);
        assert_eq!(s.misses_cold, 2);
        assert_eq!(s.misses_hot, 0);
        assert_eq!(s.hits, s.refs - 2);
        assert_eq!(m.icache.slots_used(), 2);
    }
}

#[test]
fn independent_runs_do_not_share_state() {
    let mut first = load(&sum_program(), [4, 0, 0, 0]);
    let mut second = load(&sum_program(), [100, 0, 0, 0]);
    assert_eq!(second.run().unwrap(), 5050);
    assert_eq!(first.run().unwrap(), 10);
    assert!(first.analysis.i_count < second.analysis.i_count);
}
