pub mod asm;
pub mod bits;
pub mod cache;
pub mod cpu;
pub mod debug;
pub mod elf;
pub mod mem;
