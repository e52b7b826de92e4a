use goblin::elf::{
    Elf,
    header::{self, ELFCLASS64, ELFDATA2LSB, EM_RISCV, ET_DYN, ET_EXEC},
    program_header::{PT_LOAD, ProgramHeader},
};
use thiserror::Error;

use crate::mem::{MemError, Memory};

#[derive(Error, Debug)]
pub enum ElfError {
    #[error("malformed ELF: {0}")]
    Parse(#[from] goblin::error::Error),

    #[error("expected {0}")]
    Wrong(&'static str),

    #[error("segment at file offset 0x{off:x} is truncated or malformed")]
    BadSegment { off: u64 },

    #[error("segment outside RAM: [0x{start:x},0x{end:x}) not within [0x{base:x},0x{ram_end:x})")]
    OutsideRam {
        start: u64,
        end: u64,
        base: u64,
        ram_end: u64,
    },

    #[error("segment copy failed: {0}")]
    Mem(#[from] MemError),
}

fn check_header(elf: &Elf) -> Result<(), ElfError> {
    let ident = &elf.header.e_ident;
    if ident[header::EI_CLASS] != ELFCLASS64 {
        return Err(ElfError::Wrong("64-bit ELF"));
    }
    if ident[header::EI_DATA] != ELFDATA2LSB {
        return Err(ElfError::Wrong("little-endian ELF"));
    }
    if elf.header.e_machine != EM_RISCV {
        return Err(ElfError::Wrong("RISC-V ELF"));
    }
    if !matches!(elf.header.e_type, ET_EXEC | ET_DYN) {
        return Err(ElfError::Wrong("ET_EXEC or ET_DYN image"));
    }
    Ok(())
}

fn load_segment(bytes: &[u8], ph: &ProgramHeader, mem: &mut Memory) -> Result<(), ElfError> {
    let bad = ElfError::BadSegment { off: ph.p_offset };
    let file = match ph.p_offset.checked_add(ph.p_filesz) {
        Some(end) if end <= bytes.len() as u64 && ph.p_memsz >= ph.p_filesz => {
            ph.p_offset as usize..end as usize
        }
        _ => return Err(bad),
    };
    let start = ph.p_vaddr;
    let end = start.checked_add(ph.p_memsz).ok_or(bad)?;
    if start < mem.base || end > mem.end_addr() {
        return Err(ElfError::OutsideRam {
            start,
            end,
            base: mem.base,
            ram_end: mem.end_addr(),
        });
    }

    mem.write_bytes(start, &bytes[file])?;
    // bss
    let bss = (ph.p_memsz - ph.p_filesz) as usize;
    if bss > 0 {
        mem.write_bytes(start + ph.p_filesz, &vec![0u8; bss])?;
    }
    log::debug!(
        "loaded segment [0x{start:x},0x{end:x}) with 0x{:x} bytes from file",
        ph.p_filesz
    );
    Ok(())
}

/// Copies the PT_LOAD segments of an RV64 image into `mem` and returns the
/// image's entry point.
pub fn load_elf_into_memory(bytes: &[u8], mem: &mut Memory) -> Result<u64, ElfError> {
    let elf = Elf::parse(bytes)?;
    check_header(&elf)?;

    for ph in elf.program_headers.iter().filter(|ph| ph.p_type == PT_LOAD) {
        load_segment(bytes, ph, mem)?;
    }
    Ok(elf.entry)
}

/// Address of the symbol `name`, if the image has a symbol table entry for it.
pub fn find_symbol(bytes: &[u8], name: &str) -> Result<Option<u64>, ElfError> {
    let elf = Elf::parse(bytes)?;
    Ok(elf
        .syms
        .iter()
        .find(|sym| elf.strtab.get_at(sym.st_name) == Some(name))
        .map(|sym| sym.st_value))
}
