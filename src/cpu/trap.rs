use crate::cpu::decode::DecodeError;
use crate::mem::MemError;
use thiserror::Error;

/// A fault that ends the run. Nothing is retried or rolled back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("{err} at pc=0x{pc:x}")]
    Unsupported { pc: u64, err: DecodeError },

    #[error("memory error at pc=0x{pc:x}: {err}")]
    Mem { pc: u64, err: MemError },
}

impl Trap {
    /// Returns the PC of the faulting instruction
    pub fn pc(&self) -> u64 {
        match self {
            Trap::Unsupported { pc, .. } => *pc,
            Trap::Mem { pc, .. } => *pc,
        }
    }
}

/// Trait for adding PC context to errors that can become Traps
pub trait WithPc<T> {
    fn with_pc(self, pc: u64) -> Result<T, Trap>;
}

impl<T> WithPc<T> for Result<T, MemError> {
    fn with_pc(self, pc: u64) -> Result<T, Trap> {
        self.map_err(|err| Trap::Mem { pc, err })
    }
}

impl<T> WithPc<T> for Result<T, DecodeError> {
    fn with_pc(self, pc: u64) -> Result<T, Trap> {
        self.map_err(|err| Trap::Unsupported { pc, err })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Format;

    #[test]
    fn diagnostics_name_the_fault() {
        let t: Result<(), _> = Err(DecodeError::UnsupportedFunct3 {
            format: Format::Store,
            funct3: 0b010,
        })
        .with_pc(0x8000_0010);
        let t = t.unwrap_err();
        assert_eq!(t.pc(), 0x8000_0010);
        assert_eq!(t.to_string(), "unsupported S-type funct3 0b010 at pc=0x80000010");

        let t: Result<u8, _> = Err(MemError::Oob(0x10)).with_pc(4);
        assert_eq!(
            t.unwrap_err().to_string(),
            "memory error at pc=0x4: address out of range: 0x10"
        );
    }
}
