use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    #[error("address out of range: 0x{0:x}")]
    Oob(u64),
}

/// Memory access capability handed to the emulator.
///
/// Register values are used as addresses verbatim; an implementation decides
/// which of them are backed. Accesses are little-endian and may be misaligned.
pub trait Bus {
    fn read_u8(&self, addr: u64) -> Result<u8, MemError>;
    fn read_u32(&self, addr: u64) -> Result<u32, MemError>;
    fn read_u64(&self, addr: u64) -> Result<u64, MemError>;
    fn write_u8(&mut self, addr: u64, v: u8) -> Result<(), MemError>;
    fn write_u64(&mut self, addr: u64, v: u64) -> Result<(), MemError>;
}

/// A contiguous, bounds-checked byte region mapped at `base`.
pub struct Memory {
    data: Vec<u8>,
    pub base: u64,
}

impl Memory {
    pub fn new(bytes: usize) -> Self {
        Self::with_base(0x8000_0000, bytes)
    }

    pub fn with_base(base: u64, bytes: usize) -> Self {
        Self {
            data: vec![0; bytes],
            base,
        }
    }

    fn check_oob(&self, addr: u64, size: u64) -> Result<usize, MemError> {
        let a = addr.checked_sub(self.base).ok_or(MemError::Oob(addr))?;
        let end = a.checked_add(size).ok_or(MemError::Oob(addr))?;
        if end > self.data.len() as u64 {
            return Err(MemError::Oob(addr));
        }
        Ok(a as usize)
    }

    /// True when `[addr, addr + size)` lies entirely inside this region.
    pub fn contains(&self, addr: u64, size: u64) -> bool {
        self.check_oob(addr, size).is_ok()
    }

    pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), MemError> {
        let off = self.check_oob(addr, bytes.len() as u64)?;
        self.data[off..off + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copies instruction words into memory starting at `addr`.
    pub fn write_words(&mut self, addr: u64, words: &[u32]) -> Result<(), MemError> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.write_bytes(addr, &bytes)
    }

    pub fn end_addr(&self) -> u64 {
        self.base + self.data.len() as u64
    }
}

impl Bus for Memory {
    fn read_u8(&self, addr: u64) -> Result<u8, MemError> {
        let off = self.check_oob(addr, 1)?;
        Ok(self.data[off])
    }

    fn read_u32(&self, addr: u64) -> Result<u32, MemError> {
        let off = self.check_oob(addr, 4)?;
        let b = &self.data[off..off + 4];
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&self, addr: u64) -> Result<u64, MemError> {
        let off = self.check_oob(addr, 8)?;
        let b = &self.data[off..off + 8];
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn write_u8(&mut self, addr: u64, v: u8) -> Result<(), MemError> {
        let off = self.check_oob(addr, 1)?;
        self.data[off] = v;
        Ok(())
    }

    fn write_u64(&mut self, addr: u64, v: u64) -> Result<(), MemError> {
        let off = self.check_oob(addr, 8)?;
        self.data[off..off + 8].copy_from_slice(&v.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_accesses_outside_region() {
        let mut mem = Memory::with_base(0x1000, 16);
        assert_eq!(mem.read_u8(0xfff), Err(MemError::Oob(0xfff)));
        assert_eq!(mem.read_u64(0x1009), Err(MemError::Oob(0x1009)));
        assert_eq!(mem.write_u8(0x1010, 1), Err(MemError::Oob(0x1010)));
        assert!(mem.read_u64(0x1008).is_ok());
        assert_eq!(mem.read_u8(u64::MAX), Err(MemError::Oob(u64::MAX)));
    }

    #[test]
    fn little_endian_layout() {
        let mut mem = Memory::with_base(0, 16);
        mem.write_u64(0, 0x0807_0605_0403_0201).unwrap();
        assert_eq!(mem.read_u8(0).unwrap(), 0x01);
        assert_eq!(mem.read_u32(4).unwrap(), 0x0807_0605);
        mem.write_words(8, &[0xdead_beef]).unwrap();
        assert_eq!(mem.read_u32(8).unwrap(), 0xdead_beef);
        assert!(mem.contains(8, 8));
        assert!(!mem.contains(9, 8));
    }
}
