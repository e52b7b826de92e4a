//! Single-level instruction cache model.
//!
//! Addresses are byte addresses of 32-bit words. A word address is split into
//! tag, index and block offset:
//!
//! ```text
//!  63                                             0
//! +---------------+------------+--------------+----+
//! |      tag      |   index    | block offset | 00 |
//! +---------------+------------+--------------+----+
//!                  index_bits    block_bits
//! ```
//!
//! The direct-mapped variant has one slot per index. The set-associative
//! variant groups `ways` contiguous slots into a set and evicts the least
//! recently used one, tracked with a per-slot timestamp taken from the
//! reference counter.

use std::fmt;

use thiserror::Error;

use crate::mem::{Bus, MemError};

pub const CACHE_MAX_SLOTS: u32 = 4096;
pub const CACHE_MAX_BLOCK_SIZE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    #[default]
    None,
    DirectMapped,
    SetAssociative,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::None => write!(f, "none"),
            CacheKind::DirectMapped => write!(f, "direct mapped"),
            CacheKind::SetAssociative => write!(f, "set associative"),
        }
    }
}

/// Cache sizing. `size` and `block_size` are in 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub kind: CacheKind,
    pub size: u32,
    pub block_size: u32,
    pub ways: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheConfigError {
    #[error("cache {field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u32 },

    #[error("block size of {0} words exceeds the maximum of {max}", max = CACHE_MAX_BLOCK_SIZE)]
    BlockTooLarge(u32),

    #[error("cache needs {0} slots, at most {max} are supported", max = CACHE_MAX_SLOTS)]
    TooManySlots(u32),

    #[error("{ways} ways do not fit in {slots} slots")]
    WaysExceedSlots { ways: u32, slots: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub refs: u64,
    pub hits: u64,
    pub misses: u64,
    pub misses_cold: u64,
    pub misses_hot: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    valid: bool,
    tag: u64,
    block: [u32; CACHE_MAX_BLOCK_SIZE as usize],
    // only meaningful for set-associative lookups
    timestamp: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Cache {
    kind: CacheKind,
    size: u32,
    block_size: u32,
    ways: u32,
    block_mask: u64,
    index_mask: u64,
    block_bits: u32,
    index_bits: u32,
    slots: Vec<Slot>,
    stats: CacheStats,
}

fn check_pow2(field: &'static str, value: u32) -> Result<(), CacheConfigError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(CacheConfigError::NotPowerOfTwo { field, value })
    }
}

impl Cache {
    /// A cache that forwards every lookup straight to memory.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(config: CacheConfig) -> Result<Self, CacheConfigError> {
        if config.kind == CacheKind::None {
            return Ok(Self::disabled());
        }

        let ways = match config.kind {
            CacheKind::DirectMapped => 1,
            _ => config.ways,
        };

        let mut cache = Self {
            kind: config.kind,
            size: config.size,
            block_size: config.block_size,
            ways,
            ..Self::default()
        };
        if config.size == 0 {
            return Ok(cache);
        }

        check_pow2("size", config.size)?;
        check_pow2("block size", config.block_size)?;
        check_pow2("ways", ways)?;
        if config.block_size > CACHE_MAX_BLOCK_SIZE {
            return Err(CacheConfigError::BlockTooLarge(config.block_size));
        }
        let slots = config.size / config.block_size;
        if slots > CACHE_MAX_SLOTS {
            return Err(CacheConfigError::TooManySlots(slots));
        }
        if ways > slots {
            return Err(CacheConfigError::WaysExceedSlots { ways, slots });
        }

        let sets = slots / ways;
        cache.block_mask = u64::from(config.block_size - 1);
        cache.index_mask = u64::from(sets - 1);
        cache.block_bits = config.block_size.trailing_zeros();
        cache.index_bits = sets.trailing_zeros();
        cache.slots = vec![Slot::default(); slots as usize];

        log::debug!(
            "cache initialized: {} with {} slots, {} sets, block of {} words",
            cache.kind,
            slots,
            sets,
            config.block_size
        );
        Ok(cache)
    }

    pub fn is_enabled(&self) -> bool {
        self.kind != CacheKind::None
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Returns the word at `addr`, going through the cache if one is modeled.
    pub fn lookup<B: Bus + ?Sized>(&mut self, addr: u64, bus: &B) -> Result<u32, MemError> {
        match self.kind {
            CacheKind::None => bus.read_u32(addr),
            _ if self.slots.is_empty() => {
                self.stats.misses += 1;
                bus.read_u32(addr)
            }
            CacheKind::DirectMapped => self.lookup_dm(addr, bus),
            CacheKind::SetAssociative => self.lookup_sa(addr, bus),
        }
    }

    fn split(&self, addr: u64) -> (u64, usize, usize) {
        let offset = ((addr >> 2) & self.block_mask) as usize;
        let index = ((addr >> (self.block_bits + 2)) & self.index_mask) as usize;
        let tag = addr >> (self.index_bits + self.block_bits + 2);
        (tag, index, offset)
    }

    /// Reads the whole block containing `addr` from memory.
    fn fill_block<B: Bus + ?Sized>(
        &self,
        addr: u64,
        bus: &B,
    ) -> Result<[u32; CACHE_MAX_BLOCK_SIZE as usize], MemError> {
        let base = addr & !((self.block_mask << 2) | 0b11);
        let mut block = [0u32; CACHE_MAX_BLOCK_SIZE as usize];
        for (i, word) in block.iter_mut().take(self.block_size as usize).enumerate() {
            *word = bus.read_u32(base + 4 * i as u64)?;
        }
        Ok(block)
    }

    fn lookup_dm<B: Bus + ?Sized>(&mut self, addr: u64, bus: &B) -> Result<u32, MemError> {
        let (tag, index, offset) = self.split(addr);
        self.stats.refs += 1;

        let slot = self.slots[index];
        if slot.valid && slot.tag == tag {
            self.stats.hits += 1;
            log::debug!("  cache hit for index {index} tag 0x{tag:x} addr 0x{addr:x}");
            return Ok(slot.block[offset]);
        }

        self.stats.misses += 1;
        if slot.valid {
            self.stats.misses_hot += 1;
            log::debug!(
                "  cache miss (hot, held 0x{:x}) for index {index} tag 0x{tag:x} addr 0x{addr:x}",
                slot.tag
            );
        } else {
            self.stats.misses_cold += 1;
            log::debug!("  cache miss (cold) for index {index} tag 0x{tag:x} addr 0x{addr:x}");
        }

        let block = self.fill_block(addr, bus)?;
        let slot = &mut self.slots[index];
        slot.block = block;
        slot.tag = tag;
        slot.valid = true;
        Ok(slot.block[offset])
    }

    fn lru_way(&self, set_base: usize) -> usize {
        self.slots[set_base..set_base + self.ways as usize]
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.timestamp)
            .map(|(way, _)| way)
            .unwrap_or(0)
    }

    fn lookup_sa<B: Bus + ?Sized>(&mut self, addr: u64, bus: &B) -> Result<u32, MemError> {
        let (tag, set, offset) = self.split(addr);
        self.stats.refs += 1;

        let set_base = set * self.ways as usize;
        let set_slots = &self.slots[set_base..set_base + self.ways as usize];
        let way = match set_slots.iter().position(|s| s.valid && s.tag == tag) {
            Some(way) => {
                self.stats.hits += 1;
                log::debug!("  cache hit for set {set} way {way} tag 0x{tag:x} addr 0x{addr:x}");
                way
            }
            None => {
                self.stats.misses += 1;
                let way = match set_slots.iter().position(|s| !s.valid) {
                    Some(way) => {
                        self.stats.misses_cold += 1;
                        log::debug!(
                            "  cache miss for set {set} tag 0x{tag:x} addr 0x{addr:x} (fill invalid way {way})"
                        );
                        way
                    }
                    None => {
                        self.stats.misses_hot += 1;
                        let way = self.lru_way(set_base);
                        log::debug!(
                            "  cache miss for set {set} tag 0x{tag:x} addr 0x{addr:x} (evict tag 0x{:x} from way {way})",
                            self.slots[set_base + way].tag
                        );
                        way
                    }
                };
                let block = self.fill_block(addr, bus)?;
                let slot = &mut self.slots[set_base + way];
                slot.block = block;
                slot.tag = tag;
                slot.valid = true;
                way
            }
        };

        let slot = &mut self.slots[set_base + way];
        slot.timestamp = self.stats.refs;
        Ok(slot.block[offset])
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots_used(&self) -> usize {
        self.slots.iter().filter(|s| s.valid).count()
    }

    pub fn used_ratio(&self) -> f64 {
        ratio(self.slots_used() as u64, self.slots.len() as u64)
    }

    pub fn hit_ratio(&self) -> f64 {
        ratio(self.stats.hits, self.stats.refs)
    }

    pub fn miss_ratio(&self) -> f64 {
        ratio(self.stats.misses, self.stats.refs)
    }

    /// Human-readable summary, headed with `name`.
    pub fn report<'a>(&'a self, name: &'a str) -> CacheReport<'a> {
        CacheReport { cache: self, name }
    }
}

fn ratio(numer: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        numer as f64 / denom as f64
    }
}

pub struct CacheReport<'a> {
    cache: &'a Cache,
    name: &'a str,
}

impl fmt::Display for CacheReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.cache;
        let s = &c.stats;
        writeln!(f, "=== Cache {}", self.name)?;
        writeln!(f, "Type          = {}", c.kind)?;
        writeln!(f, "Size          = {} words", c.size)?;
        writeln!(f, "Block size    = {} words", c.block_size)?;
        writeln!(f, "Ways          = {}", c.ways)?;
        writeln!(f, "References    = {}", s.refs)?;
        writeln!(f, "Hits          = {} ({:.2}% hit ratio)", s.hits, c.hit_ratio() * 100.0)?;
        writeln!(f, "Misses        = {} ({:.2}% miss ratio)", s.misses, c.miss_ratio() * 100.0)?;
        writeln!(f, "Misses (cold) = {}", s.misses_cold)?;
        writeln!(f, "Misses (hot)  = {}", s.misses_hot)?;
        write!(f, "% Used        = {:.2}%", c.used_ratio() * 100.0)
    }
}
