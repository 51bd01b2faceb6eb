//! Paged, byte-addressable 64-bit memory (spec §4.A).
//!
//! Unmapped reads return zero; writes lazily allocate their leaf. There is
//! no access-permission model. A 64-byte leaf is the unit the Merkleizer
//! hashes, so every read/write here also records which leaves it touched.

use rustc_hash::FxHashMap;

/// Size in bytes of a Merkle leaf.
pub const LEAF_SIZE: usize = 64;
/// `log2(LEAF_SIZE)`.
pub const LEAF_SIZE_LOG2: u32 = 6;
/// Height of the memory subtree: `64 - log2(64)`, addressing the full
/// 64-bit byte address space in 64-byte leaves.
pub const MEMORY_DEPTH: u32 = 58;

#[inline]
pub fn leaf_index(addr: u64) -> u64 {
    addr >> LEAF_SIZE_LOG2
}

#[inline]
pub fn leaf_offset(addr: u64) -> usize {
    (addr & (LEAF_SIZE as u64 - 1)) as usize
}

/// Byte-addressable memory with unaligned, leaf-boundary-crossing access.
///
/// Only `read_byte`/`write_byte` need implementing; the multi-byte accessors
/// are little-endian compositions of them, shared by every implementor (the
/// fast evaluator's [`PagedMemory`] and the slow evaluator's witness-backed
/// view alike), per the re-architecture note in spec §9.
pub trait Memory {
    fn read_byte(&mut self, addr: u64) -> u8;
    fn write_byte(&mut self, addr: u64, value: u8);

    fn read_u8(&mut self, addr: u64) -> u8 {
        self.read_byte(addr)
    }

    fn read_u16(&mut self, addr: u64) -> u16 {
        let mut buf = [0u8; 2];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_byte(addr.wrapping_add(i as u64));
        }
        u16::from_le_bytes(buf)
    }

    fn read_u32(&mut self, addr: u64) -> u32 {
        let mut buf = [0u8; 4];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_byte(addr.wrapping_add(i as u64));
        }
        u32::from_le_bytes(buf)
    }

    fn read_u64(&mut self, addr: u64) -> u64 {
        let mut buf = [0u8; 8];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_byte(addr.wrapping_add(i as u64));
        }
        u64::from_le_bytes(buf)
    }

    fn write_u8(&mut self, addr: u64, value: u8) {
        self.write_byte(addr, value);
    }

    fn write_u16(&mut self, addr: u64, value: u16) {
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            self.write_byte(addr.wrapping_add(i as u64), *b);
        }
    }

    fn write_u32(&mut self, addr: u64, value: u32) {
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            self.write_byte(addr.wrapping_add(i as u64), *b);
        }
    }

    fn write_u64(&mut self, addr: u64, value: u64) {
        for (i, b) in value.to_le_bytes().iter().enumerate() {
            self.write_byte(addr.wrapping_add(i as u64), *b);
        }
    }
}

/// Sparse, lazily-allocated backing store: `leaf_index -> [u8; 64]`. Absent
/// leaves read as zero and are never materialized.
#[derive(Default, Clone)]
pub struct PagedMemory {
    leaves: FxHashMap<u64, [u8; LEAF_SIZE]>,
    /// Leaf index -> its content as of the first touch this step, i.e. the
    /// pre-step value the Merkleizer needs as the witness's `old_value`.
    touched: FxHashMap<u64, [u8; LEAF_SIZE]>,
}

impl PagedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a full leaf, or the zero leaf if unmapped. Does not affect the
    /// touched set — use this for out-of-band inspection (e.g. snapshotting
    /// for the Merkleizer), not for instruction-driven access.
    pub fn leaf(&self, idx: u64) -> [u8; LEAF_SIZE] {
        self.leaves.get(&idx).copied().unwrap_or([0; LEAF_SIZE])
    }

    /// Overwrites a leaf wholesale, dropping it from the backing store if it
    /// becomes all-zero (keeps the resident set exactly the non-zero leaves).
    pub fn set_leaf(&mut self, idx: u64, data: [u8; LEAF_SIZE]) {
        if data == [0; LEAF_SIZE] {
            self.leaves.remove(&idx);
        } else {
            self.leaves.insert(idx, data);
        }
    }

    /// Leaf indices read or written since the last [`Self::reset_touched`].
    pub fn touched_leaves(&self) -> impl Iterator<Item = u64> + '_ {
        self.touched.keys().copied()
    }

    /// The leaf's content as of the start of the current step, for any leaf
    /// that was touched this step.
    pub fn old_value(&self, idx: u64) -> Option<[u8; LEAF_SIZE]> {
        self.touched.get(&idx).copied()
    }

    /// Clears the touched set; called at each step boundary.
    pub fn reset_touched(&mut self) {
        self.touched.clear();
    }

    fn touch(&mut self, idx: u64) {
        self.touched.entry(idx).or_insert_with(|| self.leaf(idx));
    }

    /// All currently non-zero leaves, for full-state Merkleization.
    pub fn resident_leaves(&self) -> impl Iterator<Item = (u64, &[u8; LEAF_SIZE])> {
        self.leaves.iter().map(|(k, v)| (*k, v))
    }
}

impl Memory for PagedMemory {
    fn read_byte(&mut self, addr: u64) -> u8 {
        let idx = leaf_index(addr);
        self.touch(idx);
        self.leaf(idx)[leaf_offset(addr)]
    }

    fn write_byte(&mut self, addr: u64, value: u8) {
        let idx = leaf_index(addr);
        self.touch(idx);
        let mut leaf = self.leaf(idx);
        leaf[leaf_offset(addr)] = value;
        self.set_leaf(idx, leaf);
    }
}
