//! Scalar register-file shape shared by the fast and slow evaluators.
//!
//! This crate owns nothing about memory or hashing: it is the plain-data
//! contract both evaluators mutate identically, and the fixed leaf order the
//! Merkleizer folds into the scalar subtree.

use serde::{Deserialize, Serialize};

/// Number of general purpose registers, including the hardwired `x0`.
pub const NUM_REGISTERS: usize = 32;

/// Number of distinct scalar fields the Merkleizer treats as leaves, before
/// padding to a power of two. Order here is the canonical leaf order.
pub const NUM_SCALAR_FIELDS: usize = 8 + NUM_REGISTERS;

/// The single-hart scalar register file: program counter, general purpose
/// registers, and the small amount of VM bookkeeping state that isn't
/// memory. Mirrors spec §3's `VM State`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scalars {
    pub pc: u64,
    pub registers: [u64; NUM_REGISTERS],
    pub heap: u64,
    pub load_reservation: u64,
    pub exited: bool,
    pub exit_code: u8,
    pub step: u64,
    pub preimage_key: [u8; 32],
    pub preimage_offset: u64,
    /// Bytes of `preimage_key` filled in so far by the `PREIMAGE_KEY_FD`
    /// write syscall, which may arrive split across several steps. A full
    /// key commits once this reaches 32.
    pub preimage_key_write_len: u8,
}

impl Scalars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads register `idx`. `x0` always reads as zero regardless of what
    /// was last written to it.
    pub fn get_register(&self, idx: u8) -> u64 {
        if idx == 0 {
            0
        } else {
            self.registers[idx as usize]
        }
    }

    /// Writes register `idx`. Writes to `x0` are silently discarded.
    pub fn set_register(&mut self, idx: u8, value: u64) {
        if idx != 0 {
            self.registers[idx as usize] = value;
        }
    }
}
