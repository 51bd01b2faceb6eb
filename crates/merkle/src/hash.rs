use std::sync::OnceLock;
use tiny_keccak::{Hasher, Keccak};

use fpvm_memory::MEMORY_DEPTH;

use crate::scalar::SCALAR_DEPTH;

pub type Hash32 = [u8; 32];

pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

pub fn keccak_pair(left: Hash32, right: Hash32) -> Hash32 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(&left);
    buf[32..].copy_from_slice(&right);
    keccak256(&buf)
}

/// Precomputed root hashes of all-zero subtrees, indexed by depth (depth 0
/// is the subtree root, the deepest index is the leaf level). Every absent
/// leaf and every never-touched branch folds to one of these constants.
pub struct ZeroHashes {
    /// `memory[d]` for `d` in `0..=MEMORY_DEPTH`.
    pub memory: Vec<Hash32>,
    /// `scalar[d]` for `d` in `0..=SCALAR_DEPTH`.
    pub scalar: Vec<Hash32>,
}

impl ZeroHashes {
    fn compute() -> Self {
        let mut memory = vec![Hash32::default(); MEMORY_DEPTH as usize + 1];
        memory[MEMORY_DEPTH as usize] = keccak256(&[0u8; fpvm_memory::LEAF_SIZE]);
        for d in (0..MEMORY_DEPTH as usize).rev() {
            memory[d] = keccak_pair(memory[d + 1], memory[d + 1]);
        }

        let mut scalar = vec![Hash32::default(); SCALAR_DEPTH as usize + 1];
        scalar[SCALAR_DEPTH as usize] = [0u8; 32];
        for d in (0..SCALAR_DEPTH as usize).rev() {
            scalar[d] = keccak_pair(scalar[d + 1], scalar[d + 1]);
        }

        Self { memory, scalar }
    }
}

static ZERO_HASHES: OnceLock<ZeroHashes> = OnceLock::new();

pub fn zero_hashes() -> &'static ZeroHashes {
    ZERO_HASHES.get_or_init(ZeroHashes::compute)
}
