use fpvm_memory::{LEAF_SIZE, MEMORY_DEPTH, Memory, PagedMemory, leaf_index, leaf_offset};
use fpvm_state::Scalars;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::MerkleError;
use crate::hash::{Hash32, keccak256, keccak_pair, zero_hashes};
use crate::memory::{build_levels, fold_spine, prove, root_from_levels};
use crate::scalar::{SCALAR_LEAVES, decode_scalars, encode_scalars, fold_dense, scalar_root};
use crate::scalar::SCALAR_DEPTH;

/// One touched leaf: its pre-step content and the sibling chain that
/// authenticates it against `pre_root`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeafWitness {
    pub leaf_index: u64,
    pub old_value: [u8; LEAF_SIZE],
    /// Leaf-to-root order, length [`fpvm_memory::MEMORY_DEPTH`].
    pub siblings: Vec<Hash32>,
}

/// The full witness for a single step: an access list over memory leaves
/// plus the dense pre-step scalar subtree (spec §3, "Witness").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Witness {
    pub scalars: [Hash32; SCALAR_LEAVES],
    pub memory: Vec<LeafWitness>,
}

/// Collector: builds the minimal witness for the leaves `memory` recorded as
/// touched since the last reset, against `memory`'s full resident set.
pub fn collect_witness(scalars_pre: &Scalars, memory: &PagedMemory) -> Witness {
    let levels = build_levels(memory);
    let mut entries = Vec::new();
    for idx in memory.touched_leaves() {
        let old_value = memory.old_value(idx).unwrap_or([0u8; LEAF_SIZE]);
        entries.push(LeafWitness {
            leaf_index: idx,
            old_value,
            siblings: prove(&levels, idx),
        });
    }
    Witness {
        scalars: encode_scalars(scalars_pre),
        memory: entries,
    }
}

pub fn root(scalars: &Scalars, memory: &PagedMemory) -> Hash32 {
    let levels = build_levels(memory);
    keccak_pair(scalar_root(scalars), root_from_levels(&levels))
}

/// Memory view the slow evaluator executes instructions against: reads and
/// writes are served from the witness's leaves only, never the full tree.
/// An access outside the witness is recorded as a sticky error rather than
/// panicking, since [`fpvm_memory::Memory`]'s methods are infallible by
/// contract — the slow evaluator checks it once the step completes.
pub struct WitnessMemory {
    current: FxHashMap<u64, [u8; LEAF_SIZE]>,
    error: Option<MerkleError>,
}

impl WitnessMemory {
    pub fn new(witness: &Witness) -> Self {
        let current = witness
            .memory
            .iter()
            .map(|e| (e.leaf_index, e.old_value))
            .collect();
        Self {
            current,
            error: None,
        }
    }

    fn into_values(self) -> Result<FxHashMap<u64, [u8; LEAF_SIZE]>, MerkleError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.current),
        }
    }
}

impl Memory for WitnessMemory {
    fn read_byte(&mut self, addr: u64) -> u8 {
        let idx = leaf_index(addr);
        match self.current.get(&idx) {
            Some(leaf) => leaf[leaf_offset(addr)],
            None => {
                self.error.get_or_insert(MerkleError::LeafNotInWitness(idx));
                0
            }
        }
    }

    fn write_byte(&mut self, addr: u64, value: u8) {
        let idx = leaf_index(addr);
        let offset = leaf_offset(addr);
        match self.current.get_mut(&idx) {
            Some(leaf) => leaf[offset] = value,
            None => {
                self.error.get_or_insert(MerkleError::LeafNotInWitness(idx));
            }
        }
    }
}

/// Replayer: authenticates a witness against `pre_root` and, once the
/// instruction has run against the [`WitnessMemory`] it hands back, folds
/// the updated leaves into `post_root` without ever materializing the full
/// memory subtree (spec §4.C).
pub struct Replayer {
    nodes: FxHashMap<(u32, u64), Hash32>,
    spine: FxHashSet<(u32, u64)>,
}

impl Replayer {
    /// Verifies `witness` against `pre_root` and returns the decoded
    /// pre-step scalars, a [`WitnessMemory`] to execute the instruction
    /// against, and a `Replayer` to fold the post-state root afterwards.
    pub fn new(
        pre_root: Hash32,
        witness: &Witness,
    ) -> Result<(Scalars, WitnessMemory, Self), MerkleError> {
        let mut nodes: FxHashMap<(u32, u64), Hash32> = FxHashMap::default();
        let mut spine: FxHashSet<(u32, u64)> = FxHashSet::default();

        for entry in &witness.memory {
            nodes.insert(
                (MEMORY_DEPTH, entry.leaf_index),
                keccak256(&entry.old_value),
            );
            let mut idx = entry.leaf_index;
            let mut depth = MEMORY_DEPTH;
            spine.insert((depth, idx));
            for sibling_hash in &entry.siblings {
                let sibling_index = idx ^ 1;
                nodes.entry((depth, sibling_index)).or_insert(*sibling_hash);
                idx >>= 1;
                depth -= 1;
                spine.insert((depth, idx));
            }
        }

        let memory_root = fold_spine(&nodes, &spine, &leaf_old_values(witness), 0, 0);
        let scalar_root = fold_dense(&witness.scalars, SCALAR_DEPTH);
        let computed_pre = keccak_pair(scalar_root, memory_root);
        if computed_pre != pre_root {
            return Err(MerkleError::WitnessInvalid);
        }

        let scalars = decode_scalars(&witness.scalars);
        let mem = WitnessMemory::new(witness);
        Ok((scalars, mem, Self { nodes, spine }))
    }

    /// Folds the post-step scalars and the mutated memory leaves into
    /// `post_root`.
    pub fn finish(self, scalars_post: &Scalars, mem: WitnessMemory) -> Result<Hash32, MerkleError> {
        let leaf_values = mem.into_values()?;
        let memory_root = fold_spine(&self.nodes, &self.spine, &leaf_values, 0, 0);
        let scalar_root = fold_dense(&encode_scalars(scalars_post), SCALAR_DEPTH);
        Ok(keccak_pair(scalar_root, memory_root))
    }
}

fn leaf_old_values(witness: &Witness) -> FxHashMap<u64, [u8; LEAF_SIZE]> {
    witness
        .memory
        .iter()
        .map(|e| (e.leaf_index, e.old_value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpvm_memory::Memory as _;

    #[test]
    fn collect_then_replay_matches_direct_mutation() {
        let mut scalars = Scalars::new();
        let mut memory = PagedMemory::new();
        let pre_root = root(&scalars, &memory);

        // Simulate a step: SD-like write of a u64, then advance pc.
        memory.write_u64(0x10000, 0xDEAD_BEEF_CAFE_BABE);
        scalars.pc += 4;
        scalars.step += 1;
        let post_root_direct = root(&scalars, &memory);

        // Rebuild the witness as it would have been collected *before* the
        // mutation (the collector must run pre-step in real use; here we
        // reconstruct it by re-deriving touched info from the same write).
        let mut fresh = PagedMemory::new();
        fresh.write_u64(0x10000, 0); // touch without changing value
        let mut base_scalars = Scalars::new();
        let witness = collect_witness(&base_scalars, &fresh);

        let (mut replay_scalars, mut mem, replayer) =
            Replayer::new(root(&base_scalars, &PagedMemory::new()), &witness).unwrap();
        mem.write_u64(0x10000, 0xDEAD_BEEF_CAFE_BABE);
        base_scalars.pc += 4;
        base_scalars.step += 1;
        replay_scalars.pc = base_scalars.pc;
        replay_scalars.step = base_scalars.step;
        let post_root_replay = replayer.finish(&replay_scalars, mem).unwrap();

        assert_eq!(post_root_direct, post_root_replay);
    }

    #[test]
    fn tampered_sibling_is_rejected() {
        let scalars = Scalars::new();
        let mut memory = PagedMemory::new();
        memory.write_u64(64, 1);
        let witness = collect_witness(&scalars, &memory);
        let mut bad = witness;
        if let Some(entry) = bad.memory.first_mut() {
            entry.siblings[0] = [0xFFu8; 32];
        }
        let wrong_root = [0u8; 32];
        assert!(matches!(
            Replayer::new(wrong_root, &bad),
            Err(MerkleError::WitnessInvalid)
        ));
    }
}
