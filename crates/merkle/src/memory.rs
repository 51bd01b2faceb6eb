use fpvm_memory::{LEAF_SIZE, MEMORY_DEPTH, PagedMemory};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::hash::{Hash32, keccak256, keccak_pair, zero_hashes};

/// `levels[d]` holds every non-default node hash at depth `d`, for `d` in
/// `0..=MEMORY_DEPTH`. Depth `MEMORY_DEPTH` holds leaf hashes (`H(leaf
/// bytes)`); depth 0 holds at most the single root entry at index 0.
///
/// Built on demand from the flat `leaf_index -> [u8; 64]` backing store, per
/// the re-architecture note in spec §9 — no persistent node objects.
pub fn build_levels(memory: &PagedMemory) -> Vec<FxHashMap<u64, Hash32>> {
    let zh = zero_hashes();
    let mut levels: Vec<FxHashMap<u64, Hash32>> = (0..=MEMORY_DEPTH)
        .map(|_| FxHashMap::default())
        .collect();

    for (idx, bytes) in memory.resident_leaves() {
        levels[MEMORY_DEPTH as usize].insert(idx, keccak256(bytes));
    }

    for depth in (0..MEMORY_DEPTH).rev() {
        let child_depth = depth as usize + 1;
        let parents: FxHashSet<u64> = levels[child_depth].keys().map(|idx| idx >> 1).collect();
        for parent in parents {
            let left = leaf_or_zero(&levels[child_depth], parent * 2, zh.memory[child_depth]);
            let right = leaf_or_zero(&levels[child_depth], parent * 2 + 1, zh.memory[child_depth]);
            levels[depth as usize].insert(parent, keccak_pair(left, right));
        }
    }

    levels
}

fn leaf_or_zero(level: &FxHashMap<u64, Hash32>, idx: u64, zero: Hash32) -> Hash32 {
    level.get(&idx).copied().unwrap_or(zero)
}

pub fn root_from_levels(levels: &[FxHashMap<u64, Hash32>]) -> Hash32 {
    levels[0]
        .get(&0)
        .copied()
        .unwrap_or(zero_hashes().memory[0])
}

/// Sibling hashes for `leaf_index`, ordered from the leaf level (index 0)
/// up to the level just below the root (index `MEMORY_DEPTH - 1`).
pub fn prove(levels: &[FxHashMap<u64, Hash32>], leaf_index: u64) -> Vec<Hash32> {
    let zh = zero_hashes();
    let mut siblings = Vec::with_capacity(MEMORY_DEPTH as usize);
    let mut cur = leaf_index;
    for k in 0..MEMORY_DEPTH {
        let depth = (MEMORY_DEPTH - k) as usize;
        let sibling_index = cur ^ 1;
        siblings.push(leaf_or_zero(&levels[depth], sibling_index, zh.memory[depth]));
        cur >>= 1;
    }
    siblings
}

/// Folds a witness-supplied `(depth, index) -> hash` node map into a root,
/// recomputing only the nodes on the "spine" (ancestors of a touched leaf)
/// and trusting every other node's hash as given. This is the leaf-by-leaf
/// refold mandated by spec §4.B's tie-break rule, generalized to however
/// many leaves a step happened to touch.
pub fn fold_spine(
    nodes: &FxHashMap<(u32, u64), Hash32>,
    spine: &FxHashSet<(u32, u64)>,
    leaf_values: &FxHashMap<u64, [u8; LEAF_SIZE]>,
    depth: u32,
    index: u64,
) -> Hash32 {
    if !spine.contains(&(depth, index)) {
        return nodes
            .get(&(depth, index))
            .copied()
            .unwrap_or(zero_hashes().memory[depth as usize]);
    }
    if depth == MEMORY_DEPTH {
        let bytes = leaf_values
            .get(&index)
            .copied()
            .unwrap_or([0u8; LEAF_SIZE]);
        return keccak256(&bytes);
    }
    let left = fold_spine(nodes, spine, leaf_values, depth + 1, index * 2);
    let right = fold_spine(nodes, spine, leaf_values, depth + 1, index * 2 + 1);
    keccak_pair(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_memory_roots_to_zero_hash() {
        let mem = PagedMemory::new();
        let levels = build_levels(&mem);
        assert_eq!(root_from_levels(&levels), zero_hashes().memory[0]);
    }

    #[test]
    fn single_write_changes_root() {
        use fpvm_memory::Memory;
        let empty_root = root_from_levels(&build_levels(&PagedMemory::new()));
        let mut mem = PagedMemory::new();
        mem.write_u64(128, 0x42);
        let levels = build_levels(&mem);
        assert_ne!(root_from_levels(&levels), empty_root);
    }
}
