//! Wire encoding of the memory half of a [`Witness`] for spec §6's `proof`
//! ABI argument: leaf index, pre-step value, and sibling chain,
//! concatenated per touched leaf in witness order.

use fpvm_memory::MEMORY_DEPTH;

use crate::error::MerkleError;
use crate::hash::Hash32;
use crate::witness::LeafWitness;

const ENTRY_LEN: usize = 8 + 64 + MEMORY_DEPTH as usize * 32;

pub fn encode_proof(entries: &[LeafWitness]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * ENTRY_LEN);
    for entry in entries {
        out.extend_from_slice(&entry.leaf_index.to_be_bytes());
        out.extend_from_slice(&entry.old_value);
        for sibling in &entry.siblings {
            out.extend_from_slice(sibling);
        }
    }
    out
}

pub fn decode_proof(bytes: &[u8]) -> Result<Vec<LeafWitness>, MerkleError> {
    if bytes.len() % ENTRY_LEN != 0 {
        return Err(MerkleError::MalformedState(format!(
            "proof length {} is not a multiple of the per-leaf entry size {ENTRY_LEN}",
            bytes.len()
        )));
    }
    let mut entries = Vec::with_capacity(bytes.len() / ENTRY_LEN);
    for chunk in bytes.chunks(ENTRY_LEN) {
        let mut cur = chunk;
        let leaf_index = take_u64(&mut cur);
        let mut old_value = [0u8; 64];
        old_value.copy_from_slice(&cur[..64]);
        cur = &cur[64..];
        let mut siblings = Vec::with_capacity(MEMORY_DEPTH as usize);
        for _ in 0..MEMORY_DEPTH {
            let mut sibling = Hash32::default();
            sibling.copy_from_slice(&cur[..32]);
            cur = &cur[32..];
            siblings.push(sibling);
        }
        entries.push(LeafWitness {
            leaf_index,
            old_value,
            siblings,
        });
    }
    Ok(entries)
}

fn take_u64(cur: &mut &[u8]) -> u64 {
    let (head, tail) = cur.split_at(8);
    *cur = tail;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(head);
    u64::from_be_bytes(buf)
}
