//! Two-level sparse Merkle commitment over VM state: a dense 64-leaf scalar
//! subtree (program counter, registers, and other small fields) and a sparse
//! depth-58 subtree over 64-byte memory leaves, combined into a single root
//! via `keccak256(scalar_root || memory_root)`.

mod error;
mod hash;
mod memory;
mod proof_codec;
mod scalar;
mod state_bytes;
mod witness;

pub use error::MerkleError;
pub use hash::{Hash32, ZeroHashes, keccak256, keccak_pair, zero_hashes};
pub use memory::{build_levels, fold_spine, prove, root_from_levels};
pub use proof_codec::{decode_proof, encode_proof};
pub use scalar::{SCALAR_DEPTH, SCALAR_LEAVES, decode_scalars, encode_scalars, fold_dense, scalar_root};
pub use state_bytes::{STATE_BYTES_LEN, decode_state, encode_state};
pub use witness::{LeafWitness, Replayer, Witness, WitnessMemory, collect_witness, root};
