use thiserror::Error;

#[derive(Debug, Error)]
pub enum FpvmError {
    #[error(transparent)]
    Merkle(#[from] fpvm_merkle::MerkleError),
    #[error(transparent)]
    Isa(#[from] fpvm_isa::IsaError),
    #[error("fast and slow evaluators disagree after step {step}: fast produced {fast:02x?}, slow produced {slow:02x?}")]
    RootMismatch {
        step: u64,
        fast: fpvm_merkle::Hash32,
        slow: fpvm_merkle::Hash32,
    },
}
