use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("witness does not authenticate against the pre-state root")]
    WitnessInvalid,
    #[error("instruction touched leaf {0:#x} with no corresponding witness entry")]
    LeafNotInWitness(u64),
    #[error("malformed canonical state encoding: {0}")]
    MalformedState(String),
}
