use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IsaError {
    #[error("unsupported instruction word {0:#010x}")]
    Unsupported(u32),
    #[error(transparent)]
    Preimage(#[from] fpvm_preimage::PreimageOracleError),
}
