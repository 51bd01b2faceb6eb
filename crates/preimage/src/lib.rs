//! Pre-image oracle client (spec §4.D): addresses, windows into, and
//! verifies externally supplied content keyed by type + digest.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

pub const KEY_TYPE_LOCAL: u8 = 1;
pub const KEY_TYPE_KECCAK256: u8 = 2;

pub type PreimageKey = [u8; 32];
pub type Address = [u8; 20];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreimageOracleError {
    #[error("pre-image offset {offset} is past the length-prefixed stream (len {len})")]
    PartOffsetOOB { offset: u64, len: u64 },
    #[error("unsupported pre-image key type byte {0:#x}")]
    UnknownKeyType(u8),
    #[error("no pre-image bound for key {0:02x?}")]
    PreimageMissing(PreimageKey),
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Type-2 key for `preimage`: `keccak256(preimage)` with the key-type byte
/// written over its top byte.
pub fn keccak256_key(preimage: &[u8]) -> PreimageKey {
    let mut key = keccak256(preimage);
    key[0] = KEY_TYPE_KECCAK256;
    key
}

/// Type-1 key scoped to a caller: `H(raw_key || sender || local_context)`
/// with the key-type byte written over its top byte.
pub fn local_key(raw_key: [u8; 32], sender: Address, local_context: [u8; 32]) -> PreimageKey {
    let mut buf = Vec::with_capacity(32 + 20 + 32);
    buf.extend_from_slice(&raw_key);
    buf.extend_from_slice(&sender);
    buf.extend_from_slice(&local_context);
    let mut key = keccak256(&buf);
    key[0] = KEY_TYPE_LOCAL;
    key
}

/// Binds pre-image keys to their raw (unprefixed) byte content. Implemented
/// by whatever drives the evaluator — a test fixture, a CLI reading fixture
/// files, or an off-chain server in the real dispute game.
pub trait PreimageSource {
    fn preimage(&self, key: &PreimageKey) -> Option<&[u8]>;
}

/// In-memory [`PreimageSource`] for tests and the CLI's `run`/`witness`
/// commands, which load pre-images up front rather than fetching them live.
#[derive(Default)]
pub struct PreimageOracle {
    bindings: FxHashMap<PreimageKey, Vec<u8>>,
}

impl PreimageOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: PreimageKey, value: Vec<u8>) {
        self.bindings.insert(key, value);
    }
}

impl PreimageSource for PreimageOracle {
    fn preimage(&self, key: &PreimageKey) -> Option<&[u8]> {
        self.bindings.get(key).map(Vec::as_slice)
    }
}

/// Reads a 32-byte window of `key`'s length-prefixed value starting at
/// `offset`, returning the window (zero-padded past the end of the stream)
/// and the number of meaningful bytes it holds.
pub fn read_window(
    source: &dyn PreimageSource,
    key: &PreimageKey,
    offset: u64,
) -> Result<([u8; 32], u64), PreimageOracleError> {
    if key[0] != KEY_TYPE_LOCAL && key[0] != KEY_TYPE_KECCAK256 {
        return Err(PreimageOracleError::UnknownKeyType(key[0]));
    }
    let preimage = source
        .preimage(key)
        .ok_or(PreimageOracleError::PreimageMissing(*key))?;
    let len = preimage.len() as u64;
    if offset > len + 8 {
        return Err(PreimageOracleError::PartOffsetOOB { offset, len });
    }

    let stream_len = len + 8;
    let consumed = (stream_len - offset).min(32);
    let mut window = [0u8; 32];
    for i in 0..consumed {
        let stream_idx = offset + i;
        window[i as usize] = if stream_idx < 8 {
            len.to_be_bytes()[stream_idx as usize]
        } else {
            preimage[(stream_idx - 8) as usize]
        };
    }
    Ok((window, consumed))
}
