//! ABI-stable encoding of a step's on-chain call data (spec §4.G / §6,
//! "Step input ABI"): the fixed `step(bytes,bytes,bytes32)` selector
//! followed by standard Solidity dynamic-argument encoding.

use std::sync::OnceLock;
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

const HEAD_WORDS: u64 = 3;
const HEAD_LEN: u64 = HEAD_WORDS * 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WitnessCodecError {
    #[error("call data shorter than the 4-byte selector")]
    Truncated,
    #[error("call data does not start with the step(bytes,bytes,bytes32) selector")]
    BadSelector,
    #[error("malformed ABI encoding: {0}")]
    Malformed(String),
}

fn selector() -> [u8; 4] {
    static SELECTOR: OnceLock<[u8; 4]> = OnceLock::new();
    *SELECTOR.get_or_init(|| {
        let mut hasher = Keccak::v256();
        hasher.update(b"step(bytes,bytes,bytes32)");
        let mut out = [0u8; 32];
        hasher.finalize(&mut out);
        [out[0], out[1], out[2], out[3]]
    })
}

fn pad32(len: usize) -> usize {
    (32 - len % 32) % 32
}

fn word_be(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_to_u64(word: &[u8]) -> Result<u64, WitnessCodecError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(WitnessCodecError::Malformed(
            "ABI word exceeds u64 range".into(),
        ));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..32]);
    Ok(u64::from_be_bytes(buf))
}

/// Encodes a step's call data: `state` is the canonical VM state
/// serialization, `proof` the concatenated witness sibling hashes in
/// traversal order.
pub fn encode_step_input(state: &[u8], proof: &[u8], local_context: [u8; 32]) -> Vec<u8> {
    let offset_state = HEAD_LEN;
    let offset_proof = HEAD_LEN + 32 + state.len() as u64 + pad32(state.len()) as u64;

    let mut out = Vec::with_capacity(
        4 + HEAD_LEN as usize
            + 32
            + state.len()
            + pad32(state.len())
            + 32
            + proof.len()
            + pad32(proof.len()),
    );
    out.extend_from_slice(&selector());
    out.extend_from_slice(&word_be(offset_state));
    out.extend_from_slice(&word_be(offset_proof));
    out.extend_from_slice(&local_context);

    out.extend_from_slice(&word_be(state.len() as u64));
    out.extend_from_slice(state);
    out.resize(out.len() + pad32(state.len()), 0);

    out.extend_from_slice(&word_be(proof.len() as u64));
    out.extend_from_slice(proof);
    out.resize(out.len() + pad32(proof.len()), 0);

    out
}

/// Decodes call data produced by [`encode_step_input`] back into
/// `(state, proof, local_context)`.
pub fn decode_step_input(data: &[u8]) -> Result<(Vec<u8>, Vec<u8>, [u8; 32]), WitnessCodecError> {
    if data.len() < 4 {
        return Err(WitnessCodecError::Truncated);
    }
    if data[0..4] != selector() {
        return Err(WitnessCodecError::BadSelector);
    }
    let head = &data[4..];
    if (head.len() as u64) < HEAD_LEN {
        return Err(WitnessCodecError::Malformed("head shorter than 3 words".into()));
    }

    let offset_state = word_to_u64(&head[0..32])?;
    let offset_proof = word_to_u64(&head[32..64])?;
    let mut local_context = [0u8; 32];
    local_context.copy_from_slice(&head[64..96]);

    let state = read_bytes_block(head, offset_state)?;
    let proof = read_bytes_block(head, offset_proof)?;
    Ok((state, proof, local_context))
}

fn read_bytes_block(head: &[u8], offset: u64) -> Result<Vec<u8>, WitnessCodecError> {
    let offset = offset as usize;
    if offset.checked_add(32).is_none_or(|end| end > head.len()) {
        return Err(WitnessCodecError::Malformed(
            "dynamic argument offset out of bounds".into(),
        ));
    }
    let len = word_to_u64(&head[offset..offset + 32])? as usize;
    let start = offset + 32;
    let end = start
        .checked_add(len)
        .ok_or_else(|| WitnessCodecError::Malformed("length overflow".into()))?;
    if end > head.len() {
        return Err(WitnessCodecError::Malformed(
            "dynamic argument length out of bounds".into(),
        ));
    }
    Ok(head[start..end].to_vec())
}
