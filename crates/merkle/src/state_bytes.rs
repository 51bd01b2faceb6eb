//! The canonical VM state serialization referenced by spec §6's step input
//! ABI: a fixed-layout byte encoding of [`Scalars`], compact rather than the
//! 32-byte-per-field shape [`crate::scalar`] folds into the tree.

use fpvm_state::{NUM_REGISTERS, Scalars};

use crate::error::MerkleError;

/// `pc(8) + exited(1) + exit_code(1) + step(8) + heap(8) +
/// load_reservation(8) + preimage_key(32) + preimage_offset(8) +
/// preimage_key_write_len(1) + registers(32 * 8)`.
pub const STATE_BYTES_LEN: usize = 8 + 1 + 1 + 8 + 8 + 8 + 32 + 8 + 1 + NUM_REGISTERS * 8;

pub fn encode_state(s: &Scalars) -> Vec<u8> {
    let mut out = Vec::with_capacity(STATE_BYTES_LEN);
    out.extend_from_slice(&s.pc.to_le_bytes());
    out.push(s.exited as u8);
    out.push(s.exit_code);
    out.extend_from_slice(&s.step.to_le_bytes());
    out.extend_from_slice(&s.heap.to_le_bytes());
    out.extend_from_slice(&s.load_reservation.to_le_bytes());
    out.extend_from_slice(&s.preimage_key);
    out.extend_from_slice(&s.preimage_offset.to_le_bytes());
    out.push(s.preimage_key_write_len);
    for r in &s.registers {
        out.extend_from_slice(&r.to_le_bytes());
    }
    debug_assert_eq!(out.len(), STATE_BYTES_LEN);
    out
}

pub fn decode_state(bytes: &[u8]) -> Result<Scalars, MerkleError> {
    if bytes.len() != STATE_BYTES_LEN {
        return Err(MerkleError::MalformedState(format!(
            "expected {STATE_BYTES_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let mut cur = bytes;
    let pc = take_u64(&mut cur);
    let exited = take_u8(&mut cur) != 0;
    let exit_code = take_u8(&mut cur);
    let step = take_u64(&mut cur);
    let heap = take_u64(&mut cur);
    let load_reservation = take_u64(&mut cur);
    let mut preimage_key = [0u8; 32];
    preimage_key.copy_from_slice(&cur[..32]);
    cur = &cur[32..];
    let preimage_offset = take_u64(&mut cur);
    let preimage_key_write_len = take_u8(&mut cur);
    let mut registers = [0u64; NUM_REGISTERS];
    for r in registers.iter_mut() {
        *r = take_u64(&mut cur);
    }

    Ok(Scalars {
        pc,
        registers,
        heap,
        load_reservation,
        exited,
        exit_code,
        step,
        preimage_key,
        preimage_offset,
        preimage_key_write_len,
    })
}

fn take_u64(cur: &mut &[u8]) -> u64 {
    let (head, tail) = cur.split_at(8);
    *cur = tail;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(head);
    u64::from_le_bytes(buf)
}

fn take_u8(cur: &mut &[u8]) -> u8 {
    let (head, tail) = cur.split_at(1);
    *cur = tail;
    head[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let mut s = Scalars::new();
        s.pc = 0x1234;
        s.registers[5] = 0xDEAD;
        s.exited = true;
        s.exit_code = 1;
        s.preimage_key = [9u8; 32];
        let bytes = encode_state(&s);
        assert_eq!(bytes.len(), STATE_BYTES_LEN);
        assert_eq!(decode_state(&bytes).unwrap(), s);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(decode_state(&[0u8; 4]).is_err());
    }
}
