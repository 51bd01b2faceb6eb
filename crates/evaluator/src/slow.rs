//! Slow evaluator (spec §4.F): the same instruction semantics as [`crate::fast`],
//! expressed as a pure `(pre_root, witness) -> post_root` fold that never
//! materializes more of the memory tree than the witness supplies.

use fpvm_merkle::{Hash32, Replayer, Witness};
use fpvm_preimage::PreimageSource;

use crate::error::FpvmError;

/// Authenticates `witness` against `pre_root`, applies one instruction, and
/// folds the result into `post_root`. Fatal on any witness or decode error
/// (spec §7): there is no partial result to recover.
pub fn slow_step(
    pre_root: Hash32,
    witness: &Witness,
    oracle: &dyn PreimageSource,
) -> Result<Hash32, FpvmError> {
    let (mut scalars, mut mem, replayer) = Replayer::new(pre_root, witness)?;
    fpvm_isa::step(&mut scalars, &mut mem, oracle)?;
    let post_root = replayer.finish(&scalars, mem)?;
    Ok(post_root)
}
