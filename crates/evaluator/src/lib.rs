//! Ties the memory, Merkleizer, pre-image oracle, and ISA crates together
//! into the fast (concrete) and slow (witness-driven) evaluators, and
//! aggregates their error taxonomy (spec §7).

mod error;
mod fast;
mod slow;

pub use error::FpvmError;
pub use fast::{FastState, StepOutcome, run, step};
pub use slow::slow_step;

use fpvm_preimage::PreimageSource;

/// Runs the fast evaluator step by step, replaying each step through the
/// slow evaluator and failing fast on the first root disagreement. This is
/// the differential-testing harness spec §8's invariant 1 describes.
pub fn run_checked(
    state: &mut FastState,
    oracle: &dyn PreimageSource,
    max_steps: u64,
) -> Result<u64, FpvmError> {
    let mut executed = 0;
    while executed < max_steps && !state.scalars.exited {
        let outcome = step(state, oracle)?;
        let slow_post = slow_step(outcome.pre_root, &outcome.witness, oracle)?;
        if slow_post != outcome.post_root {
            return Err(FpvmError::RootMismatch {
                step: state.scalars.step,
                fast: outcome.post_root,
                slow: slow_post,
            });
        }
        executed += 1;
    }
    Ok(executed)
}

/// Runs the fast evaluator up to and including step number `target_step`
/// (1-indexed), returning that step's [`StepOutcome`] — or `None` if the
/// program exited first.
pub fn witness_at_step(
    state: &mut FastState,
    oracle: &dyn PreimageSource,
    target_step: u64,
) -> Result<Option<StepOutcome>, FpvmError> {
    let mut last = None;
    for i in 1..=target_step {
        if state.scalars.exited {
            return Ok(None);
        }
        let outcome = step(state, oracle)?;
        if i == target_step {
            last = Some(outcome);
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpvm_memory::{Memory as _, PagedMemory};
    use fpvm_preimage::PreimageOracle;
    use fpvm_state::Scalars;

    #[test]
    fn run_checked_agrees_across_several_steps() {
        let mut memory = PagedMemory::new();
        memory.write_u32(0x1000, 0x1230_0093); // ADDI x1, x0, 0x123
        memory.write_u32(0x1004, 0x0020_8133); // ADD x2, x1, x2
        memory.write_u32(0x1008, 0x0000_0073); // ECALL (exit(0) with a7=0 -> ENOSYS, harmless)
        let mut scalars = Scalars::new();
        scalars.pc = 0x1000;
        scalars.set_register(17, 94);
        let mut state = FastState::new(scalars, memory);
        let oracle = PreimageOracle::new();

        let executed = run_checked(&mut state, &oracle, 10).unwrap();
        assert_eq!(executed, 3);
        assert!(state.scalars.exited);
    }

    #[test]
    fn witness_at_step_returns_the_requested_steps_witness() {
        let mut memory = PagedMemory::new();
        memory.write_u32(0x1000, 0x1230_0093); // ADDI x1, x0, 0x123
        memory.write_u32(0x1004, 0x0020_0113); // ADDI x2, x0, 0x2... actually ADDI x2,x0,2
        let mut scalars = Scalars::new();
        scalars.pc = 0x1000;
        let mut state = FastState::new(scalars, memory);
        let oracle = PreimageOracle::new();

        let outcome = witness_at_step(&mut state, &oracle, 2).unwrap().unwrap();
        assert_eq!(outcome.post_root, state.root());
        assert_eq!(state.scalars.step, 2);
    }
}
