//! Concrete interpreter (spec §4.E): decode, execute, and commit directly
//! against an in-memory [`PagedMemory`], collecting the access list the
//! Merkleizer needs as it goes.

use fpvm_memory::PagedMemory;
use fpvm_merkle::{Hash32, Witness, collect_witness};
use fpvm_preimage::PreimageSource;
use fpvm_state::Scalars;

use crate::error::FpvmError;

/// The fast evaluator's concrete state: scalars plus a resident memory
/// image, as opposed to the slow evaluator's root-and-witness view.
#[derive(Clone)]
pub struct FastState {
    pub scalars: Scalars,
    pub memory: PagedMemory,
}

impl FastState {
    pub fn new(scalars: Scalars, memory: PagedMemory) -> Self {
        Self { scalars, memory }
    }

    pub fn root(&self) -> Hash32 {
        fpvm_merkle::root(&self.scalars, &self.memory)
    }
}

/// Everything a single fast step produced: the roots on either side, plus
/// the witness a slow evaluator would need to reproduce the same step.
pub struct StepOutcome {
    pub pre_root: Hash32,
    pub post_root: Hash32,
    pub witness: Witness,
}

/// Executes one instruction at `state.scalars.pc`, mutating `state` in
/// place and returning the witness for that step.
pub fn step(state: &mut FastState, oracle: &dyn PreimageSource) -> Result<StepOutcome, FpvmError> {
    state.memory.reset_touched();
    let pre_root = state.root();
    let scalars_pre = state.scalars.clone();

    tracing::trace!(step = scalars_pre.step, pc = scalars_pre.pc, "executing step");
    fpvm_isa::step(&mut state.scalars, &mut state.memory, oracle)?;

    let witness = collect_witness(&scalars_pre, &state.memory);
    let post_root = state.root();

    Ok(StepOutcome {
        pre_root,
        post_root,
        witness,
    })
}

/// Runs up to `max_steps` instructions, stopping early once the program
/// sets `exited`. Returns the number of steps actually executed.
pub fn run(
    state: &mut FastState,
    oracle: &dyn PreimageSource,
    max_steps: u64,
) -> Result<u64, FpvmError> {
    let mut executed = 0;
    while executed < max_steps && !state.scalars.exited {
        step(state, oracle)?;
        executed += 1;
    }
    Ok(executed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpvm_memory::Memory as _;
    use fpvm_preimage::PreimageOracle;

    #[test]
    fn single_addi_step_advances_state_and_root() {
        let mut memory = PagedMemory::new();
        memory.write_u32(0x1000, 0x1230_0093); // ADDI x1, x0, 0x123
        let mut scalars = Scalars::new();
        scalars.pc = 0x1000;
        let mut state = FastState::new(scalars, memory);
        let oracle = PreimageOracle::new();

        let pre_root = state.root();
        let outcome = step(&mut state, &oracle).unwrap();

        assert_eq!(outcome.pre_root, pre_root);
        assert_eq!(state.scalars.get_register(1), 0x123);
        assert_ne!(outcome.post_root, outcome.pre_root);
        assert_eq!(outcome.post_root, state.root());
    }

    #[test]
    fn run_stops_at_exit() {
        let mut memory = PagedMemory::new();
        memory.write_u32(0x1000, 0x0000_0073); // ECALL
        let mut scalars = Scalars::new();
        scalars.pc = 0x1000;
        scalars.set_register(17, 93);
        scalars.set_register(10, 0);
        let mut state = FastState::new(scalars, memory);
        let oracle = PreimageOracle::new();

        let executed = run(&mut state, &oracle, 100).unwrap();
        assert_eq!(executed, 1);
        assert!(state.scalars.exited);
    }
}
