//! End-to-end fast/slow equivalence over small hand-assembled programs
//! (property 1/2): every step the fast evaluator takes must be reproducible
//! by the slow evaluator from nothing but that step's witness.

use fpvm_evaluator::{FastState, run_checked};
use fpvm_memory::{Memory as _, PagedMemory};
use fpvm_preimage::PreimageOracle;
use fpvm_state::Scalars;

fn assemble(mem: &mut PagedMemory, base: u64, words: &[u32]) {
    for (i, w) in words.iter().enumerate() {
        mem.write_u32(base + i as u64 * 4, *w);
    }
}

#[test]
fn counts_down_a_register_to_zero_via_a_branch_loop() {
    let mut mem = PagedMemory::new();
    assemble(
        &mut mem,
        0x1000,
        &[
            0x00a0_0093, // ADDI x1, x0, 10
            0xfff0_8093, // ADDI x1, x1, -1
            0xfe00_9ee3, // BNE x1, x0, -4
            0x0000_0073, // ECALL (a7 = 94 exit_group, a0 = 0)
        ],
    );
    let mut scalars = Scalars::new();
    scalars.pc = 0x1000;
    scalars.set_register(17, 94);
    let mut state = FastState::new(scalars, mem);
    let oracle = PreimageOracle::new();

    let executed = run_checked(&mut state, &oracle, 64).unwrap();

    assert!(state.scalars.exited);
    assert_eq!(state.scalars.exit_code, 0);
    assert_eq!(state.scalars.get_register(1), 0);
    // 1 (init) + 10 * (dec + branch) + 1 (final branch falls through) + 1 (ecall)
    assert_eq!(executed, 1 + 10 * 2 + 1);
}

#[test]
fn stores_and_loads_across_a_leaf_boundary_then_exits() {
    let mut mem = PagedMemory::new();
    assemble(
        &mut mem,
        0x1000,
        &[
            0x07b0_0093, // ADDI x1, x0, 123
            0x03d0_0113, // ADDI x2, x0, 61   (unaligned, crosses a 64-byte leaf)
            0x0011_3023, // SD x1, 0(x2)
            0x0001_3183, // LD x3, 0(x2)
            0x0000_0073, // ECALL
        ],
    );
    let mut scalars = Scalars::new();
    scalars.pc = 0x1000;
    scalars.set_register(17, 94);
    let mut state = FastState::new(scalars, mem);
    let oracle = PreimageOracle::new();

    let executed = run_checked(&mut state, &oracle, 16).unwrap();

    assert!(state.scalars.exited);
    assert_eq!(state.scalars.get_register(3), 123);
    assert_eq!(executed, 5);
}
