//! Runs the upstream `rv64ui-p`/`rv64um-p` RISC-V ISA test binaries end to
//! end, checking the fast/slow evaluators agree at every step and that each
//! test program exits with code 0 inside a fixed step budget.
//!
//! Ignored by default: the fixture ELFs are not vendored into this repo, the
//! same way the teacher's own `tooling/ef_tests` expects an external Ethereum
//! Foundation test fixture checkout rather than bundling it. Point
//! `FPVM_ISA_TEST_DIR` at a directory of `rv64ui-p-*`/`rv64um-p-*` ELF
//! binaries (e.g. a `riscv-tests` build output) to run this locally.

use std::path::PathBuf;

use fpvm_evaluator::{FastState, run_checked};
use fpvm_preimage::PreimageOracle;

const MAX_STEPS: u64 = 10_000;

fn fixture_dir() -> Option<PathBuf> {
    std::env::var_os("FPVM_ISA_TEST_DIR").map(PathBuf::from)
}

#[test]
#[ignore = "requires an external riscv-tests ELF checkout; see module docs"]
fn isa_test_binaries_pass_under_both_evaluators() {
    let dir = fixture_dir().expect("FPVM_ISA_TEST_DIR must point at a riscv-tests build");
    let mut ran = 0;
    for entry in std::fs::read_dir(&dir).expect("reading FPVM_ISA_TEST_DIR") {
        let path = entry.expect("reading directory entry").path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !(name.starts_with("rv64ui-p-") || name.starts_with("rv64um-p-")) {
            continue;
        }

        let bytes = std::fs::read(&path).unwrap_or_else(|e| panic!("reading {name}: {e}"));
        let (scalars, memory) = fpvm_elf::load(&bytes).unwrap_or_else(|e| panic!("loading {name}: {e}"));
        let mut state = FastState::new(scalars, memory);
        let oracle = PreimageOracle::new();

        run_checked(&mut state, &oracle, MAX_STEPS)
            .unwrap_or_else(|e| panic!("{name}: fast/slow evaluators disagreed: {e}"));
        assert!(state.scalars.exited, "{name}: did not exit within {MAX_STEPS} steps");
        assert_eq!(state.scalars.exit_code, 0, "{name}: exited with failure code");
        ran += 1;
    }
    assert!(ran > 0, "no rv64ui-p-*/rv64um-p-* binaries found under {}", dir.display());
}
