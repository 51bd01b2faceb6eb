use std::path::PathBuf;

use clap::{Parser as ClapParser, Subcommand as ClapSubcommand};

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[derive(ClapParser)]
#[command(name = "fpvm", version = VERSION_STRING, about = "Fault-proof RISC-V VM reference evaluator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapSubcommand)]
pub enum Command {
    /// Runs a 64-bit RISC-V ELF to completion (or up to a step budget).
    Run {
        elf: PathBuf,
        #[arg(long, default_value_t = 1_000_000)]
        max_steps: u64,
        /// Replays every fast step through the slow evaluator and fails on
        /// the first root disagreement.
        #[arg(long)]
        check_slow: bool,
    },
    /// Emits the ABI-encoded step call data for a single step.
    Witness {
        elf: PathBuf,
        #[arg(long)]
        step: u64,
        #[arg(long, default_value = "0000000000000000000000000000000000000000000000000000000000000000")]
        local_context: String,
    },
    /// Prints the scalar state and root after running up to `step` steps.
    State {
        elf: PathBuf,
        #[arg(long, default_value_t = 0)]
        step: u64,
    },
}
