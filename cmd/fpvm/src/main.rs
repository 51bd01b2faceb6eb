mod cli;

use clap::Parser as ClapParser;
use eyre::{Context, eyre};
use tracing::info;

use cli::{Cli, Command};
use fpvm_evaluator::{FastState, run, run_checked, witness_at_step};
use fpvm_preimage::PreimageOracle;

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            elf,
            max_steps,
            check_slow,
        } => run_command(elf, max_steps, check_slow),
        Command::Witness {
            elf,
            step,
            local_context,
        } => witness_command(elf, step, local_context),
        Command::State { elf, step } => state_command(elf, step),
    }
}

fn load_elf(path: std::path::PathBuf) -> eyre::Result<FastState> {
    let bytes = std::fs::read(&path).wrap_err_with(|| format!("reading {}", path.display()))?;
    let (scalars, memory) = fpvm_elf::load(&bytes).wrap_err("loading ELF image")?;
    Ok(FastState::new(scalars, memory))
}

fn run_command(elf: std::path::PathBuf, max_steps: u64, check_slow: bool) -> eyre::Result<()> {
    let mut state = load_elf(elf)?;
    let oracle = PreimageOracle::new();

    let executed = if check_slow {
        run_checked(&mut state, &oracle, max_steps)?
    } else {
        run(&mut state, &oracle, max_steps)?
    };

    info!(executed, exited = state.scalars.exited, exit_code = state.scalars.exit_code, "run complete");
    println!("steps executed: {executed}");
    println!("exited: {}", state.scalars.exited);
    println!("exit_code: {}", state.scalars.exit_code);
    println!("root: 0x{}", hex::encode(state.root()));
    Ok(())
}

fn witness_command(elf: std::path::PathBuf, step: u64, local_context: String) -> eyre::Result<()> {
    if step == 0 {
        return Err(eyre!("--step must be >= 1 (steps are 1-indexed)"));
    }
    let mut state = load_elf(elf)?;
    let oracle = PreimageOracle::new();

    let outcome = witness_at_step(&mut state, &oracle, step)?
        .ok_or_else(|| eyre!("program exited before reaching step {step}"))?;

    let local_context_bytes = decode_local_context(&local_context)?;
    // `outcome.witness.scalars` is the pre-step scalar leaves the proof was
    // collected against; `state.scalars` has already advanced past this step.
    let pre_scalars = fpvm_merkle::decode_scalars(&outcome.witness.scalars);
    let state_bytes = fpvm_merkle::encode_state(&pre_scalars);
    let proof_bytes = fpvm_merkle::encode_proof(&outcome.witness.memory);
    let call_data = fpvm_witness_codec::encode_step_input(&state_bytes, &proof_bytes, local_context_bytes);

    println!("pre_root: 0x{}", hex::encode(outcome.pre_root));
    println!("post_root: 0x{}", hex::encode(outcome.post_root));
    println!("call_data: 0x{}", hex::encode(call_data));
    Ok(())
}

fn state_command(elf: std::path::PathBuf, step: u64) -> eyre::Result<()> {
    let mut state = load_elf(elf)?;
    let oracle = PreimageOracle::new();
    if step > 0 {
        run(&mut state, &oracle, step)?;
    }

    let json = serde_json::to_string_pretty(&state.scalars).wrap_err("serializing state")?;
    println!("{json}");
    println!("root: 0x{}", hex::encode(state.root()));
    Ok(())
}

fn decode_local_context(s: &str) -> eyre::Result<[u8; 32]> {
    let bytes = hex::decode(s.trim_start_matches("0x")).wrap_err("decoding --local-context as hex")?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| eyre!("--local-context must be exactly 32 bytes, got {}", b.len()))
}
