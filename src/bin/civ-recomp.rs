//! Entry orchestrator: parses the command line, loads the MZ image, runs
//! the MSC startup simulation, and drives the cooperative frame loop. No
//! translator is linked here, so there is no translated game code to call
//! into between frames — this binary exists to prove the execution core
//! boots and wires up end to end.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;

use civ_recomp_core::{Configuration, Runtime};

#[derive(Parser, Debug)]
#[command(name = "civ-recomp", about = "Civilization static-recompilation execution core")]
struct Args {
    /// Window-scale multiplier.
    #[arg(long, default_value_t = 3)]
    scale: u32,

    /// Root directory for DOS file paths.
    #[arg(long, default_value = ".")]
    gamedir: String,

    /// Path to the MZ executable to run.
    #[arg(default_value = "CIV.EXE")]
    exe_path: PathBuf,
}

fn host_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut config = Configuration::new(args.exe_path);
    config.game_dir = args.gamedir;
    config.scale = args.scale;

    let mut runtime = match Runtime::boot(&config) {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.run_frame_loop(host_ms);

    ExitCode::SUCCESS
}
