pub mod cpu;
pub mod dos;
pub mod error;
pub mod flags;
pub mod input;
pub mod loader;
pub mod memory;
pub mod startup;
pub mod timer;
pub mod video;

use std::path::Path;

use log::info;

use cpu::Cpu;
use dos::DosState;
use error::CoreResult;
use memory::Memory;

/// Boot-time configuration for a `Runtime`: everything the entry
/// orchestrator needs to know before the first translated instruction
/// would execute.
pub struct Configuration {
    pub exe_path: std::path::PathBuf,
    pub game_dir: String,
    pub scale: u32,
}

impl Configuration {
    pub fn new(exe_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            exe_path: exe_path.into(),
            game_dir: ".".into(),
            scale: 3,
        }
    }
}

/// Bundles the CPU, flat memory, and DOS/BIOS process state that every
/// translated routine would operate on. `Runtime::boot` performs the MZ
/// load and MSC startup simulation; actually executing translated game
/// code is outside this crate (the static translator is an external
/// collaborator) — callers that link a translator call into `cpu`/`mem`/
/// `dos` directly after `boot` returns.
pub struct Runtime {
    pub cpu: Cpu,
    pub mem: Memory,
    pub dos: DosState,
}

impl Runtime {
    pub fn boot(config: &Configuration) -> CoreResult<Self> {
        let mut cpu = Cpu::new();
        let mut mem = Memory::try_new()?;
        let dos = DosState::new(config.game_dir.clone());

        loader::load_exe(&config.exe_path, &mut cpu, &mut mem)?;
        dos.init(&mut mem);
        startup::run_msc_startup(&mut cpu, &mut mem);

        info!(
            "Booted {} (gamedir={}, scale={})",
            config.exe_path.display(),
            config.game_dir,
            config.scale
        );

        Ok(Self { cpu, mem, dos })
    }

    pub fn install_poll_events(&mut self, f: dos::PollEventsFn) {
        self.dos.set_poll_events(f);
    }

    /// Dispatches interrupt `vector` with the current register state,
    /// mutating `self.cpu`/`self.mem`/`self.dos` in place per the
    /// register-in/register-out discipline translated code expects.
    pub fn dispatch_interrupt(&mut self, vector: u8, host_ms: u64) {
        match vector {
            0x10 => dos::int10(&mut self.cpu, &mut self.mem),
            0x16 => dos::int16(&mut self.cpu, &mut self.dos),
            0x21 => dos::int21(&mut self.cpu, &mut self.mem, &mut self.dos),
            0x33 => dos::mouse_int33(&mut self.cpu, &mut self.dos),
            0x08 | 0x20 => {
                dos::int_handler(vector, &mut self.cpu, &mut self.mem, &mut self.dos, host_ms)
            }
            other => {
                log::warn!("[DOS] unhandled interrupt vector {:#04X}", other);
            }
        }
    }

    pub fn port_out8(&mut self, port: u16, value: u8) {
        dos::port_out8(&mut self.dos, port, value);
    }

    pub fn port_in8(&mut self, port: u16) -> u8 {
        dos::port_in8(&mut self.dos, port)
    }

    pub fn is_halted(&self) -> bool {
        self.cpu.halted
    }

    /// Runs the cooperative frame loop: each iteration pumps host events
    /// once via the installed `poll_events` callback and fires the timer
    /// interrupt, stopping as soon as `cpu.halted` is observed. With no
    /// translator linked there is no translated code to call between
    /// iterations — this loop exists to exercise the event-pump contract
    /// end to end.
    pub fn run_frame_loop(&mut self, host_ms: impl Fn() -> u64) {
        while !self.cpu.halted {
            self.dos.poll(&self.cpu);
            self.dispatch_interrupt(0x08, host_ms());
            if !self.dos.has_poll_events() {
                break;
            }
        }
    }
}

pub fn load_exe_path(path: impl AsRef<Path>) -> Configuration {
    Configuration::new(path.as_ref().to_path_buf())
}
