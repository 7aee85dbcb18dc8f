pub mod c128;
pub mod c64;
pub mod pet;
pub mod ted;
pub mod vic20;

use std::path::PathBuf;

use crate::console::SharedConsole;
use crate::errors::EmuError;

/// The machine families the emulator can boot. `Ted` covers both the C16
/// and the Plus/4; they share ROMs and differ only in shipped RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemKind {
    Pet,
    Vic20,
    C64,
    Ted,
    C128,
}

impl SystemKind {
    /// The GO-statement arguments that name a machine.
    pub fn from_go_number(number: u16) -> Option<SystemKind> {
        match number {
            2001 => Some(SystemKind::Pet),
            20 => Some(SystemKind::Vic20),
            64 => Some(SystemKind::C64),
            4 | 16 => Some(SystemKind::Ted),
            128 => Some(SystemKind::C128),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SystemKind::Pet => "pet 2001",
            SystemKind::Vic20 => "vic-20",
            SystemKind::C64 => "c64",
            SystemKind::Ted => "c16/plus4",
            SystemKind::C128 => "c128",
        }
    }

    /// ROM images live in a subdirectory per machine.
    pub fn rom_subdir(&self) -> &'static str {
        match self {
            SystemKind::Pet => "pet",
            SystemKind::Vic20 => "vic20",
            SystemKind::C64 => "c64",
            SystemKind::Ted => "ted",
            SystemKind::C128 => "c128",
        }
    }

    pub fn default_ram_kb(&self) -> u32 {
        match self {
            SystemKind::Pet => 32,
            SystemKind::Vic20 => 5,
            SystemKind::C64 => 64,
            SystemKind::Ted => 64,
            SystemKind::C128 => 128,
        }
    }
}

/// How a machine's run loop ended. The launcher decides whether a switch
/// request means a reboot into another model or a normal exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequest {
    Switch(SystemKind),
}

/// Startup configuration shared by every machine model.
pub struct MachineConfig {
    /// RAM size override; `None` takes the machine's shipped default.
    pub ram_kb: Option<u32>,
    /// Directory holding the per-machine ROM subdirectories.
    pub rom_dir: PathBuf,
    /// Program to auto-load and RUN at the first READY prompt.
    pub startup_program: Option<PathBuf>,
}

impl MachineConfig {
    pub fn ram_kb_or(&self, kind: SystemKind) -> u32 {
        self.ram_kb.unwrap_or_else(|| kind.default_ram_kb())
    }

    pub fn rom_path(&self, kind: SystemKind, name: &str) -> PathBuf {
        self.rom_dir.join(kind.rom_subdir()).join(name)
    }
}

/// Boot the requested machine and run it until the firmware asks to leave.
pub fn run_system(
    kind: SystemKind,
    config: &MachineConfig,
    console: SharedConsole,
) -> Result<ExitRequest, EmuError> {
    match kind {
        SystemKind::Pet => pet::Pet::new(config, console)?.run(),
        SystemKind::Vic20 => vic20::Vic20::new(config, console)?.run(),
        SystemKind::C64 => c64::C64::new(config, console)?.run(),
        SystemKind::Ted => ted::Ted::new(config, console)?.run(),
        SystemKind::C128 => c128::C128::new(config, console)?.run(),
    }
}
