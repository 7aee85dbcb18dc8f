mod console;
mod log;
mod petscii;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use cbm_core::console::SharedConsole;
use cbm_core::errors::EmuError;
use cbm_core::machines::{self, ExitRequest, MachineConfig, SystemKind};
use cbm_core::prg::resolve_program;

#[derive(Parser)]
#[command(
    name = "cbm",
    about = "Commodore 8-bit machines on a text terminal",
    version,
    args_conflicts_with_subcommands = true,
    disable_help_subcommand = true
)]
struct Cli {
    /// Machine to emulate
    #[arg(value_enum, default_value = "c64")]
    system: SystemArg,

    /// RAM size in kilobytes, within the machine's valid set
    #[arg(long)]
    ram: Option<u32>,

    /// Directory holding the per-machine ROM images
    #[arg(long, default_value = "roms")]
    roms: PathBuf,

    /// Program to load and RUN at the READY prompt (".prg" may be omitted)
    program: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Static-reachability walk of a ROM image (separate tooling)
    Walk {
        /// Extra entry points, as hex addresses
        addresses: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SystemArg {
    C64,
    Vic20,
    Pet,
    C16,
    Plus4,
    Ted,
    C128,
}

impl SystemArg {
    fn kind(self) -> SystemKind {
        match self {
            SystemArg::C64 => SystemKind::C64,
            SystemArg::Vic20 => SystemKind::Vic20,
            SystemArg::Pet => SystemKind::Pet,
            SystemArg::C16 | SystemArg::Plus4 | SystemArg::Ted => SystemKind::Ted,
            SystemArg::C128 => SystemKind::C128,
        }
    }

    /// The C16 tag is the 16K flavor of the TED machine; every other tag
    /// takes the machine's shipped default.
    fn ram_kb(self) -> Option<u32> {
        match self {
            SystemArg::C16 => Some(16),
            _ => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    log::init_log();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error.to_string().red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), EmuError> {
    if let Some(Commands::Walk { addresses }) = cli.command {
        log::log(&format!("walk requested with entry points {:?}", addresses));
        return Err(EmuError::Config(
            "the reachability walker is separate tooling, not built into this binary".into(),
        ));
    }

    let startup_program = match &cli.program {
        Some(name) => Some(resolve_program(name).ok_or_else(|| {
            EmuError::Config(format!("program {} not found (tried {}.prg too)", name, name))
        })?),
        None => None,
    };

    let mut kind = cli.system.kind();
    let mut config = MachineConfig {
        ram_kb: cli.ram.or(cli.system.ram_kb()),
        rom_dir: cli.roms,
        startup_program,
    };

    let console: SharedConsole = console::TermConsole::new()?;

    // Boot machines until one of them asks to become itself: a GO aimed at
    // the machine already running is the way out.
    loop {
        log::log(&format!("booting {}", kind.name()));
        let ExitRequest::Switch(next) = machines::run_system(kind, &config, console.clone())?;
        if next == kind {
            log::log("machine requested exit");
            return Ok(());
        }
        log::log(&format!("switching to {}", next.name()));
        kind = next;
        config.ram_kb = None;
        config.startup_program = None;
    }
}
