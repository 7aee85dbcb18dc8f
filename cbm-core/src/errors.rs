use std::fmt;
use std::io;
use std::path::PathBuf;

/// Every failure the emulator core can surface to the host. Emulated-program
/// errors (FILE NOT FOUND and friends) are not represented here; those travel
/// through the C flag and the A register back into the running firmware.
#[derive(Debug)]
pub enum EmuError {
    /// A firmware image was missing or had the wrong length.
    RomImage { path: PathBuf, message: String },
    /// The CPU fetched an opcode outside the documented instruction set.
    IllegalOpcode { pc: u16, opcode: u8 },
    /// Bad machine tag, RAM size, or other startup configuration.
    Config(String),
    /// Host I/O failure outside of LOAD/SAVE emulation.
    Io(io::Error),
}

impl From<io::Error> for EmuError {
    fn from(error: io::Error) -> Self {
        EmuError::Io(error)
    }
}

impl fmt::Display for EmuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmuError::RomImage { path, message } => {
                write!(f, "rom image {}: {}", path.display(), message)
            }
            EmuError::IllegalOpcode { pc, opcode } => {
                write!(f, "illegal opcode {:#04x} at {:#06x}", opcode, pc)
            }
            EmuError::Config(message) => write!(f, "configuration error: {}", message),
            EmuError::Io(error) => write!(f, "i/o error: {}", error),
        }
    }
}

impl std::error::Error for EmuError {}
