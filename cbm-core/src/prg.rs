use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Commodore DOS error codes as BASIC reports them. These travel to the
/// firmware through A with C set; they are never host-side errors.
pub mod error_code {
    pub const GENERIC: u8 = 1;
    pub const FILE_NOT_FOUND: u8 = 4;
    pub const ILLEGAL_QUANTITY: u8 = 14;
    pub const VERIFY: u8 = 28;
}

/// A program file: two little-endian header bytes naming the load address,
/// then the payload.
pub struct Prg {
    pub load_address: u16,
    pub data: Vec<u8>,
}

impl Prg {
    pub fn read(path: &Path) -> io::Result<Prg> {
        let bytes = fs::read(path)?;
        if bytes.len() < 2 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "program file shorter than its header",
            ));
        }
        Ok(Prg {
            load_address: u16::from_le_bytes([bytes[0], bytes[1]]),
            data: bytes[2..].to_vec(),
        })
    }

    pub fn write(path: &Path, load_address: u16, data: &[u8]) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(data.len() + 2);
        bytes.extend_from_slice(&load_address.to_le_bytes());
        bytes.extend_from_slice(data);
        fs::write(path, bytes)
    }
}

/// Find a program on disk the way the emulated LOAD does: the name as given,
/// then with a `.prg` suffix appended.
pub fn resolve_program(name: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Some(direct);
    }
    let with_suffix = PathBuf::from(format!("{}.prg", name));
    if with_suffix.is_file() {
        return Some(with_suffix);
    }
    None
}
