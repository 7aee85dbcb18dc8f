use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::errors::EmuError;

/// Value returned for reads that hit no decoded region. Unconnected data bus
/// lines float high on these machines.
pub const OPEN_BUS: u8 = 0xFF;

/// A 16-bit address decoded into one byte of backing storage. Every machine
/// model supplies its own implementation; the CPU fetches exclusively through
/// this trait and never assumes a flat 64 KiB array.
///
/// `read` takes `&mut self` because a small number of registers change state
/// when read (the C128 raster register flips bit 7 on every access so firmware
/// timing loops terminate). All other reads must be idempotent. Writes are
/// allowed side effects far from the written address: bank switches, ROM
/// configuration, color changes pushed at the console.
pub trait AddressSpace {
    fn read(&mut self, address: u16) -> u8;
    fn write(&mut self, address: u16, value: u8);

    /// Little-endian u16 helper used for vectors and zero-page pointers.
    fn read_u16(&mut self, address: u16) -> u16 {
        let lo = self.read(address);
        let hi = self.read(address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn write_u16(&mut self, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(address, lo);
        self.write(address.wrapping_add(1), hi);
    }
}

/// The machine model and the CPU both need the address space; this is the
/// same single-threaded shared-ownership idiom the CPU/bus split uses
/// everywhere else in the workspace.
pub type SharedAddressSpace = Rc<RefCell<dyn AddressSpace>>;

/// Load one firmware image and insist on its exact expected length. A short
/// or padded image would silently shift every entry point, so a mismatch is a
/// startup error rather than a warning.
pub fn load_rom(path: &Path, expected_len: usize) -> Result<Vec<u8>, EmuError> {
    let data = fs::read(path).map_err(|error| EmuError::RomImage {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    if data.len() != expected_len {
        return Err(EmuError::RomImage {
            path: path.to_path_buf(),
            message: format!("expected {} bytes, found {}", expected_len, data.len()),
        });
    }
    Ok(data)
}

#[cfg(test)]
mod test {
    use super::*;

    struct Flat {
        bytes: [u8; 0x100],
    }

    impl AddressSpace for Flat {
        fn read(&mut self, address: u16) -> u8 {
            self.bytes[address as usize & 0xFF]
        }
        fn write(&mut self, address: u16, value: u8) {
            self.bytes[address as usize & 0xFF] = value;
        }
    }

    #[test]
    fn u16_helpers_are_little_endian() {
        let mut flat = Flat { bytes: [0; 0x100] };
        flat.write_u16(0x0010, 0xBEEF);
        assert_eq!(flat.read(0x0010), 0xEF);
        assert_eq!(flat.read(0x0011), 0xBE);
        assert_eq!(flat.read_u16(0x0010), 0xBEEF);
    }
}
