use std::cell::RefCell;
use std::rc::Rc;

use crate::console::SharedConsole;
use crate::cpu_6502::Cpu6502;
use crate::errors::EmuError;
use crate::hooks::{KernalHooks, KernalMap};
use crate::machines::{ExitRequest, MachineConfig, SystemKind};
use crate::mem::{load_rom, AddressSpace, SharedAddressSpace, OPEN_BUS};

// BASIC 3.5 entry points. The KERNAL jump table kept the standard
// addresses; the BASIC side moved with the bigger interpreter.
const READY: u16 = 0x8703;
const MAIN_LOOP: u16 = 0x8712;
const LINK_PROGRAM: u16 = 0x8818;
const CLEAR_VARS: u16 = 0x8A88;
const BASIC_START: u8 = 0x2B;
const VARIABLES_START: u8 = 0x2D;
const LINK_END: u8 = 0x22;
const TEXT_POINTER: u8 = 0x3B;

fn kernal_map() -> KernalMap {
    KernalMap {
        chrout: 0xFFD2,
        chrin: 0xFFCF,
        getin: 0xFFE4,
        stop: 0xFFE1,
        setlfs: Some(0xFFBA),
        setnam: Some(0xFFBD),
        load: Some(0xFFD5),
        save: Some(0xFFD8),
        ready: READY,
        main_loop: MAIN_LOOP,
        link_program: LINK_PROGRAM,
        clear_vars: CLEAR_VARS,
        go_exec: None,
        basic_start: BASIC_START,
        variables_start: VARIABLES_START,
        link_end: LINK_END,
        text_pointer: TEXT_POINTER,
        foreground_color: None,
    }
}

pub struct TedImages {
    pub basic: Vec<u8>,
    pub kernal: Vec<u8>,
}

impl TedImages {
    pub fn load(config: &MachineConfig) -> Result<TedImages, EmuError> {
        let kind = SystemKind::Ted;
        Ok(TedImages {
            basic: load_rom(&config.rom_path(kind, "basic"), 0x4000)?,
            kernal: load_rom(&config.rom_path(kind, "kernal"), 0x4000)?,
        })
    }
}

const VALID_RAM_KB: [u32; 3] = [16, 32, 64];

/// The C16/Plus-4 address space. RAM smaller than 64 K mirrors through the
/// whole window by address masking. The TED chip's ROM banking has two
/// independent pieces: a global ROM-enable toggled through FF3E/FF3F, and a
/// four-way configuration register written through its own address range at
/// FDD0, selecting which image occupies each ROM half. Only BASIC and
/// KERNAL exist here; the function and cartridge slots read as open bus.
pub struct TedMemory {
    ram: Vec<u8>,
    mask: usize,
    basic_rom: Vec<u8>,
    kernal_rom: Vec<u8>,
    /// FD00-FF3F, never banked.
    io: Vec<u8>,
    rom_enabled: bool,
    rom_config: u8,
}

impl TedMemory {
    pub fn new(images: TedImages, ram_kb: u32) -> TedMemory {
        assert_eq!(images.basic.len(), 0x4000);
        assert_eq!(images.kernal.len(), 0x4000);
        assert!(VALID_RAM_KB.contains(&ram_kb));
        let size = ram_kb as usize * 1024;
        TedMemory {
            ram: vec![0; size],
            mask: size - 1,
            basic_rom: images.basic,
            kernal_rom: images.kernal,
            io: vec![0; 0x0240],
            rom_enabled: true,
            rom_config: 0,
        }
    }

    /// Which image the low ROM half (8000-BFFF) selects: only slot 0
    /// (BASIC) is populated.
    fn low_rom(&self, address: u16) -> u8 {
        match self.rom_config & 0b11 {
            0 => self.basic_rom[(address - 0x8000) as usize],
            _ => OPEN_BUS,
        }
    }

    /// Which image the high ROM half (C000-FBFF, FF40-FFFF) selects.
    fn high_rom(&self, address: u16) -> u8 {
        match (self.rom_config >> 2) & 0b11 {
            0 => self.kernal_rom[(address - 0xC000) as usize],
            _ => OPEN_BUS,
        }
    }
}

impl AddressSpace for TedMemory {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            // I/O and the TED registers: never banked away.
            0xFD00..=0xFF3F => self.io[(address - 0xFD00) as usize],
            // The FC00 page stays KERNAL no matter the configuration, so
            // the interrupt trampolines survive a full RAM bank-in.
            0xFC00..=0xFCFF => self.kernal_rom[(address - 0xC000) as usize],
            0x8000..=0xBFFF if self.rom_enabled => self.low_rom(address),
            0xC000..=0xFBFF if self.rom_enabled => self.high_rom(address),
            0xFF40..=0xFFFF if self.rom_enabled => self.high_rom(address),
            _ => self.ram[address as usize & self.mask],
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0xFF3E => self.rom_enabled = true,
            0xFF3F => self.rom_enabled = false,
            // The configuration register is written by address: the low
            // four bits of the location, not the value, select the images.
            0xFDD0..=0xFDDF => self.rom_config = (address & 0x0F) as u8,
            0xFD00..=0xFF3F => self.io[(address - 0xFD00) as usize] = value,
            _ => self.ram[address as usize & self.mask] = value,
        }
    }
}

pub struct Ted {
    pub cpu: Cpu6502,
    pub mem: Rc<RefCell<TedMemory>>,
    pub hooks: KernalHooks,
}

impl Ted {
    pub fn new(config: &MachineConfig, console: SharedConsole) -> Result<Ted, EmuError> {
        let ram_kb = config.ram_kb_or(SystemKind::Ted);
        if !VALID_RAM_KB.contains(&ram_kb) {
            return Err(EmuError::Config(format!(
                "c16/plus4 RAM must be one of 16, 32 or 64K, not {}K",
                ram_kb
            )));
        }
        let images = TedImages::load(config)?;
        Ok(Ted::with_images(
            images,
            ram_kb,
            config.startup_program.clone(),
            console,
        ))
    }

    pub fn with_images(
        images: TedImages,
        ram_kb: u32,
        startup_program: Option<std::path::PathBuf>,
        console: SharedConsole,
    ) -> Ted {
        let mem = Rc::new(RefCell::new(TedMemory::new(images, ram_kb)));
        let shared: SharedAddressSpace = mem.clone();
        let cpu = Cpu6502::new(shared);
        let hooks = KernalHooks::new(kernal_map(), console, startup_program);
        Ted { cpu, mem, hooks }
    }

    pub fn run(&mut self) -> Result<ExitRequest, EmuError> {
        self.cpu.run(&mut self.hooks)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_memory(ram_kb: u32) -> TedMemory {
        let images = TedImages {
            basic: vec![0x44; 0x4000],
            kernal: vec![0x55; 0x4000],
        };
        TedMemory::new(images, ram_kb)
    }

    #[test]
    fn ff3f_banks_the_roms_out_and_ff3e_restores_them() {
        let mut mem = test_memory(64);
        mem.write(0xC000, 0x99); // lands in the RAM underneath
        assert_eq!(mem.read(0xC000), 0x55, "KERNAL visible");

        mem.write(0xFF3F, 0x00);
        assert_eq!(mem.read(0xC000), 0x99, "RAM exposed");
        assert_eq!(mem.read(0x8000), 0x00, "BASIC half is RAM too");

        mem.write(0xFF3E, 0x00);
        assert_eq!(mem.read(0xC000), 0x55, "KERNAL back");
    }

    #[test]
    fn fdd1_selects_the_absent_function_rom() {
        let mut mem = test_memory(64);
        assert_eq!(mem.read(0x8000), 0x44, "BASIC selected at reset");
        mem.write(0xFDD1, 0x00);
        assert_eq!(mem.read(0x8000), 0xFF, "function slot is empty");
        mem.write(0xFDD0, 0x00);
        assert_eq!(mem.read(0x8000), 0x44, "BASIC again");
    }

    #[test]
    fn high_half_configuration_is_independent_of_the_low_half() {
        let mut mem = test_memory(64);
        // Address FDD4: low half BASIC, high half function (absent).
        mem.write(0xFDD4, 0x00);
        assert_eq!(mem.read(0x8000), 0x44);
        assert_eq!(mem.read(0xC000), 0xFF);
        assert_eq!(mem.read(0xFC00), 0x55, "the FC00 page never banks");
    }

    #[test]
    fn small_ram_mirrors_by_masking() {
        let mut mem = test_memory(16);
        mem.write(0x0123, 0x07);
        assert_eq!(mem.read(0x4123), 0x07);
        mem.write(0xFF3F, 0x00); // expose RAM so the upper mirrors show
        assert_eq!(mem.read(0x8123), 0x07);

        let mut mem = test_memory(32);
        mem.write(0x0123, 0x09);
        assert_eq!(mem.read(0x0123), 0x09);
        assert_eq!(mem.read(0x4123), 0x00, "32K does not fold at 16K");
    }

    #[test]
    fn io_page_is_never_banked() {
        let mut mem = test_memory(64);
        mem.write(0xFD10, 0xAB);
        mem.write(0xFF3F, 0x00); // ROMs out
        assert_eq!(mem.read(0xFD10), 0xAB);
    }
}
