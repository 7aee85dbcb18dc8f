use std::cell::RefCell;
use std::rc::Rc;

use crate::console::SharedConsole;
use crate::cpu_6502::Cpu6502;
use crate::errors::EmuError;
use crate::hooks::{KernalHooks, KernalMap};
use crate::machines::{ExitRequest, MachineConfig, SystemKind};
use crate::mem::{load_rom, AddressSpace, SharedAddressSpace};

// BASIC v2 and KERNAL entry points and the zero-page protocol around them.
const READY: u16 = 0xA474;
const MAIN_LOOP: u16 = 0xA480;
const LINK_PROGRAM: u16 = 0xA533;
const CLEAR_VARS: u16 = 0xA65E;
const GO_EXEC: u16 = 0xA8F8;
const BASIC_START: u8 = 0x2B;
const VARIABLES_START: u8 = 0x2D;
const LINK_END: u8 = 0x22;
const TEXT_POINTER: u8 = 0x7A;
/// RAM 646: the color code CHROUT prints with.
const CURRENT_COLOR: u16 = 0x0286;

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
        go_exec: Some(GO_EXEC),
        basic_start: BASIC_START,
        variables_start: VARIABLES_START,
        link_end: LINK_END,
        text_pointer: TEXT_POINTER,
        foreground_color: Some(CURRENT_COLOR),
    }
}

/// The three firmware images a C64 boots from.
pub struct C64Images {
    pub basic: Vec<u8>,
    pub kernal: Vec<u8>,
    pub chargen: Vec<u8>,
}

impl C64Images {
    pub fn load(config: &MachineConfig) -> Result<C64Images, EmuError> {
        let kind = SystemKind::C64;
        Ok(C64Images {
            basic: load_rom(&config.rom_path(kind, "basic"), 0x2000)?,
            kernal: load_rom(&config.rom_path(kind, "kernal"), 0x2000)?,
            chargen: load_rom(&config.rom_path(kind, "chargen"), 0x1000)?,
        })
    }
}

/// What the D000 page currently decodes to.
enum DRegion {
    Ram,
    Io,
    CharRom,
}

/// The C64 address space: 64 KiB of RAM with BASIC, KERNAL, character ROM
/// and the I/O page banked over it by the 6510's on-chip port at $01.
/// Writes always land in RAM (or I/O when it is mapped); only reads consult
/// the ROM overlays. That is exactly the real machine's RAM-under-ROM
/// behavior.
pub struct C64Memory {
    ram: Vec<u8>,
    basic_rom: Vec<u8>,
    kernal_rom: Vec<u8>,
    char_rom: Vec<u8>,
    io: Vec<u8>,
    /// $00, the data direction register. Stored, not interpreted: the text
    /// machine has no users of the tape lines.
    ddr: u8,
    /// $01, the banking port. Bits 0/1/2 are LORAM/HIRAM/CHAREN.
    port: u8,
    console: SharedConsole,
}

impl C64Memory {
    pub fn new(images: C64Images, console: SharedConsole) -> C64Memory {
        assert_eq!(images.basic.len(), 0x2000);
        assert_eq!(images.kernal.len(), 0x2000);
        assert_eq!(images.chargen.len(), 0x1000);
        C64Memory {
            ram: vec![0; 0x1_0000],
            basic_rom: images.basic,
            kernal_rom: images.kernal,
            char_rom: images.chargen,
            io: vec![0; 0x1000],
            ddr: 0x2F,
            port: 0x37,
            console,
        }
    }

    fn basic_visible(&self) -> bool {
        self.port & 0b11 == 0b11
    }

    fn kernal_visible(&self) -> bool {
        self.port & 0b10 != 0
    }

    fn d_region(&self) -> DRegion {
        if self.port & 0b11 == 0 {
            DRegion::Ram
        } else if self.port & 0b100 != 0 {
            DRegion::Io
        } else {
            DRegion::CharRom
        }
    }

    /// Direct RAM access that bypasses the overlays, for the hook layer.
    pub fn ram(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }
}

impl AddressSpace for C64Memory {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            0x0000 => self.ddr,
            0x0001 => self.port,
            0xA000..=0xBFFF if self.basic_visible() => {
                self.basic_rom[(address - 0xA000) as usize]
            }
            0xD000..=0xDFFF => match self.d_region() {
                DRegion::Ram => self.ram[address as usize],
                DRegion::CharRom => self.char_rom[(address - 0xD000) as usize],
                DRegion::Io => {
                    let value = self.io[(address - 0xD000) as usize];
                    if (0xD800..=0xDBFF).contains(&address) {
                        // Color RAM is four bits wide; the top nybble floats.
                        value | 0xF0
                    } else {
                        value
                    }
                }
            },
            0xE000..=0xFFFF if self.kernal_visible() => {
                self.kernal_rom[(address - 0xE000) as usize]
            }
            _ => self.ram[address as usize],
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000 => self.ddr = value,
            0x0001 => self.port = value,
            0xD000..=0xDFFF => match self.d_region() {
                DRegion::Io => {
                    let index = (address - 0xD000) as usize;
                    match address {
                        0xD021 => {
                            // Background register: low nybble only, pushed
                            // straight to the console.
                            self.io[index] = value & 0x0F;
                            self.console.borrow_mut().set_background(value & 0x0F);
                        }
                        0xD018 => {
                            // Charset base: bit 1 selects the lowercase set.
                            self.io[index] = value;
                            self.console.borrow_mut().set_lowercase(value & 0x02 != 0);
                        }
                        0xD800..=0xDBFF => self.io[index] = value & 0x0F,
                        _ => self.io[index] = value,
                    }
                }
                // With I/O banked away the page is ordinary RAM.
                _ => self.ram[address as usize] = value,
            },
            _ => self.ram[address as usize] = value,
        }
    }
}

pub struct C64 {
    pub cpu: Cpu6502,
    pub mem: Rc<RefCell<C64Memory>>,
    pub hooks: KernalHooks,
}

impl C64 {
    pub fn new(config: &MachineConfig, console: SharedConsole) -> Result<C64, EmuError> {
        let ram_kb = config.ram_kb_or(SystemKind::C64);
        if ram_kb != 64 {
            return Err(EmuError::Config(format!(
                "the c64 shipped with 64K, not {}K",
                ram_kb
            )));
        }
        let images = C64Images::load(config)?;
        Ok(C64::with_images(
            images,
            config.startup_program.clone(),
            console,
        ))
    }

    pub fn with_images(
        images: C64Images,
        startup_program: Option<std::path::PathBuf>,
        console: SharedConsole,
    ) -> C64 {
        let mem = Rc::new(RefCell::new(C64Memory::new(images, console.clone())));
        let shared: SharedAddressSpace = mem.clone();
        let cpu = Cpu6502::new(shared);
        let hooks = KernalHooks::new(kernal_map(), console, startup_program);
        C64 { cpu, mem, hooks }
    }

    pub fn run(&mut self) -> Result<ExitRequest, EmuError> {
        self.cpu.run(&mut self.hooks)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::console::BufferConsole;

    fn test_images() -> C64Images {
        C64Images {
            basic: vec![0x11; 0x2000],
            kernal: vec![0x22; 0x2000],
            chargen: vec![0x33; 0x1000],
        }
    }

    fn test_memory() -> C64Memory {
        C64Memory::new(test_images(), BufferConsole::new_shared())
    }

    #[test]
    fn default_port_shows_basic_kernal_and_io() {
        let mut mem = test_memory();
        assert_eq!(mem.read(0x0001), 0x37);
        assert_eq!(mem.read(0xA000), 0x11, "BASIC");
        assert_eq!(mem.read(0xE000), 0x22, "KERNAL");
        assert_eq!(mem.read(0xD000), 0x00, "I/O shadow");
        assert_eq!(mem.read(0xC000), 0x00, "always RAM");
    }

    #[test]
    fn port_35_reveals_io_and_ram() {
        let mut mem = test_memory();
        mem.write(0x0001, 0x35);
        assert_eq!(mem.read(0xA000), 0x00, "BASIC banked out");
        assert_eq!(mem.read(0xE000), 0x00, "KERNAL banked out");
        mem.write(0xD400, 0x5A);
        assert_eq!(mem.read(0xD400), 0x5A, "I/O still mapped");
    }

    #[test]
    fn port_33_reveals_the_character_rom() {
        let mut mem = test_memory();
        mem.write(0x0001, 0x33);
        assert_eq!(mem.read(0xD000), 0x33);
    }

    #[test]
    fn port_30_exposes_full_ram_and_ram_survives_under_rom() {
        let mut mem = test_memory();
        // Writes land under the ROMs while they are still mapped in.
        mem.write(0xA123, 0x77);
        mem.write(0xE456, 0x88);
        assert_eq!(mem.read(0xA123), 0x11, "reads still see BASIC");

        mem.write(0x0001, 0x30);
        assert_eq!(mem.read(0xA123), 0x77);
        assert_eq!(mem.read(0xE456), 0x88);
        mem.write(0xD012, 0x99);
        assert_eq!(mem.read(0xD012), 0x99, "D000 page is RAM now");

        mem.write(0x0001, 0x37);
        assert_eq!(mem.read(0xA123), 0x11, "ROM is back");
    }

    #[test]
    fn color_ram_reads_back_with_the_top_nybble_floating() {
        let mut mem = test_memory();
        mem.write(0xD800, 0x07);
        assert_eq!(mem.read(0xD800), 0xF7);
    }

    #[test]
    fn background_register_pushes_color_to_the_console() {
        let console = BufferConsole::new_shared();
        let mut mem = C64Memory::new(test_images(), console.clone());
        mem.write(0xD021, 0xA6);
        assert_eq!(mem.read(0xD021), 0x06, "low nybble stored");
        assert_eq!(console.borrow().background, Some(0x06));
    }

    #[test]
    fn charset_register_toggles_lowercase() {
        let console = BufferConsole::new_shared();
        let mut mem = C64Memory::new(test_images(), console.clone());
        mem.write(0xD018, 0x17);
        assert!(console.borrow().lowercase);
        mem.write(0xD018, 0x15);
        assert!(!console.borrow().lowercase);
    }

    /// End-to-end through the run loop: a synthetic KERNAL prints "HI" via
    /// CHROUT (hook emits, ROM stub still runs), then jumps into the GO
    /// handler with "64" under the text pointer, which exits the loop.
    #[test]
    fn boot_print_and_go_64() {
        let mut images = test_images();
        let program: &[u8] = &[
            0xA9, b'H', // LDA #'H'
            0x20, 0xD2, 0xFF, // JSR $FFD2
            0xA9, b'I', // LDA #'I'
            0x20, 0xD2, 0xFF, // JSR $FFD2
            0xA9, 0x0D, // LDA #$0D
            0x20, 0xD2, 0xFF, // JSR $FFD2
            0x4C, 0xF8, 0xA8, // JMP $A8F8 (GO handler)
        ];
        for (offset, &byte) in program.iter().enumerate() {
            images.kernal[offset] = byte; // at $E000
        }
        images.kernal[0x1FD2] = 0x60; // RTS at $FFD2
        images.kernal[0x1FFC] = 0x00; // RESET vector -> $E000
        images.kernal[0x1FFD] = 0xE0;

        let console = BufferConsole::new_shared();
        let mut machine = C64::with_images(images, None, console.clone());
        machine.cpu.write_u16(TEXT_POINTER as u16, 0x0340);
        machine.cpu.write_u8(0x0340, b'6');
        machine.cpu.write_u8(0x0341, b'4');

        let exit = machine.run().unwrap();
        assert_eq!(exit, ExitRequest::Switch(SystemKind::C64));
        assert_eq!(console.borrow().output_string(), "HI\r");
    }
}
