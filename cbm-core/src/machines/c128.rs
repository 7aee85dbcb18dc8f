use std::cell::RefCell;
use std::rc::Rc;

use crate::console::SharedConsole;
use crate::cpu_6502::{Cpu6502, HookEvent, PreInstructionHook};
use crate::errors::EmuError;
use crate::hooks::{KernalHooks, KernalMap};
use crate::machines::{ExitRequest, MachineConfig, SystemKind};
use crate::mem::{load_rom, AddressSpace, SharedAddressSpace};

// BASIC 7.0 entry points and pointers. BASIC text lives in RAM bank 0 with
// its own pointer block low in the zero page.
const READY: u16 = 0x4D37;
const MAIN_LOOP: u16 = 0x4D46;
const LINK_PROGRAM: u16 = 0x4F4F;
const CLEAR_VARS: u16 = 0x51F8;
const BASIC_START: u8 = 0x2D;
const VARIABLES_START: u8 = 0x2F;
const LINK_END: u8 = 0x24;
const TEXT_POINTER: u8 = 0x3D;

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
        // GO 64 on this machine arrives through the MMU mode register, not
        // a BASIC text sniff.
        go_exec: None,
        basic_start: BASIC_START,
        variables_start: VARIABLES_START,
        link_end: LINK_END,
        text_pointer: TEXT_POINTER,
        foreground_color: None,
    }
}

pub struct C128Images {
    pub basic_lo: Vec<u8>,
    pub basic_hi: Vec<u8>,
    pub kernal: Vec<u8>,
    pub chargen: Vec<u8>,
}

impl C128Images {
    pub fn load(config: &MachineConfig) -> Result<C128Images, EmuError> {
        let kind = SystemKind::C128;
        Ok(C128Images {
            basic_lo: load_rom(&config.rom_path(kind, "basiclo"), 0x4000)?,
            basic_hi: load_rom(&config.rom_path(kind, "basichi"), 0x4000)?,
            kernal: load_rom(&config.rom_path(kind, "kernal"), 0x4000)?,
            chargen: load_rom(&config.rom_path(kind, "chargen"), 0x1000)?,
        })
    }
}

/// The C128 address space: 128 KiB of RAM in two banks under an MMU.
///
/// The configuration register (at D500 while I/O is visible, mirrored at
/// FF00 always) picks the active RAM bank and which of BASIC-LO, BASIC-HI,
/// KERNAL, I/O and CHARGEN overlay it. Four preload registers behind
/// FF01-FF04 swap whole configurations in one store. Pages 0 and 1 can be
/// relocated anywhere in either bank, and a common window at the bottom
/// and/or top of the address range can force bank 0 so the two banks share
/// system state.
pub struct C128Memory {
    ram: Vec<u8>,
    basic_lo: Vec<u8>,
    basic_hi: Vec<u8>,
    kernal_rom: Vec<u8>,
    char_rom: Vec<u8>,
    io: Vec<u8>,
    /// The configuration register, D500/FF00.
    cr: u8,
    /// The four load-configuration presets, D501-D504 / FF01-FF04.
    lcr: [u8; 4],
    /// D505. Bit 6 written high asks for C64 mode.
    mode_config: u8,
    /// D506: common-RAM size and placement.
    rcr: u8,
    /// D507-D50A: page 0 and page 1 relocation (page, then bank bit).
    p0l: u8,
    p0h: u8,
    p1l: u8,
    p1h: u8,
    c64_request: bool,
}

impl C128Memory {
    pub fn new(images: C128Images) -> C128Memory {
        assert_eq!(images.basic_lo.len(), 0x4000);
        assert_eq!(images.basic_hi.len(), 0x4000);
        assert_eq!(images.kernal.len(), 0x4000);
        assert_eq!(images.chargen.len(), 0x1000);
        C128Memory {
            ram: vec![0; 0x2_0000],
            basic_lo: images.basic_lo,
            basic_hi: images.basic_hi,
            kernal_rom: images.kernal,
            char_rom: images.chargen,
            io: vec![0; 0x1000],
            cr: 0x00,
            lcr: [0x00; 4],
            mode_config: 0x00,
            rcr: 0x00,
            p0l: 0x00,
            p0h: 0x00,
            p1l: 0x01,
            p1h: 0x00,
            c64_request: false,
        }
    }

    /// True once after firmware wrote bit 6 of the mode register.
    pub fn take_c64_mode_request(&mut self) -> bool {
        let requested = self.c64_request;
        self.c64_request = false;
        requested
    }

    fn io_visible(&self) -> bool {
        self.cr & 0x01 == 0
    }

    fn basic_lo_visible(&self) -> bool {
        self.cr & 0x02 == 0
    }

    fn basic_hi_visible(&self) -> bool {
        self.cr & 0x0C == 0
    }

    fn kernal_visible(&self) -> bool {
        self.cr & 0x30 == 0
    }

    /// Translate a CPU address to its spot in the 128 K array: active bank,
    /// page 0/1 relocation, then the common-RAM override.
    fn ram_index(&self, address: u16) -> usize {
        let mut bank = ((self.cr >> 6) & 0x01) as usize;
        let translated = match address >> 8 {
            0x00 => {
                bank = (self.p0h & 0x01) as usize;
                (self.p0l as u16) << 8 | (address & 0x00FF)
            }
            0x01 => {
                bank = (self.p1h & 0x01) as usize;
                (self.p1l as u16) << 8 | (address & 0x00FF)
            }
            _ => address,
        };

        let common = match self.rcr & 0x03 {
            0 => 0x0400,
            1 => 0x1000,
            2 => 0x2000,
            _ => 0x4000,
        };
        let shares_bottom = self.rcr & 0x04 != 0 && (translated as usize) < common;
        let shares_top = self.rcr & 0x08 != 0 && translated as usize >= 0x1_0000 - common;
        if shares_bottom || shares_top {
            bank = 0;
        }

        bank * 0x1_0000 + translated as usize
    }

    fn read_io(&mut self, address: u16) -> u8 {
        match address {
            // The raster register flips its high bit on every read so ROM
            // wait loops come back out.
            0xD011 => {
                self.io[0x11] ^= 0x80;
                self.io[0x11]
            }
            0xD500 => self.cr,
            0xD501..=0xD504 => self.lcr[(address - 0xD501) as usize],
            0xD505 => self.mode_config,
            0xD506 => self.rcr,
            0xD507 => self.p0l,
            0xD508 => self.p0h,
            0xD509 => self.p1l,
            0xD50A => self.p1h,
            // Version register: two RAM banks, revision 0.
            0xD50B => 0x20,
            _ => self.io[(address - 0xD000) as usize],
        }
    }

    fn write_io(&mut self, address: u16, value: u8) {
        match address {
            0xD500 => self.cr = value,
            0xD501..=0xD504 => self.lcr[(address - 0xD501) as usize] = value,
            0xD505 => {
                self.mode_config = value;
                if value & 0x40 != 0 {
                    self.c64_request = true;
                }
            }
            0xD506 => self.rcr = value,
            0xD507 => self.p0l = value,
            0xD508 => self.p0h = value,
            0xD509 => self.p1l = value,
            0xD50A => self.p1h = value,
            0xD50B => {}
            _ => self.io[(address - 0xD000) as usize] = value,
        }
    }
}

impl AddressSpace for C128Memory {
    fn read(&mut self, address: u16) -> u8 {
        // The MMU system registers never bank away.
        match address {
            0xFF00 => return self.cr,
            0xFF01..=0xFF04 => return self.lcr[(address - 0xFF01) as usize],
            _ => {}
        }
        match address {
            0x4000..=0x7FFF if self.basic_lo_visible() => {
                self.basic_lo[(address - 0x4000) as usize]
            }
            0x8000..=0xBFFF if self.basic_hi_visible() => {
                self.basic_hi[(address - 0x8000) as usize]
            }
            0xC000..=0xCFFF if self.kernal_visible() => {
                self.kernal_rom[(address - 0xC000) as usize]
            }
            0xE000..=0xFFFF if self.kernal_visible() => {
                self.kernal_rom[(address - 0xC000) as usize]
            }
            0xD000..=0xDFFF => {
                if self.io_visible() {
                    self.read_io(address)
                } else if self.kernal_visible() {
                    self.char_rom[(address - 0xD000) as usize]
                } else {
                    self.ram[self.ram_index(address)]
                }
            }
            _ => self.ram[self.ram_index(address)],
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0xFF00 => {
                self.cr = value;
                return;
            }
            // Storing anything at FF01-FF04 copies the matching preset
            // into the configuration register.
            0xFF01..=0xFF04 => {
                self.cr = self.lcr[(address - 0xFF01) as usize];
                return;
            }
            _ => {}
        }
        if (0xD000..=0xDFFF).contains(&address) && self.io_visible() {
            self.write_io(address, value);
        } else {
            let index = self.ram_index(address);
            self.ram[index] = value;
        }
    }
}

/// The C128's hook chain: the shared KERNAL traps, plus the MMU's
/// switch-to-C64 sentinel checked between instructions.
pub struct C128Hooks {
    pub kernal: KernalHooks,
    mem: Rc<RefCell<C128Memory>>,
}

impl PreInstructionHook for C128Hooks {
    fn pre_instruction(&mut self, cpu: &mut Cpu6502) -> Result<HookEvent, EmuError> {
        if self.mem.borrow_mut().take_c64_mode_request() {
            return Ok(HookEvent::Exit(ExitRequest::Switch(SystemKind::C64)));
        }
        self.kernal.pre_instruction(cpu)
    }
}

pub struct C128 {
    pub cpu: Cpu6502,
    pub mem: Rc<RefCell<C128Memory>>,
    pub hooks: C128Hooks,
}

impl C128 {
    pub fn new(config: &MachineConfig, console: SharedConsole) -> Result<C128, EmuError> {
        let ram_kb = config.ram_kb_or(SystemKind::C128);
        if ram_kb != 128 {
            return Err(EmuError::Config(format!(
                "the c128 shipped with 128K, not {}K",
                ram_kb
            )));
        }
        let images = C128Images::load(config)?;
        Ok(C128::with_images(
            images,
            config.startup_program.clone(),
            console,
        ))
    }

    pub fn with_images(
        images: C128Images,
        startup_program: Option<std::path::PathBuf>,
        console: SharedConsole,
    ) -> C128 {
        let mem = Rc::new(RefCell::new(C128Memory::new(images)));
        let shared: SharedAddressSpace = mem.clone();
        let cpu = Cpu6502::new(shared);
        let hooks = C128Hooks {
            kernal: KernalHooks::new(kernal_map(), console, startup_program),
            mem: mem.clone(),
        };
        C128 { cpu, mem, hooks }
    }

    pub fn run(&mut self) -> Result<ExitRequest, EmuError> {
        self.cpu.run(&mut self.hooks)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::console::BufferConsole;

    fn test_images() -> C128Images {
        C128Images {
            basic_lo: vec![0x4B; 0x4000],
            basic_hi: vec![0x8B; 0x4000],
            kernal: vec![0xCB; 0x4000],
            chargen: vec![0xDB; 0x1000],
        }
    }

    fn test_memory() -> C128Memory {
        C128Memory::new(test_images())
    }

    #[test]
    fn reset_configuration_shows_all_roms_and_io() {
        let mut mem = test_memory();
        assert_eq!(mem.read(0x4000), 0x4B, "basic lo");
        assert_eq!(mem.read(0x8000), 0x8B, "basic hi");
        assert_eq!(mem.read(0xC000), 0xCB, "editor/kernal");
        assert_eq!(mem.read(0xE000), 0xCB, "kernal high");
        assert_eq!(mem.read(0xD500), 0x00, "mmu through io");
    }

    #[test]
    fn cr_bits_bank_each_rom_away_independently() {
        let mut mem = test_memory();
        mem.write(0x5000, 0x77); // under BASIC-LO
        mem.write(0xFF00, 0x02);
        assert_eq!(mem.read(0x5000), 0x77, "basic lo replaced by ram");
        assert_eq!(mem.read(0x8000), 0x8B, "basic hi unaffected");

        mem.write(0xFF00, 0x0C);
        assert_eq!(mem.read(0x8000), 0x00, "basic hi gone");
        assert_eq!(mem.read(0x4000), 0x4B, "basic lo back");

        mem.write(0xFF00, 0x30);
        assert_eq!(mem.read(0xE000), 0x00, "kernal gone");
    }

    #[test]
    fn chargen_appears_when_io_is_off_and_kernal_on() {
        let mut mem = test_memory();
        mem.write(0xFF00, 0x01);
        assert_eq!(mem.read(0xD000), 0xDB);
        mem.write(0xFF00, 0x31);
        assert_eq!(mem.read(0xD000), 0x00, "all-ram configuration");
    }

    /// CR bit 6 swaps which 64 K bank the CPU sees.
    #[test]
    fn cr_bit_6_swaps_ram_banks() {
        let mut mem = test_memory();
        mem.write(0x2000, 0x11); // bank 0
        mem.write(0xFF00, 0x40);
        assert_eq!(mem.read(0x2000), 0x00, "bank 1 is fresh");
        mem.write(0x2000, 0x22);
        mem.write(0xFF00, 0x00);
        assert_eq!(mem.read(0x2000), 0x11, "bank 0 kept its byte");
        mem.write(0xFF00, 0x40);
        assert_eq!(mem.read(0x2000), 0x22);
    }

    #[test]
    fn page_1_relocation_moves_the_stack() {
        let mut mem = test_memory();
        mem.write(0xD509, 0x13); // P1L: stack now at page 0x13
        mem.write(0x01FF, 0xAB);
        assert_eq!(mem.read(0x13FF), 0xAB, "landed in the relocated page");
        mem.write(0xD509, 0x01);
        assert_eq!(mem.read(0x01FF), 0x00, "physical page 1 untouched");
    }

    #[test]
    fn page_0_relocation_moves_the_zero_page() {
        let mut mem = test_memory();
        mem.write(0xD507, 0x20);
        mem.write(0x0050, 0x66);
        assert_eq!(mem.read(0x2050), 0x66);
    }

    #[test]
    fn common_ram_window_pins_bank_0() {
        let mut mem = test_memory();
        mem.write(0xD506, 0x04); // bottom 1K common
        mem.write(0x0200, 0x5C); // inside the window, bank 0
        mem.write(0xFF00, 0x40); // switch to bank 1
        assert_eq!(mem.read(0x0200), 0x5C, "window reads through to bank 0");
        assert_eq!(mem.read(0x2000), 0x00, "outside the window is bank 1");
    }

    #[test]
    fn ff01_loads_the_preset_configuration() {
        let mut mem = test_memory();
        mem.write(0xD501, 0x41); // LCRA: bank 1, basic-lo off... etc
        mem.write(0xFF01, 0xFF); // value ignored; the preset is loaded
        assert_eq!(mem.read(0xFF00), 0x41);
    }

    #[test]
    fn d011_flips_bit_7_on_every_read() {
        let mut mem = test_memory();
        let first = mem.read(0xD011);
        let second = mem.read(0xD011);
        assert_ne!(first & 0x80, second & 0x80);
    }

    #[test]
    fn mode_register_bit_6_raises_the_c64_request() {
        let mut mem = test_memory();
        mem.write(0xD505, 0x40);
        assert!(mem.take_c64_mode_request());
        assert!(!mem.take_c64_mode_request(), "consumed");
    }

    /// Full loop: a synthetic KERNAL stores $40 into D505 and the hook
    /// chain turns it into a switch request.
    #[test]
    fn go_64_exits_the_run_loop() {
        let mut images = test_images();
        let program: &[u8] = &[
            0xA9, 0x40, // LDA #$40
            0x8D, 0x05, 0xD5, // STA $D505
            0x4C, 0x05, 0xE0, // JMP $E005 (never reached)
        ];
        for (offset, &byte) in program.iter().enumerate() {
            images.kernal[0x2000 + offset] = byte; // at $E000
        }
        images.kernal[0x3FFC] = 0x00; // RESET vector -> $E000
        images.kernal[0x3FFD] = 0xE0;

        let mut machine = C128::with_images(images, None, BufferConsole::new_shared());
        let exit = machine.run().unwrap();
        assert_eq!(exit, ExitRequest::Switch(SystemKind::C64));
    }
}
