use std::cell::RefCell;
use std::rc::Rc;

use crate::console::SharedConsole;
use crate::cpu_6502::Cpu6502;
use crate::errors::EmuError;
use crate::hooks::{KernalHooks, KernalMap};
use crate::machines::{ExitRequest, MachineConfig, SystemKind};
use crate::mem::{load_rom, AddressSpace, SharedAddressSpace, OPEN_BUS};

// BASIC v2 again, assembled 0x2000 higher than on the C64.
const READY: u16 = 0xC474;
const MAIN_LOOP: u16 = 0xC480;
const LINK_PROGRAM: u16 = 0xC533;
const CLEAR_VARS: u16 = 0xC65E;
const GO_EXEC: u16 = 0xC8F8;
const BASIC_START: u8 = 0x2B;
const VARIABLES_START: u8 = 0x2D;
const LINK_END: u8 = 0x22;
const TEXT_POINTER: u8 = 0x7A;
/// RAM 199: the color the screen editor is currently printing with.
const CURRENT_COLOR: u16 = 0x00C7;

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

pub struct Vic20Images {
    pub chargen: Vec<u8>,
    pub basic: Vec<u8>,
    pub kernal: Vec<u8>,
}

impl Vic20Images {
    pub fn load(config: &MachineConfig) -> Result<Vic20Images, EmuError> {
        let kind = SystemKind::Vic20;
        Ok(Vic20Images {
            chargen: load_rom(&config.rom_path(kind, "chargen"), 0x1000)?,
            basic: load_rom(&config.rom_path(kind, "basic"), 0x2000)?,
            kernal: load_rom(&config.rom_path(kind, "kernal"), 0x2000)?,
        })
    }
}

/// Which expansion banks a given RAM size populates: the 3K block at 0400,
/// the three 8K blocks at 2000/4000/6000, and the 8K block at A000. The 1K
/// low block and the 4K block at 1000 are always present.
fn banks_for_kb(ram_kb: u32) -> Option<[bool; 5]> {
    match ram_kb {
        5 => Some([false, false, false, false, false]),
        8 => Some([true, false, false, false, false]),
        13 => Some([false, true, false, false, false]),
        16 => Some([true, true, false, false, false]),
        21 => Some([false, true, true, false, false]),
        24 => Some([true, true, true, false, false]),
        29 => Some([false, true, true, true, false]),
        32 => Some([true, true, true, true, false]),
        37 => Some([false, true, true, true, true]),
        40 => Some([true, true, true, true, true]),
        _ => None,
    }
}

/// The VIC-20 address space. RAM presence is patchwork: which regions
/// respond depends on the expansion configuration, and everything missing
/// reads as open bus. The VIC chip's registers at 9000 are shadowed, with
/// the two writes the console cares about forwarded.
pub struct Vic20Memory {
    ram: Vec<u8>,
    banks: [bool; 5],
    char_rom: Vec<u8>,
    basic_rom: Vec<u8>,
    kernal_rom: Vec<u8>,
    io: Vec<u8>,
    console: SharedConsole,
}

impl Vic20Memory {
    pub fn new(images: Vic20Images, ram_kb: u32, console: SharedConsole) -> Vic20Memory {
        assert_eq!(images.chargen.len(), 0x1000);
        assert_eq!(images.basic.len(), 0x2000);
        assert_eq!(images.kernal.len(), 0x2000);
        let banks = banks_for_kb(ram_kb).expect("validated by the machine constructor");
        Vic20Memory {
            ram: vec![0; 0x1_0000],
            banks,
            char_rom: images.chargen,
            basic_rom: images.basic,
            kernal_rom: images.kernal,
            io: vec![0; 0x1000],
            console,
        }
    }

    fn ram_present(&self, address: u16) -> bool {
        match address {
            0x0000..=0x03FF => true,
            0x0400..=0x0FFF => self.banks[0],
            0x1000..=0x1FFF => true,
            0x2000..=0x3FFF => self.banks[1],
            0x4000..=0x5FFF => self.banks[2],
            0x6000..=0x7FFF => self.banks[3],
            0xA000..=0xBFFF => self.banks[4],
            _ => false,
        }
    }

    pub fn ram(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }
}

impl AddressSpace for Vic20Memory {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            0x8000..=0x8FFF => self.char_rom[(address - 0x8000) as usize],
            0x9000..=0x9FFF => self.io[(address - 0x9000) as usize],
            0xC000..=0xDFFF => self.basic_rom[(address - 0xC000) as usize],
            0xE000..=0xFFFF => self.kernal_rom[(address - 0xE000) as usize],
            _ if self.ram_present(address) => self.ram[address as usize],
            _ => OPEN_BUS,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x9000..=0x9FFF => {
                let index = (address - 0x9000) as usize;
                self.io[index] = value;
                match address {
                    // The combined screen/border color register: the upper
                    // nybble is the background; the character color comes
                    // from the editor's current-color byte.
                    0x900F => {
                        let mut console = self.console.borrow_mut();
                        console.set_background(value >> 4);
                        console.set_foreground(self.ram[CURRENT_COLOR as usize] & 0x0F);
                    }
                    // Character map base: bit 1 picks the lowercase set.
                    0x9005 => {
                        self.console.borrow_mut().set_lowercase(value & 0x02 != 0);
                    }
                    _ => {}
                }
            }
            _ if self.ram_present(address) => self.ram[address as usize] = value,
            _ => {}
        }
    }
}

const VALID_RAM_KB: [u32; 10] = [5, 8, 13, 16, 21, 24, 29, 32, 37, 40];

pub struct Vic20 {
    pub cpu: Cpu6502,
    pub mem: Rc<RefCell<Vic20Memory>>,
    pub hooks: KernalHooks,
}

impl Vic20 {
    pub fn new(config: &MachineConfig, console: SharedConsole) -> Result<Vic20, EmuError> {
        let ram_kb = config.ram_kb_or(SystemKind::Vic20);
        if banks_for_kb(ram_kb).is_none() {
            return Err(EmuError::Config(format!(
                "vic-20 RAM must be one of {:?}K, not {}K",
                VALID_RAM_KB, ram_kb
            )));
        }
        let images = Vic20Images::load(config)?;
        Ok(Vic20::with_images(
            images,
            ram_kb,
            config.startup_program.clone(),
            console,
        ))
    }

    pub fn with_images(
        images: Vic20Images,
        ram_kb: u32,
        startup_program: Option<std::path::PathBuf>,
        console: SharedConsole,
    ) -> Vic20 {
        let mem = Rc::new(RefCell::new(Vic20Memory::new(
            images,
            ram_kb,
            console.clone(),
        )));
        let shared: SharedAddressSpace = mem.clone();
        let cpu = Cpu6502::new(shared);
        let hooks = KernalHooks::new(kernal_map(), console, startup_program);
        Vic20 { cpu, mem, hooks }
    }

    pub fn run(&mut self) -> Result<ExitRequest, EmuError> {
        self.cpu.run(&mut self.hooks)
    }
}
