use std::cell::RefCell;
use std::rc::Rc;

use crate::console::SharedConsole;
use crate::cpu_6502::Cpu6502;
use crate::errors::EmuError;
use crate::hooks::{KernalHooks, KernalMap};
use crate::machines::{ExitRequest, MachineConfig, SystemKind};
use crate::mem::{load_rom, AddressSpace, SharedAddressSpace, OPEN_BUS};

// Original-ROM (BASIC 1.0) entry points. This BASIC predates the layout
// the later machines share, so the zero-page pointers sit elsewhere.
const READY: u16 = 0xC38B;
const MAIN_LOOP: u16 = 0xC394;
const LINK_PROGRAM: u16 = 0xC430;
const CLEAR_VARS: u16 = 0xC577;
const BASIC_START: u8 = 0x7A;
const VARIABLES_START: u8 = 0x7C;
const LINK_END: u8 = 0x26;
const TEXT_POINTER: u8 = 0xC2;

fn kernal_map() -> KernalMap {
    KernalMap {
        chrout: 0xFFD2,
        chrin: 0xFFCF,
        getin: 0xFFE4,
        stop: 0xFFE1,
        // The original ROM has no SETLFS/SETNAM at the standard addresses;
        // only the startup auto-load path can name a file.
        setlfs: None,
        setnam: None,
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

pub struct PetImages {
    pub basic: Vec<u8>,
    pub edit: Vec<u8>,
    pub kernal: Vec<u8>,
}

impl PetImages {
    pub fn load(config: &MachineConfig) -> Result<PetImages, EmuError> {
        let kind = SystemKind::Pet;
        Ok(PetImages {
            basic: load_rom(&config.rom_path(kind, "basic"), 0x2000)?,
            edit: load_rom(&config.rom_path(kind, "edit"), 0x0800)?,
            kernal: load_rom(&config.rom_path(kind, "kernal"), 0x1000)?,
        })
    }
}

const VALID_RAM_KB: [u32; 4] = [4, 8, 16, 32];

/// The PET 2001 address space: the simplest of the family, with no banking
/// at all. RAM below its configured ceiling, the screen at 8000, three ROMs
/// high, an I/O shadow, and open bus in the gaps. The keyboard-row port at
/// E810 is pinned to FF so the ROM's scan loop sees no ghost keys.
pub struct PetMemory {
    ram: Vec<u8>,
    video: Vec<u8>,
    basic_rom: Vec<u8>,
    edit_rom: Vec<u8>,
    kernal_rom: Vec<u8>,
    io: Vec<u8>,
}

impl PetMemory {
    pub fn new(images: PetImages, ram_kb: u32) -> PetMemory {
        assert_eq!(images.basic.len(), 0x2000);
        assert_eq!(images.edit.len(), 0x0800);
        assert_eq!(images.kernal.len(), 0x1000);
        assert!(VALID_RAM_KB.contains(&ram_kb));
        PetMemory {
            ram: vec![0; ram_kb as usize * 1024],
            video: vec![0; 0x1000],
            basic_rom: images.basic,
            edit_rom: images.edit,
            kernal_rom: images.kernal,
            io: vec![0; 0x0800],
        }
    }
}

impl AddressSpace for PetMemory {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            0x8000..=0x8FFF => self.video[(address - 0x8000) as usize],
            0xC000..=0xDFFF => self.basic_rom[(address - 0xC000) as usize],
            0xE000..=0xE7FF => self.edit_rom[(address - 0xE000) as usize],
            // Keyboard row input: always "no key held".
            0xE810 => 0xFF,
            0xE800..=0xEFFF => self.io[(address - 0xE800) as usize],
            0xF000..=0xFFFF => self.kernal_rom[(address - 0xF000) as usize],
            _ => {
                let index = address as usize;
                if index < self.ram.len() {
                    self.ram[index]
                } else {
                    OPEN_BUS
                }
            }
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x8000..=0x8FFF => self.video[(address - 0x8000) as usize] = value,
            0xE800..=0xEFFF => self.io[(address - 0xE800) as usize] = value,
            0xC000..=0xDFFF | 0xE000..=0xE7FF | 0xF000..=0xFFFF => {}
            _ => {
                let index = address as usize;
                if index < self.ram.len() {
                    self.ram[index] = value;
                }
            }
        }
    }
}

pub struct Pet {
    pub cpu: Cpu6502,
    pub mem: Rc<RefCell<PetMemory>>,
    pub hooks: KernalHooks,
}

impl Pet {
    pub fn new(config: &MachineConfig, console: SharedConsole) -> Result<Pet, EmuError> {
        let ram_kb = config.ram_kb_or(SystemKind::Pet);
        if !VALID_RAM_KB.contains(&ram_kb) {
            return Err(EmuError::Config(format!(
                "pet RAM must be one of 4, 8, 16 or 32K, not {}K",
                ram_kb
            )));
        }
        let images = PetImages::load(config)?;
        Ok(Pet::with_images(
            images,
            ram_kb,
            config.startup_program.clone(),
            console,
        ))
    }

    pub fn with_images(
        images: PetImages,
        ram_kb: u32,
        startup_program: Option<std::path::PathBuf>,
        console: SharedConsole,
    ) -> Pet {
        let mem = Rc::new(RefCell::new(PetMemory::new(images, ram_kb)));
        let shared: SharedAddressSpace = mem.clone();
        let cpu = Cpu6502::new(shared);
        let hooks = KernalHooks::new(kernal_map(), console, startup_program);
        Pet { cpu, mem, hooks }
    }

    pub fn run(&mut self) -> Result<ExitRequest, EmuError> {
        self.cpu.run(&mut self.hooks)
    }
}
