use std::path::{Path, PathBuf};

use crate::console::SharedConsole;
use crate::cpu_6502::{Cpu6502, HookEvent, PreInstructionHook, StatusFlag};
use crate::errors::EmuError;
use crate::machines::{ExitRequest, SystemKind};
use crate::prg::{error_code, resolve_program, Prg};

/// The per-machine trap table. The KERNAL jump-table entries are the same
/// addresses on every machine that has them; the BASIC-side entries differ
/// per ROM revision and are supplied by each machine model.
pub struct KernalMap {
    pub chrout: u16,
    pub chrin: u16,
    pub getin: u16,
    pub stop: u16,
    /// Machines whose ROM ABI lacks the standard file-setup entries (the
    /// PET) leave these unset and lose only the user-typed LOAD/SAVE path.
    pub setlfs: Option<u16>,
    pub setnam: Option<u16>,
    pub load: Option<u16>,
    pub save: Option<u16>,
    /// BASIC's idle entry. The auto-load state machine keys off it.
    pub ready: u16,
    /// The direct-mode loop just past the READY banner.
    pub main_loop: u16,
    /// ROM routine that rebuilds the BASIC line links after a load.
    pub link_program: u16,
    /// ROM CLR entry that resets the variable and string pointers.
    pub clear_vars: u16,
    /// Entry of the GO statement handler, where the ROM has one.
    pub go_exec: Option<u16>,
    /// Zero-page pointer to the start of BASIC text.
    pub basic_start: u8,
    /// Zero-page pointer to the start of variables (end of program).
    pub variables_start: u8,
    /// Zero-page scratch pointer the relink routine leaves at the final
    /// line link; the program ends two bytes past it.
    pub link_end: u8,
    /// Zero-page BASIC text pointer, used by the GO sniffer.
    pub text_pointer: u8,
    /// RAM location of the current character color, where the machine keeps
    /// one; CHROUT refreshes the console foreground from it.
    pub foreground_color: Option<u16>,
}

/// The state SETLFS/SETNAM/LOAD accumulate across calls, mirroring the
/// KERNAL's own file-control locations.
#[derive(Default)]
pub struct FileControl {
    pub logical: u8,
    pub device: u8,
    pub secondary: u8,
    pub name: Vec<u8>,
    pub address: u16,
    pub verify: bool,
}

struct LoadOutcome {
    end: u16,
    /// A load into BASIC text needs the line links rebuilt; an absolute
    /// load or a verify pass does not.
    relink: bool,
}

/// The shared KERNAL trap engine. It inspects PC before every instruction
/// and either lets the ROM run, augments it (CHROUT), or replaces a routine
/// wholesale and synthesizes the RTS the ROM would have executed.
pub struct KernalHooks {
    pub map: KernalMap,
    pub console: SharedConsole,
    pub file: FileControl,
    /// Program to feed through the auto-load sequence at the first READY.
    startup_program: Option<PathBuf>,
    /// Sequencer for the three READY-prompt steps of a load.
    startup_state: u8,
    /// Where a trapped LOAD call should resume if the deferred file read
    /// fails; the firmware prints its own error from there.
    load_trap: Option<u16>,
    /// Only startup programs get an injected RUN.
    run_after_load: bool,
}

impl KernalHooks {
    pub fn new(
        map: KernalMap,
        console: SharedConsole,
        startup_program: Option<PathBuf>,
    ) -> KernalHooks {
        KernalHooks {
            map,
            console,
            file: FileControl::default(),
            startup_program,
            startup_state: 0,
            load_trap: None,
            run_after_load: false,
        }
    }

    fn dispatch(&mut self, cpu: &mut Cpu6502) -> Result<HookEvent, EmuError> {
        let pc = cpu.pc;

        if pc == self.map.chrout {
            if let Some(color_address) = self.map.foreground_color {
                let color = cpu.read_u8(color_address) & 0x0F;
                self.console.borrow_mut().set_foreground(color);
            }
            // Emit the character, then let the ROM run anyway so screen
            // memory stays in sync with what the user sees.
            self.console.borrow_mut().write_char(cpu.a);
            return Ok(HookEvent::NotHandled);
        }

        if pc == self.map.chrin {
            let value = self.console.borrow_mut().read_char();
            cpu.a = value;
            cpu.update_zero_and_negative_flag(value);
            cpu.set_status_flag(StatusFlag::Carry, false);
            cpu.simulate_rts();
            return Ok(HookEvent::Handled);
        }

        if pc == self.map.getin {
            let value = self.console.borrow_mut().get_in();
            cpu.a = value;
            if value != 0 {
                // The ROM routine clobbers X with the fetched byte; programs
                // depend on it.
                cpu.x = value;
            }
            cpu.update_zero_and_negative_flag(value);
            cpu.set_status_flag(StatusFlag::Carry, false);
            cpu.simulate_rts();
            return Ok(HookEvent::Handled);
        }

        if pc == self.map.stop {
            let stop = self.console.borrow_mut().check_stop();
            cpu.set_status_flag(StatusFlag::Zero, stop);
            cpu.simulate_rts();
            return Ok(HookEvent::Handled);
        }

        if Some(pc) == self.map.setlfs {
            self.file.logical = cpu.a;
            self.file.device = cpu.x;
            self.file.secondary = cpu.y;
            // The ROM body is harmless; let it record its own copy.
            return Ok(HookEvent::NotHandled);
        }

        if Some(pc) == self.map.setnam {
            let length = cpu.a as u16;
            let address = u16::from_le_bytes([cpu.x, cpu.y]);
            self.file.name = (0..length)
                .map(|offset| cpu.read_u8(address.wrapping_add(offset)))
                .collect();
            return Ok(HookEvent::NotHandled);
        }

        if Some(pc) == self.map.load {
            return Ok(self.trap_load(cpu));
        }

        if Some(pc) == self.map.save {
            return Ok(self.trap_save(cpu));
        }

        if pc == self.map.ready {
            return Ok(self.ready_trap(cpu));
        }

        if Some(pc) == self.map.go_exec {
            return Ok(self.go_sniffer(cpu));
        }

        Ok(HookEvent::NotHandled)
    }

    /// KERNAL LOAD. The register protocol is captured here, but the actual
    /// file read is deferred to the READY trap: BASIC's LOAD statement gets
    /// an optimistic success, falls through to READY, and the data arrives
    /// before it can matter. Only a failure rewinds to the recorded
    /// continuation so the firmware reports it.
    fn trap_load(&mut self, cpu: &mut Cpu6502) -> HookEvent {
        if cpu.a > 1 {
            cpu.a = error_code::ILLEGAL_QUANTITY;
            cpu.set_status_flag(StatusFlag::Carry, true);
            cpu.simulate_rts();
            return HookEvent::Handled;
        }
        self.file.verify = cpu.a == 1;
        self.file.address = u16::from_le_bytes([cpu.x, cpu.y]);
        cpu.set_status_flag(StatusFlag::Carry, false);
        cpu.simulate_rts();
        self.load_trap = Some(cpu.pc);
        HookEvent::Handled
    }

    /// KERNAL SAVE: A names the zero-page pointer to the start address, X/Y
    /// hold the end. The byte range is read back through the address space
    /// so banking is honored, and lands in a PRG in the working directory.
    fn trap_save(&mut self, cpu: &mut Cpu6502) -> HookEvent {
        let start = cpu.read_u16(cpu.a as u16);
        let end = u16::from_le_bytes([cpu.x, cpu.y]);
        let success = match self.save_file_name() {
            Some(path) if end >= start => {
                let bytes: Vec<u8> = (start..end).map(|address| cpu.read_u8(address)).collect();
                Prg::write(&path, start, &bytes).is_ok()
            }
            _ => false,
        };
        if !success {
            cpu.a = error_code::GENERIC;
        }
        cpu.set_status_flag(StatusFlag::Carry, !success);
        cpu.simulate_rts();
        HookEvent::Handled
    }

    fn save_file_name(&self) -> Option<PathBuf> {
        if self.file.name.is_empty() {
            return None;
        }
        let name: String = self.file.name.iter().map(|&b| b as char).collect();
        if name.contains('.') {
            Some(PathBuf::from(name))
        } else {
            Some(PathBuf::from(format!("{}.prg", name)))
        }
    }

    /// The three-step auto-load sequence, shared between a configured
    /// startup program and a trapped user LOAD. Each step runs at a READY
    /// entry and hands control back to the ROM in between, so the relink
    /// and CLR routines are the real firmware ones.
    fn ready_trap(&mut self, cpu: &mut Cpu6502) -> HookEvent {
        match self.startup_state {
            0 => {
                if let Some(continue_at) = self.load_trap.take() {
                    let name: String = self.file.name.iter().map(|&b| b as char).collect();
                    match self.perform_load(cpu, &name) {
                        Ok(outcome) => self.finish_load(cpu, outcome),
                        Err(code) => {
                            cpu.a = code;
                            cpu.set_status_flag(StatusFlag::Carry, true);
                            cpu.pc = continue_at;
                        }
                    }
                    HookEvent::Handled
                } else if let Some(path) = self.startup_program.take() {
                    self.file.secondary = 0;
                    self.file.verify = false;
                    match self.load_prg(cpu, &path) {
                        Ok(outcome) => {
                            self.run_after_load = true;
                            self.finish_load(cpu, outcome);
                        }
                        Err(code) => self.report_startup_failure(code),
                    }
                    HookEvent::Handled
                } else {
                    HookEvent::NotHandled
                }
            }
            1 => {
                // The relink pass left its pointer at the last line link;
                // the program text ends two bytes past it. That becomes the
                // start of variables.
                let end = cpu.read_u16(self.map.link_end as u16).wrapping_add(2);
                cpu.write_u16(self.map.variables_start as u16, end);
                cpu.a = 0;
                cpu.simulate_jsr(self.map.clear_vars, self.map.ready);
                self.startup_state = 2;
                HookEvent::Handled
            }
            _ => {
                if self.run_after_load {
                    self.console.borrow_mut().push_input(b"RUN\r");
                    self.run_after_load = false;
                }
                cpu.pc = self.map.main_loop;
                self.startup_state = 0;
                HookEvent::Handled
            }
        }
    }

    /// Success half of a completed load: report the end address the way the
    /// ROM would, and schedule the relink pass for BASIC loads.
    fn finish_load(&mut self, cpu: &mut Cpu6502, outcome: LoadOutcome) {
        cpu.set_status_flag(StatusFlag::Carry, false);
        let [lo, hi] = outcome.end.to_le_bytes();
        cpu.x = lo;
        cpu.y = hi;
        if outcome.relink {
            cpu.simulate_jsr(self.map.link_program, self.map.ready);
            self.startup_state = 1;
        }
    }

    fn perform_load(&mut self, cpu: &mut Cpu6502, name: &str) -> Result<LoadOutcome, u8> {
        if name.is_empty() {
            return Err(error_code::FILE_NOT_FOUND);
        }
        let path = resolve_program(name)
            .or_else(|| resolve_program(&name.to_lowercase()))
            .ok_or(error_code::FILE_NOT_FOUND)?;
        self.load_prg(cpu, &path)
    }

    fn load_prg(&mut self, cpu: &mut Cpu6502, path: &Path) -> Result<LoadOutcome, u8> {
        let prg = Prg::read(path).map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => error_code::FILE_NOT_FOUND,
            _ => error_code::GENERIC,
        })?;
        // Secondary address 0 is a "relative" load into BASIC text; anything
        // else honors the address in the file header.
        let destination = if self.file.secondary == 0 {
            cpu.read_u16(self.map.basic_start as u16)
        } else {
            prg.load_address
        };
        let end = destination.wrapping_add(prg.data.len() as u16);

        if self.file.verify {
            for (offset, &byte) in prg.data.iter().enumerate() {
                if cpu.read_u8(destination.wrapping_add(offset as u16)) != byte {
                    return Err(error_code::VERIFY);
                }
            }
            return Ok(LoadOutcome { end, relink: false });
        }

        // Stream through the normal write path so banked RAM receives the
        // bytes wherever the current configuration puts them.
        for (offset, &byte) in prg.data.iter().enumerate() {
            cpu.write_u8(destination.wrapping_add(offset as u16), byte);
        }

        let relink = self.file.secondary == 0;
        if relink {
            cpu.write_u16(self.map.variables_start as u16, end);
        }
        Ok(LoadOutcome { end, relink })
    }

    /// A startup program has no firmware call to resume, so the failure is
    /// printed directly, in the voice BASIC would use.
    fn report_startup_failure(&mut self, code: u8) {
        let text = match code {
            error_code::FILE_NOT_FOUND => "?FILE NOT FOUND  ERROR\r",
            error_code::VERIFY => "?VERIFY  ERROR\r",
            _ => "?LOAD  ERROR\r",
        };
        let mut console = self.console.borrow_mut();
        for byte in text.bytes() {
            console.write_char(byte);
        }
    }

    /// Runs at the ROM's GO statement handler. A numeric argument naming
    /// another machine exits the run loop with a switch request; anything
    /// else falls through and earns the ROM's own syntax error.
    fn go_sniffer(&mut self, cpu: &mut Cpu6502) -> HookEvent {
        let mut address = cpu.read_u16(self.map.text_pointer as u16);
        loop {
            let byte = cpu.read_u8(address);
            if byte != b' ' {
                break;
            }
            address = address.wrapping_add(1);
        }

        let mut number: u32 = 0;
        let mut any_digits = false;
        loop {
            let byte = cpu.read_u8(address);
            if !byte.is_ascii_digit() {
                break;
            }
            number = number * 10 + (byte - b'0') as u32;
            any_digits = true;
            address = address.wrapping_add(1);
            if number > 9999 {
                return HookEvent::NotHandled;
            }
        }

        if !any_digits {
            return HookEvent::NotHandled;
        }
        match SystemKind::from_go_number(number as u16) {
            Some(kind) => HookEvent::Exit(ExitRequest::Switch(kind)),
            None => HookEvent::NotHandled,
        }
    }
}

impl PreInstructionHook for KernalHooks {
    fn pre_instruction(&mut self, cpu: &mut Cpu6502) -> Result<HookEvent, EmuError> {
        self.dispatch(cpu)
    }
}
