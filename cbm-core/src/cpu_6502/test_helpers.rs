use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::InterruptVectors;
use crate::cpu_6502::Cpu6502;
use crate::mem::{AddressSpace, SharedAddressSpace};

/// A featureless 64 KiB RAM. The CPU contract tests run against this so that
/// no banking behavior can leak into them.
pub struct FlatRam {
    pub bytes: Vec<u8>,
}

impl FlatRam {
    pub fn new() -> FlatRam {
        FlatRam {
            bytes: vec![0; 0x1_0000],
        }
    }
}

impl AddressSpace for FlatRam {
    fn read(&mut self, address: u16) -> u8 {
        self.bytes[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.bytes[address as usize] = value;
    }
}

/// Place a program at `origin`, point the RESET vector at it, and hand back
/// a CPU ready to step.
pub fn cpu_with_program(program: &[u8], origin: u16) -> Cpu6502 {
    let ram = Rc::new(RefCell::new(FlatRam::new()));
    {
        let mut mem = ram.borrow_mut();
        for (index, &byte) in program.iter().enumerate() {
            mem.bytes[origin as usize + index] = byte;
        }
        mem.write_u16(InterruptVectors::ResetVector as u16, origin);
    }
    Cpu6502::new(ram as SharedAddressSpace)
}

/// Step a straight-line program until PC runs off its end. Panics rather
/// than hang if it never gets there.
pub fn run_to_end(cpu: &mut Cpu6502, origin: u16, length: usize) {
    let end = origin.wrapping_add(length as u16);
    let mut guard = 0;
    while cpu.pc != end {
        cpu.step().expect("program hit an undocumented opcode");
        guard += 1;
        assert!(guard < 100_000, "program never reached its end");
    }
}

/// Convenience wrapper: load at 0x0400, run to the end, return the CPU for
/// assertions.
pub fn run_program(program: &[u8]) -> Cpu6502 {
    let mut cpu = cpu_with_program(program, 0x0400);
    run_to_end(&mut cpu, 0x0400, program.len());
    cpu
}

/// Peek a byte of the underlying RAM without going through the CPU.
pub fn peek(cpu: &mut Cpu6502, address: u16) -> u8 {
    cpu.read_u8(address)
}
