use crate::cpu_6502::opcodes_jump::*;
use crate::cpu_6502::opcodes_logical::*;
use crate::cpu_6502::opcodes_move::*;
use crate::cpu_6502::Cpu6502;
use crate::errors::EmuError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Absolute,         // abs
    AbsoluteIndexedX, // abx
    AbsoluteIndexedY, // aby
    Immediate,        // imm
    Implied,          // imp
    Indirect,         // ind - only JMP uses it
    IndirectX,        // izx
    IndirectY,        // izy
    Relative,         // rel
    RegisterA,        // a
    ZeroPage,         // zp
    ZeroPageX,        // zpx
    ZeroPageY,        // zpy
    None,             // non - the undocumented slots
}

pub type OpResult = Result<(), EmuError>;

/// Every undocumented opcode dispatches here. The Commodore firmware this
/// emulator exists to run never executes them, so reaching this handler
/// means execution has wandered into data; abort with a diagnostic rather
/// than guess.
pub fn jam(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let pc = cpu.pc.wrapping_sub(1);
    let opcode = cpu.read_u8(pc);
    Err(EmuError::IllegalOpcode { pc, opcode })
}

pub type OperationFn = fn(&mut Cpu6502, Mode) -> OpResult;

/// The operations are all contained in tables that match up the opcode to
/// its particular implementation details. Sixteen entries per row, one row
/// per high nibble.
#[rustfmt::skip]
pub const OPERATION_FN_TABLE: [OperationFn; 256] = [
    // 0x00
    brk, ora, jam, jam, jam, ora, asl, jam, php, ora, asl, jam, jam, ora, asl, jam,
    // 0x10
    bpl, ora, jam, jam, jam, ora, asl, jam, clc, ora, jam, jam, jam, ora, asl, jam,
    // 0x20
    jsr, and, jam, jam, bit, and, rol, jam, plp, and, rol, jam, bit, and, rol, jam,
    // 0x30
    bmi, and, jam, jam, jam, and, rol, jam, sec, and, jam, jam, jam, and, rol, jam,
    // 0x40
    rti, eor, jam, jam, jam, eor, lsr, jam, pha, eor, lsr, jam, jmp, eor, lsr, jam,
    // 0x50
    bvc, eor, jam, jam, jam, eor, lsr, jam, cli, eor, jam, jam, jam, eor, lsr, jam,
    // 0x60
    rts, adc, jam, jam, jam, adc, ror, jam, pla, adc, ror, jam, jmp, adc, ror, jam,
    // 0x70
    bvs, adc, jam, jam, jam, adc, ror, jam, sei, adc, jam, jam, jam, adc, ror, jam,
    // 0x80
    jam, sta, jam, jam, sty, sta, stx, jam, dey, jam, txa, jam, sty, sta, stx, jam,
    // 0x90
    bcc, sta, jam, jam, sty, sta, stx, jam, tya, sta, txs, jam, jam, sta, jam, jam,
    // 0xA0
    ldy, lda, ldx, jam, ldy, lda, ldx, jam, tay, lda, tax, jam, ldy, lda, ldx, jam,
    // 0xB0
    bcs, lda, jam, jam, ldy, lda, ldx, jam, clv, lda, tsx, jam, ldy, lda, ldx, jam,
    // 0xC0
    cpy, cmp, jam, jam, cpy, cmp, dec, jam, iny, cmp, dex, jam, cpy, cmp, dec, jam,
    // 0xD0
    bne, cmp, jam, jam, jam, cmp, dec, jam, cld, cmp, jam, jam, jam, cmp, dec, jam,
    // 0xE0
    cpx, sbc, jam, jam, cpx, sbc, inc, jam, inx, sbc, nop, jam, cpx, sbc, inc, jam,
    // 0xF0
    beq, sbc, jam, jam, jam, sbc, inc, jam, sed, sbc, jam, jam, jam, sbc, inc, jam,
];

use Mode::{
    Absolute as ABS, AbsoluteIndexedX as ABX, AbsoluteIndexedY as ABY, Immediate as IMM,
    Implied as IMP, Indirect as IND, IndirectX as IZX, IndirectY as IZY, None as NON,
    RegisterA as ACC, Relative as REL, ZeroPage as ZP, ZeroPageX as ZPX, ZeroPageY as ZPY,
};

#[rustfmt::skip]
pub const ADDRESSING_MODE_TABLE: [Mode; 256] = [
    // 0x00
    IMP, IZX, NON, NON, NON, ZP,  ZP,  NON, IMP, IMM, ACC, NON, NON, ABS, ABS, NON,
    // 0x10
    REL, IZY, NON, NON, NON, ZPX, ZPX, NON, IMP, ABY, NON, NON, NON, ABX, ABX, NON,
    // 0x20
    ABS, IZX, NON, NON, ZP,  ZP,  ZP,  NON, IMP, IMM, ACC, NON, ABS, ABS, ABS, NON,
    // 0x30
    REL, IZY, NON, NON, NON, ZPX, ZPX, NON, IMP, ABY, NON, NON, NON, ABX, ABX, NON,
    // 0x40
    IMP, IZX, NON, NON, NON, ZP,  ZP,  NON, IMP, IMM, ACC, NON, ABS, ABS, ABS, NON,
    // 0x50
    REL, IZY, NON, NON, NON, ZPX, ZPX, NON, IMP, ABY, NON, NON, NON, ABX, ABX, NON,
    // 0x60
    IMP, IZX, NON, NON, NON, ZP,  ZP,  NON, IMP, IMM, ACC, NON, IND, ABS, ABS, NON,
    // 0x70
    REL, IZY, NON, NON, NON, ZPX, ZPX, NON, IMP, ABY, NON, NON, NON, ABX, ABX, NON,
    // 0x80
    NON, IZX, NON, NON, ZP,  ZP,  ZP,  NON, IMP, NON, IMP, NON, ABS, ABS, ABS, NON,
    // 0x90
    REL, IZY, NON, NON, ZPX, ZPX, ZPY, NON, IMP, ABY, IMP, NON, NON, ABX, NON, NON,
    // 0xA0
    IMM, IZX, IMM, NON, ZP,  ZP,  ZP,  NON, IMP, IMM, IMP, NON, ABS, ABS, ABS, NON,
    // 0xB0
    REL, IZY, NON, NON, ZPX, ZPX, ZPY, NON, IMP, ABY, IMP, NON, ABX, ABX, ABY, NON,
    // 0xC0
    IMM, IZX, NON, NON, ZP,  ZP,  ZP,  NON, IMP, IMM, IMP, NON, ABS, ABS, ABS, NON,
    // 0xD0
    REL, IZY, NON, NON, NON, ZPX, ZPX, NON, IMP, ABY, NON, NON, NON, ABX, ABX, NON,
    // 0xE0
    IMM, IZX, NON, NON, ZP,  ZP,  ZP,  NON, IMP, IMM, IMP, NON, ABS, ABS, ABS, NON,
    // 0xF0
    REL, IZY, NON, NON, NON, ZPX, ZPX, NON, IMP, ABY, NON, NON, NON, ABX, ABX, NON,
];
