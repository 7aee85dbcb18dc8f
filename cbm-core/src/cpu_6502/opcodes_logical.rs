use crate::cpu_6502::*;
use crate::opcodes::OpResult;

/// Every accumulator-bound result flows through here: store it, then let Z
/// and N describe it.
fn set_a(cpu: &mut Cpu6502, result: u8) {
    cpu.a = result;
    cpu.update_zero_and_negative_flag(result);
}

/// ORA: accumulator OR memory.
pub fn ora(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, value) = cpu.operand(mode);
    let result = cpu.a | value;
    set_a(cpu, result);
    Ok(())
}

/// AND: accumulator AND memory.
pub fn and(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, value) = cpu.operand(mode);
    let result = cpu.a & value;
    set_a(cpu, result);
    Ok(())
}

/// EOR: accumulator XOR memory.
pub fn eor(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, value) = cpu.operand(mode);
    let result = cpu.a ^ value;
    set_a(cpu, result);
    Ok(())
}

/// The binary add behind both ADC and SBC. The 6502 has no subtract
/// circuit: SBC feeds the inverted operand through the same adder and lets
/// the incoming carry supply the two's-complement +1, which is why C reads
/// as "no borrow" afterwards.
fn add_binary(cpu: &mut Cpu6502, operand: u8) {
    let sum = cpu.a as u16 + operand as u16 + cpu.get_carry() as u16;
    let result = sum as u8;
    // V compares sign bits against the pre-add accumulator, so it must be
    // computed before A changes.
    cpu.update_overflow_flag(operand, result);
    cpu.update_carry_flag(sum);
    cpu.a = result;
    cpu.update_zero_and_negative_flag(result);
}

fn from_bcd(value: u8) -> u16 {
    (value >> 4) as u16 * 10 + (value & 0x0F) as u16
}

fn to_bcd(value: u16) -> u8 {
    ((value / 10) << 4) as u8 | (value % 10) as u8
}

/// Decimal-mode add: both operands are read as two BCD digits, 0..99. C is
/// the decimal carry, Z follows the decimal result, and N/V are undefined on
/// the hardware; this implementation leaves them cleared.
fn add_decimal(cpu: &mut Cpu6502, operand: u8) {
    let sum = from_bcd(cpu.a) + from_bcd(operand) + cpu.get_carry() as u16;
    let result = sum % 100;

    cpu.set_status_flag(StatusFlag::Carry, sum > 99);
    cpu.set_status_flag(StatusFlag::Zero, result == 0);
    cpu.set_status_flag(StatusFlag::Negative, false);
    cpu.set_status_flag(StatusFlag::Overflow, false);
    cpu.a = to_bcd(result);
}

/// Decimal-mode subtract with C as "no borrow".
fn subtract_decimal(cpu: &mut Cpu6502, operand: u8) {
    let borrow = 1 - cpu.get_carry() as i16;
    let mut difference = from_bcd(cpu.a) as i16 - from_bcd(operand) as i16 - borrow;

    let no_borrow = difference >= 0;
    if !no_borrow {
        difference += 100;
    }

    cpu.set_status_flag(StatusFlag::Carry, no_borrow);
    cpu.set_status_flag(StatusFlag::Zero, difference == 0);
    cpu.set_status_flag(StatusFlag::Negative, false);
    cpu.set_status_flag(StatusFlag::Overflow, false);
    cpu.a = to_bcd(difference as u16);
}

/// ADC: A + memory + C, in whichever number system the D flag selects.
pub fn adc(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, operand) = cpu.operand(mode);
    if cpu.is_status_flag_set(StatusFlag::Decimal) {
        add_decimal(cpu, operand);
    } else {
        add_binary(cpu, operand);
    }
    Ok(())
}

/// SBC: A - memory - (1 - C), honoring the D flag like ADC.
pub fn sbc(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, operand) = cpu.operand(mode);
    if cpu.is_status_flag_set(StatusFlag::Decimal) {
        subtract_decimal(cpu, operand);
    } else {
        add_binary(cpu, !operand);
    }
    Ok(())
}

/// CMP, CPX and CPY are one operation against three registers: subtract
/// with an assumed C=1, keep the flags, throw the difference away. Neither
/// the register nor V is written.
fn compare(cpu: &mut Cpu6502, register: u8, mode: Mode) {
    let (_, value) = cpu.operand(mode);
    cpu.set_status_flag(StatusFlag::Carry, register >= value);
    cpu.update_zero_and_negative_flag(register.wrapping_sub(value));
}

pub fn cmp(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let register = cpu.a;
    compare(cpu, register, mode);
    Ok(())
}

pub fn cpx(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let register = cpu.x;
    compare(cpu, register, mode);
    Ok(())
}

pub fn cpy(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let register = cpu.y;
    compare(cpu, register, mode);
    Ok(())
}

/// INC and DEC adjust their memory operand in place; neither has an
/// accumulator form on this CPU.
fn step_memory(cpu: &mut Cpu6502, mode: Mode, delta: i8) {
    let (address, value) = cpu.operand(mode);
    let result = value.wrapping_add_signed(delta);
    cpu.write_back(address, result);
    cpu.update_zero_and_negative_flag(result);
}

pub fn inc(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    step_memory(cpu, mode, 1);
    Ok(())
}

pub fn dec(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    step_memory(cpu, mode, -1);
    Ok(())
}

/// The index-register steps wrap silently at the byte boundary; loop code
/// leans on the Z and N they leave behind.
pub fn inx(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.x = cpu.x.wrapping_add(1);
    cpu.update_zero_and_negative_flag(cpu.x);
    Ok(())
}

pub fn dex(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.x = cpu.x.wrapping_sub(1);
    cpu.update_zero_and_negative_flag(cpu.x);
    Ok(())
}

pub fn iny(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.y = cpu.y.wrapping_add(1);
    cpu.update_zero_and_negative_flag(cpu.y);
    Ok(())
}

pub fn dey(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.y = cpu.y.wrapping_sub(1);
    cpu.update_zero_and_negative_flag(cpu.y);
    Ok(())
}

/// Common tail of the shift/rotate family: the bit that fell off becomes C,
/// the stored byte drives Z and N, and accumulator mode writes back to A.
fn finish_shift(cpu: &mut Cpu6502, address: Option<u16>, result: u8, carry_out: bool) {
    cpu.set_status_flag(StatusFlag::Carry, carry_out);
    cpu.write_back(address, result);
    cpu.update_zero_and_negative_flag(result);
}

/// ASL: shift left, zero into bit 0.
pub fn asl(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (address, value) = cpu.operand(mode);
    finish_shift(cpu, address, value << 1, value & 0x80 != 0);
    Ok(())
}

/// ROL: shift left through C; the previous carry enters at bit 0.
pub fn rol(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (address, value) = cpu.operand(mode);
    let result = value << 1 | cpu.get_carry();
    finish_shift(cpu, address, result, value & 0x80 != 0);
    Ok(())
}

/// LSR: shift right, zero into bit 7.
pub fn lsr(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (address, value) = cpu.operand(mode);
    finish_shift(cpu, address, value >> 1, value & 0x01 != 0);
    Ok(())
}

/// ROR: shift right through C; the previous carry enters at bit 7.
pub fn ror(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (address, value) = cpu.operand(mode);
    let result = value >> 1 | cpu.get_carry() << 7;
    finish_shift(cpu, address, result, value & 0x01 != 0);
    Ok(())
}
