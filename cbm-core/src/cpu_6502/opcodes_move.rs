use crate::cpu_6502::*;
use crate::opcodes::OpResult;

/// Every load, transfer and PLA runs its byte past Z and N on the way to a
/// register; stores and TXS are the only moves that leave P alone.
fn moved(cpu: &mut Cpu6502, value: u8) -> u8 {
    cpu.update_zero_and_negative_flag(value);
    value
}

/// LDA: fill the accumulator from the addressed byte.
pub fn lda(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, value) = cpu.operand(mode);
    cpu.a = moved(cpu, value);
    Ok(())
}

/// LDX.
pub fn ldx(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, value) = cpu.operand(mode);
    cpu.x = moved(cpu, value);
    Ok(())
}

/// LDY.
pub fn ldy(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, value) = cpu.operand(mode);
    cpu.y = moved(cpu, value);
    Ok(())
}

/// STA. A store resolves its target without reading it first, so writing an
/// I/O register never triggers that register's read side effects.
pub fn sta(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let address = cpu.operand_address(mode);
    cpu.write_u8(address, cpu.a);
    Ok(())
}

/// STX.
pub fn stx(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let address = cpu.operand_address(mode);
    cpu.write_u8(address, cpu.x);
    Ok(())
}

/// STY.
pub fn sty(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let address = cpu.operand_address(mode);
    cpu.write_u8(address, cpu.y);
    Ok(())
}

/// TAX: A into X.
pub fn tax(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let value = cpu.a;
    cpu.x = moved(cpu, value);
    Ok(())
}

/// TAY: A into Y.
pub fn tay(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let value = cpu.a;
    cpu.y = moved(cpu, value);
    Ok(())
}

/// TXA: X into A.
pub fn txa(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let value = cpu.x;
    cpu.a = moved(cpu, value);
    Ok(())
}

/// TYA: Y into A.
pub fn tya(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let value = cpu.y;
    cpu.a = moved(cpu, value);
    Ok(())
}

/// TSX: the stack pointer into X, flags included.
pub fn tsx(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let value = cpu.s;
    cpu.x = moved(cpu, value);
    Ok(())
}

/// TXS: X into the stack pointer. The one transfer that touches no flags.
pub fn txs(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.s = cpu.x;
    Ok(())
}

/// PHA. The status byte stays put; only the accumulator goes up.
pub fn pha(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.push_stack_u8(cpu.a);
    Ok(())
}

/// PLA. Unlike PLP's raw restore, the pulled byte is a result and sets Z/N.
pub fn pla(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let value = cpu.pull_stack_u8();
    cpu.a = moved(cpu, value);
    Ok(())
}

/// PHP pushes the canonical packed status byte, B and bit 5 high.
pub fn php(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let status = cpu.status_for_push();
    cpu.push_stack_u8(status);
    Ok(())
}

/// PLP restores P through the canonical unpack; B stays clear, bit 5 stays
/// set, and Z/N come from the pulled byte itself rather than a result.
pub fn plp(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let status = cpu.pull_stack_u8();
    cpu.set_status_from_pull(status);
    Ok(())
}
