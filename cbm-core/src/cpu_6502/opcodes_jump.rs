use crate::cpu_6502::*;
use crate::opcodes::OpResult;

/// JMP. The absolute form is a plain PC load; the indirect form inherits
/// the page-wrap quirk from the addressing logic.
pub fn jmp(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    cpu.pc = cpu.operand_address(mode);
    Ok(())
}

/// Jump to subroutine. The pushed address is the last byte of the JSR
/// instruction; RTS adds one on the way back.
pub fn jsr(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let address = cpu.operand_address(mode);
    let return_address = cpu.pc.wrapping_sub(1);
    cpu.push_stack_u16(return_address);
    cpu.pc = address;
    Ok(())
}

/// RTS pulls what JSR pushed and steps past it. The KERNAL traps reuse the
/// same helper when they stand in for a ROM routine.
pub fn rts(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.simulate_rts();
    Ok(())
}

/// Software interrupt. BRK is a two-byte instruction in practice: the pushed
/// return address skips the padding byte after the opcode. The status copy
/// goes up with B set, and execution continues at the IRQ vector.
pub fn brk(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let return_address = cpu.pc.wrapping_add(1);
    cpu.push_stack_u16(return_address);
    let status = cpu.status_for_push();
    cpu.push_stack_u8(status);
    cpu.set_status_flag(StatusFlag::InterruptDisable, true);
    cpu.pc = cpu.read_u16(InterruptVectors::IrqBrkVector as u16);
    Ok(())
}

/// Return from Interrupt: restore P, then PC, with no +1 adjustment.
pub fn rti(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    let status = cpu.pull_stack_u8();
    cpu.set_status_from_pull(status);
    cpu.pc = cpu.pull_stack_u16();
    Ok(())
}

/// Bit test: Z from the mask, N and V straight from the operand. A is not
/// modified.
pub fn bit(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    let (_, operand) = cpu.operand(mode);
    let result = cpu.a & operand;
    cpu.set_status_flag(StatusFlag::Negative, operand & 0b1000_0000 != 0);
    cpu.set_status_flag(StatusFlag::Overflow, operand & 0b0100_0000 != 0);
    cpu.set_status_flag(StatusFlag::Zero, result == 0);
    Ok(())
}

/// The eight conditional branches differ only in which status bit they
/// watch and which level they want. The displacement byte is consumed
/// whether or not the branch goes, so PC always clears the instruction.
fn branch_when(cpu: &mut Cpu6502, mode: Mode, flag: StatusFlag, wanted: bool) {
    let target = cpu.operand_address(mode);
    if cpu.is_status_flag_set(flag) == wanted {
        cpu.pc = target;
    }
}

/// BPL: the last result looked non-negative.
pub fn bpl(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    branch_when(cpu, mode, StatusFlag::Negative, false);
    Ok(())
}

/// BMI: the last result had bit 7 set.
pub fn bmi(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    branch_when(cpu, mode, StatusFlag::Negative, true);
    Ok(())
}

/// BVC.
pub fn bvc(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    branch_when(cpu, mode, StatusFlag::Overflow, false);
    Ok(())
}

/// BVS.
pub fn bvs(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    branch_when(cpu, mode, StatusFlag::Overflow, true);
    Ok(())
}

/// BCC: also the unsigned "less than" after a compare.
pub fn bcc(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    branch_when(cpu, mode, StatusFlag::Carry, false);
    Ok(())
}

/// BCS: unsigned "greater or equal" after a compare.
pub fn bcs(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    branch_when(cpu, mode, StatusFlag::Carry, true);
    Ok(())
}

/// BNE.
pub fn bne(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    branch_when(cpu, mode, StatusFlag::Zero, false);
    Ok(())
}

/// BEQ.
pub fn beq(cpu: &mut Cpu6502, mode: Mode) -> OpResult {
    branch_when(cpu, mode, StatusFlag::Zero, true);
    Ok(())
}

// The explicit flag writes. Two bits have no clearing instruction at all:
// V only falls via CLV or PLP, and B has no instruction in either
// direction.

/// CLC, ahead of nearly every 16-bit add in firmware.
pub fn clc(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.set_status_flag(StatusFlag::Carry, false);
    Ok(())
}

/// SEC, ahead of every borrow-free SBC.
pub fn sec(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.set_status_flag(StatusFlag::Carry, true);
    Ok(())
}

/// CLD: back to binary arithmetic.
pub fn cld(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.set_status_flag(StatusFlag::Decimal, false);
    Ok(())
}

/// SED: BCD arithmetic until further notice.
pub fn sed(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.set_status_flag(StatusFlag::Decimal, true);
    Ok(())
}

/// CLI.
pub fn cli(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.set_status_flag(StatusFlag::InterruptDisable, false);
    Ok(())
}

/// SEI.
pub fn sei(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.set_status_flag(StatusFlag::InterruptDisable, true);
    Ok(())
}

/// CLV.
pub fn clv(cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    cpu.set_status_flag(StatusFlag::Overflow, false);
    Ok(())
}

/// NOP: a byte of nothing.
pub fn nop(_cpu: &mut Cpu6502, _mode: Mode) -> OpResult {
    Ok(())
}
