use crate::constants::STACK_PAGE;
use crate::errors::EmuError;
use crate::machines::ExitRequest;
use crate::mem::SharedAddressSpace;
use crate::opcodes;

// Re-exported for the opcode implementation modules, which glob-import
// their parent.
pub use crate::constants::InterruptVectors;
pub use crate::opcodes::Mode;

pub mod opcodes_jump;
pub mod opcodes_logical;
pub mod opcodes_move;

#[cfg(test)]
pub mod test_helpers;

#[cfg(test)]
mod test;

/// Status register value after RESET: interrupt disable and the always-set
/// bit 5, everything else clear.
pub const RESET_STATUS_FLAG: u8 = 0b00100100;

#[rustfmt::skip]
#[derive(Clone, Copy)]
pub enum StatusFlag {
  Carry            = 0b00000001,
  Zero             = 0b00000010,
  InterruptDisable = 0b00000100,
  Decimal          = 0b00001000,
  Break            = 0b00010000,
  Push             = 0b00100000,
  Overflow         = 0b01000000,
  Negative         = 0b10000000,
}

/// What a pre-instruction hook did with the current program counter.
pub enum HookEvent {
    /// Decode the byte at PC normally.
    NotHandled,
    /// The hook simulated the routine (and may have rewritten PC, registers,
    /// flags or memory); re-run the hook chain instead of decoding.
    Handled,
    /// Leave the run loop and hand the request to the launcher.
    Exit(ExitRequest),
}

/// Invoked before every instruction fetch. The machine models implement this
/// to trap KERNAL entry points; the CPU only sees the abstraction, so there
/// is no ownership cycle between the two.
///
/// A hook that answers `Handled` must leave the CPU self-consistent: if it
/// pretended to be a subroutine, the stack has to agree with PC.
pub trait PreInstructionHook {
    fn pre_instruction(&mut self, cpu: &mut Cpu6502) -> Result<HookEvent, EmuError>;
}

/// The MOS 6502 interpreter.
///
/// Every byte the CPU touches goes through the shared address space, so bank
/// switching and I/O side effects are entirely the machine model's business.
/// Cycle counting is not modeled; one `step` is one instruction.
pub struct Cpu6502 {
    pub mem: SharedAddressSpace,
    /// "A" register, the accumulator. Results of arithmetic and logic land
    /// here, with the status register tracking carry, overflow and so on.
    pub a: u8,
    /// "X" index register.
    pub x: u8,
    /// "Y" index register.
    pub y: u8,
    /// "PC", the 16-bit program counter.
    pub pc: u16,
    /// "S", the stack pointer. The stack is the 256 bytes of page 1 and
    /// grows downward; pushes wrap in 8-bit space.
    pub s: u8,
    /// "P", the status register, packed NV1BDIZC. Bit 5 reads as 1 and the
    /// B bit is only ever set on the copy pushed by PHP/BRK.
    pub p: u8,
    /// Instructions executed since reset. Tests bound their runs with it.
    pub tick_count: u64,
}

impl Cpu6502 {
    /// Build a CPU whose PC starts at the RESET vector of the given address
    /// space.
    pub fn new(mem: SharedAddressSpace) -> Cpu6502 {
        let pc = mem
            .borrow_mut()
            .read_u16(InterruptVectors::ResetVector as u16);
        Cpu6502 {
            mem,
            a: 0,
            x: 0,
            y: 0,
            pc,
            // Top of page 1; pushes descend from here.
            s: 0xFF,
            p: RESET_STATUS_FLAG,
            tick_count: 0,
        }
    }

    /// RESET: reload PC from the vector, park the stack pointer at the top,
    /// clear decimal, set interrupt disable. The other registers keep
    /// whatever they held, as on real silicon.
    pub fn reset(&mut self) {
        self.pc = self.read_u16(InterruptVectors::ResetVector as u16);
        self.s = 0xFF;
        self.p = RESET_STATUS_FLAG;
    }

    pub fn read_u8(&mut self, address: u16) -> u8 {
        self.mem.borrow_mut().read(address)
    }

    pub fn write_u8(&mut self, address: u16, value: u8) {
        self.mem.borrow_mut().write(address, value);
    }

    pub fn read_u16(&mut self, address: u16) -> u16 {
        self.mem.borrow_mut().read_u16(address)
    }

    pub fn write_u16(&mut self, address: u16, value: u16) {
        self.mem.borrow_mut().write_u16(address, value);
    }

    /// Read the byte at PC and advance past it.
    fn next_u8(&mut self) -> u8 {
        let value = self.read_u8(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Read the little-endian u16 at PC and advance past it.
    fn next_u16(&mut self) -> u16 {
        let value = self.read_u16(self.pc);
        self.pc = self.pc.wrapping_add(2);
        value
    }

    /// Execute exactly one instruction. The opcode tables cover all 256 byte
    /// values; the undocumented ones dispatch to a handler that reports a
    /// fatal decode error.
    pub fn step(&mut self) -> Result<(), EmuError> {
        self.tick_count += 1;
        let opcode = self.next_u8();
        let operation = opcodes::OPERATION_FN_TABLE[opcode as usize];
        let mode = opcodes::ADDRESSING_MODE_TABLE[opcode as usize];
        operation(self, mode)
    }

    /// The fetch-decode-execute loop: consult the hook chain, then run one
    /// instruction. A `Handled` hook restarts the chain because it may have
    /// moved PC onto another trap address.
    pub fn run(&mut self, hooks: &mut dyn PreInstructionHook) -> Result<ExitRequest, EmuError> {
        loop {
            match hooks.pre_instruction(self)? {
                HookEvent::Handled => continue,
                HookEvent::Exit(request) => return Ok(request),
                HookEvent::NotHandled => self.step()?,
            }
        }
    }

    /// Resolve the operand address for the mode, consuming operand bytes at
    /// PC as a side effect.
    fn operand_address(&mut self, mode: Mode) -> u16 {
        match mode {
            Mode::Absolute => self.next_u16(),
            Mode::AbsoluteIndexedX => self.next_u16().wrapping_add(self.x as u16),
            Mode::AbsoluteIndexedY => self.next_u16().wrapping_add(self.y as u16),
            Mode::Immediate => {
                // The operand is the byte at PC itself.
                let address = self.pc;
                self.pc = self.pc.wrapping_add(1);
                address
            }
            // Used only by JMP. The 6502 increments only the low pointer
            // byte when fetching the target, so a pointer at $xxFF wraps
            // within its own page instead of carrying into the next one.
            Mode::Indirect => {
                let pointer = self.next_u16();
                let lo = self.read_u8(pointer);
                let hi = self.read_u8((pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF));
                u16::from_le_bytes([lo, hi])
            }
            // ($zp,X): the pointer itself lives in the zero page and both
            // the index addition and the high-byte fetch wrap there.
            Mode::IndirectX => {
                let zp = self.next_u8().wrapping_add(self.x);
                let lo = self.read_u8(zp as u16);
                let hi = self.read_u8(zp.wrapping_add(1) as u16);
                u16::from_le_bytes([lo, hi])
            }
            // ($zp),Y: fetch the base pointer from the zero page, then index
            // with Y in 16-bit space.
            Mode::IndirectY => {
                let zp = self.next_u8();
                let lo = self.read_u8(zp as u16);
                let hi = self.read_u8(zp.wrapping_add(1) as u16);
                u16::from_le_bytes([lo, hi]).wrapping_add(self.y as u16)
            }
            // Branch displacement: a signed byte relative to the address of
            // the instruction that follows the branch.
            Mode::Relative => {
                let offset = self.next_u8() as i8;
                self.pc.wrapping_add(offset as u16)
            }
            Mode::ZeroPage => self.next_u8() as u16,
            // Zero-page indexing discards the carry; the target never
            // leaves the zero page.
            Mode::ZeroPageX => self.next_u8().wrapping_add(self.x) as u16,
            Mode::ZeroPageY => self.next_u8().wrapping_add(self.y) as u16,
            Mode::Implied => panic!("attempted to take the operand address of an implied mode"),
            Mode::RegisterA => panic!("register A has no address"),
            Mode::None => panic!("Mode::None is attempting to be used"),
        }
    }

    /// Operand address and value for read-modify-write and accumulator
    /// instructions. `None` for the address means the operand is register A.
    fn operand(&mut self, mode: Mode) -> (Option<u16>, u8) {
        if let Mode::RegisterA = mode {
            return (None, self.a);
        }
        let address = self.operand_address(mode);
        let value = self.read_u8(address);
        (Some(address), value)
    }

    /// Store the result of a read-modify-write instruction where it came
    /// from: memory, or register A for accumulator mode.
    fn write_back(&mut self, address: Option<u16>, value: u8) {
        match address {
            Some(address) => self.write_u8(address, value),
            None => self.a = value,
        }
    }

    /// Z and N are set together after nearly every result.
    pub fn update_zero_and_negative_flag(&mut self, value: u8) {
        let negative = 0b1000_0000;
        self.set_status_flag(StatusFlag::Zero, value == 0);
        self.set_status_flag(StatusFlag::Negative, value & negative == negative);
    }

    /// ADC and SBC work on 9 bits; bit 8 of the widened sum is the carry.
    fn update_carry_flag(&mut self, result: u16) {
        let carry = 0b1_0000_0000;
        self.set_status_flag(StatusFlag::Carry, result & carry == carry);
    }

    /// Signed overflow for ADC/SBC: set when A and the operand agree on the
    /// sign bit but the result disagrees. Must be computed before A is
    /// overwritten with the result.
    fn update_overflow_flag(&mut self, operand: u8, result: u8) {
        let bit_7_mask = 0b1000_0000;
        let does_overflow =
            (bit_7_mask & !(self.a ^ operand) & (self.a ^ result)) == bit_7_mask;
        self.set_status_flag(StatusFlag::Overflow, does_overflow);
    }

    pub fn set_status_flag(&mut self, status_flag: StatusFlag, value: bool) {
        if value {
            self.p |= status_flag as u8;
        } else {
            self.p &= !(status_flag as u8);
        }
    }

    pub fn is_status_flag_set(&self, status_flag: StatusFlag) -> bool {
        let flag = status_flag as u8;
        self.p & flag == flag
    }

    pub fn get_carry(&self) -> u8 {
        self.p & (StatusFlag::Carry as u8)
    }

    /// The canonical packed status byte as PHP and BRK push it: B and bit 5
    /// forced high.
    pub fn status_for_push(&self) -> u8 {
        self.p | StatusFlag::Break as u8 | StatusFlag::Push as u8
    }

    /// The canonical unpack used by PLP and RTI: B has no storage in P, and
    /// bit 5 always reads as set.
    pub fn set_status_from_pull(&mut self, value: u8) {
        self.p = (value | StatusFlag::Push as u8) & !(StatusFlag::Break as u8);
    }

    pub fn push_stack_u8(&mut self, value: u8) {
        let address = u16::from_le_bytes([self.s, STACK_PAGE]);
        // The stack pointer names the next free slot; write, then grow down.
        self.write_u8(address, value);
        self.s = self.s.wrapping_sub(1);
    }

    pub fn pull_stack_u8(&mut self) -> u8 {
        // The slot at S is free; step back up to the last pushed byte.
        self.s = self.s.wrapping_add(1);
        let address = u16::from_le_bytes([self.s, STACK_PAGE]);
        self.read_u8(address)
    }

    pub fn push_stack_u16(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push_stack_u8(hi);
        self.push_stack_u8(lo);
    }

    pub fn pull_stack_u16(&mut self) -> u16 {
        let lo = self.pull_stack_u8();
        let hi = self.pull_stack_u8();
        u16::from_le_bytes([lo, hi])
    }

    /// Stand in for an RTS the trapped ROM routine would have executed: pull
    /// the return address and resume after the JSR. Every hook that swallows
    /// a KERNAL call goes through here so the stack discipline lives in one
    /// place.
    pub fn simulate_rts(&mut self) {
        self.pc = self.pull_stack_u16().wrapping_add(1);
    }

    /// Stand in for a JSR into ROM: arrange for the routine at `target` to
    /// return to `return_to`.
    pub fn simulate_jsr(&mut self, target: u16, return_to: u16) {
        self.push_stack_u16(return_to.wrapping_sub(1));
        self.pc = target;
    }
}
