pub enum InterruptVectors {
    // The Non-Maskable Interrupt or NMI ($FFFA). Nothing in a text-only
    // machine raises it, but the vector is part of the CPU contract.
    NonMaskableInterrupt = 0xFFFA,
    ResetVector = 0xFFFC,
    IrqBrkVector = 0xFFFE,
}

pub const STACK_PAGE: u8 = 0x01;
