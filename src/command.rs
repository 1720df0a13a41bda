//! Instruction opcodes and the instruction + address header that precedes
//! every addressed command.

/// Time the chip needs with CS high after Write Enable (tRES) before the
/// following program, erase or status write will latch it.
pub const WRITE_ENABLE_SETTLE_US: u32 = 3;

/// Length of an opcode followed by a 24-bit address.
pub const HEADER_LEN: usize = 4;

/// Only the low 24 bits of an address reach the chip.
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    /// Read the manufacturer ID and the two device ID bytes.
    ReadJedecId = 0x9F,
    Read = 0x03,
    PageProgram = 0x02,
    SectorErase = 0xD7,
    BlockErase = 0xD8,
    ChipErase = 0xC7,
    /// Read the 8-bit status register.
    ReadStatus = 0x05,
    WriteStatus = 0x01,
    /// Set the write enable latch.
    WriteEnable = 0x06,
}

/// Builds `[opcode, A23..A16, A15..A8, A7..A0]`.
pub const fn frame(opcode: Opcode, addr: u32) -> [u8; HEADER_LEN] {
    [
        opcode as u8,
        (addr >> 16) as u8,
        (addr >> 8) as u8,
        addr as u8,
    ]
}
