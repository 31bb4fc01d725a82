/// Instruction set shared by the 25-series parts this driver talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Set the write enable latch.
    WriteEnable = 0x06,
    /// Read 8-bit manufacturer ID and 16-bit device ID.
    ReadJedecId = 0x9F,
    /// Read the 8-bit status register.
    ReadStatus = 0x05,
    Read = 0x03,
    SectorErase = 0x20,
    PageProg = 0x02,
    ChipErase = 0xC7,
    PowerDown = 0xB9,
    ReleasePowerDown = 0xAB,
}

/// An encoded command: the opcode, optionally followed by a 24-bit address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; 4],
    len: usize,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Builds the command frame for `opcode`.
///
/// When `addr` is present it is sent MSB first. Only the low 24 bits are
/// transferred, anything above is dropped.
pub fn frame(opcode: Opcode, addr: Option<u32>) -> Frame {
    match addr {
        None => Frame {
            buf: [opcode as u8, 0, 0, 0],
            len: 1,
        },
        Some(addr) => Frame {
            buf: [
                opcode as u8,
                ((addr >> 16) & 0xFF) as u8,
                ((addr >> 8) & 0xFF) as u8,
                (addr & 0xFF) as u8,
            ],
            len: 4,
        },
    }
}
