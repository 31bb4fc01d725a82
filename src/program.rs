use core::ops::Range;

use embedded_hal::spi::{Operation, SpiDevice};

use crate::command::{frame, Opcode};
use crate::device::FlashDevice;
use crate::error::Error;
use crate::status::Status;
use crate::traits::Clock;
use crate::PAGE_SIZE;

/// One Page Program command worth of a larger write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Chunk {
    /// Flash address the chunk is programmed at.
    pub addr: u32,
    /// Offset of the chunk in the source data.
    pub offset: usize,
    pub len: usize,
}

impl Chunk {
    /// The chunk's bytes within the source data.
    pub fn source(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Splits `len` bytes starting at `addr` into chunks that never cross a page.
///
/// The first chunk runs up to the end of the page `addr` is in, every later
/// chunk starts on a page boundary and is at most [`PAGE_SIZE`] long.
#[derive(Clone, Debug)]
pub struct PageChunks {
    addr: u32,
    offset: usize,
    len: usize,
}

impl PageChunks {
    pub fn new(addr: u32, len: usize) -> Self {
        Self {
            addr,
            offset: 0,
            len,
        }
    }
}

impl Iterator for PageChunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let remaining = self.len - self.offset;
        if remaining == 0 {
            return None;
        }
        let room = (PAGE_SIZE - self.addr % PAGE_SIZE) as usize;
        let chunk = Chunk {
            addr: self.addr,
            offset: self.offset,
            len: room.min(remaining),
        };
        self.addr = self.addr.wrapping_add(chunk.len as u32);
        self.offset += chunk.len;
        Some(chunk)
    }
}

impl<SPI, T> FlashDevice<SPI, T>
where
    SPI: SpiDevice,
    T: Clock,
{
    /// Programs `data` at `addr` one page at a time.
    ///
    /// Stops at the first failing chunk. Whatever earlier chunks programmed
    /// stays programmed.
    pub(crate) fn program(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI>> {
        self.ensure_enabled()?;
        self.check_range(addr, data.len())?;
        if data.is_empty() {
            return Ok(());
        }
        trace!("programming {} bytes at {:#x}", data.len(), addr);
        for chunk in PageChunks::new(addr, data.len()) {
            self.write_enable()?;
            self.page_program(chunk.addr, &data[chunk.source()])?;
            self.wait_for_status(Status::WIP, Status::empty())?;
        }
        Ok(())
    }

    /// From datasheet section 8.2.13
    /// The Page Program instruction allows from one byte to 256 bytes (a page) of data
    /// to be programmed at previously erased (FFh) memory locations. The /CS pin must
    /// be held low for the entire length of the instruction while data is being sent
    /// to the device, so opcode, address and data go out in one transaction.
    fn page_program(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI>> {
        let cmd = frame(Opcode::PageProg, Some(addr));
        self.spi
            .transaction(&mut [Operation::Write(cmd.as_bytes()), Operation::Write(data)])
            .map_err(Error::Spi)
    }
}
