use bitflags::bitflags;
use embedded_hal::spi::SpiDevice;

use crate::command::{frame, Opcode};
use crate::device::FlashDevice;
use crate::error::Error;
use crate::traits::Clock;

bitflags! {
    /// Status register bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Erase or write in progress.
        const WIP = 1 << 0;
        /// Status of the **W**rite **E**nable **L**atch.
        const WEL = 1 << 1;
        /// The 3 protection region bits.
        const PROT = 0b00011100;
        /// **S**tatus **R**egister **W**rite **D**isable bit.
        const SRWD = 1 << 7;
    }
}

impl<SPI, T> FlashDevice<SPI, T>
where
    SPI: SpiDevice,
    T: Clock,
{
    /// Reads the status register.
    pub fn read_status(&mut self) -> Result<Status, Error<SPI>> {
        let mut response = [0u8; 1];
        self.command_with_response(&frame(Opcode::ReadStatus, None), &mut response)?;
        Ok(Status::from_bits_retain(response[0]))
    }

    /// Polls the status register until `status & mask == value`.
    ///
    /// Fails with [`Error::StatusTimeout`] once the configured timeout has
    /// elapsed without a match. The register is read at least once.
    pub(crate) fn wait_for_status(&mut self, mask: Status, value: Status) -> Result<(), Error<SPI>> {
        let matched = self.poll(|this| Ok(this.read_status()? & mask == value))?;
        if !matched {
            warn!(
                "status did not reach {:#x}/{:#x} within {} ms",
                value.bits(),
                mask.bits(),
                self.config.timeout_ms
            );
            return Err(Error::StatusTimeout);
        }
        Ok(())
    }

    /// From datasheet section 8.2.1
    /// The Write Enable instruction sets the Write Enable Latch (WEL) bit
    /// in the Status Register to a 1. The WEL bit must be set prior to every Page Program,
    /// Sector Erase and Chip Erase instruction, and is cleared again when the
    /// operation completes.
    ///
    /// The instruction is resent until the chip reports WEL set with WIP clear.
    pub(crate) fn write_enable(&mut self) -> Result<(), Error<SPI>> {
        let latched = self.poll(|this| {
            this.command(&frame(Opcode::WriteEnable, None))?;
            let status = this.read_status()?;
            Ok(status & (Status::WIP | Status::WEL) == Status::WEL)
        })?;
        if !latched {
            warn!("WEL not set within {} ms", self.config.timeout_ms);
            return Err(Error::WriteEnableFailed);
        }
        Ok(())
    }

    /// Runs `attempt` until it returns `true` or the timeout expires, sleeping
    /// one poll interval between attempts. Returns `false` on timeout.
    fn poll<F>(&mut self, mut attempt: F) -> Result<bool, Error<SPI>>
    where
        F: FnMut(&mut Self) -> Result<bool, Error<SPI>>,
    {
        let start = self.clock.now_ms();
        let timeout = u64::from(self.config.timeout_ms);
        loop {
            if attempt(self)? {
                return Ok(true);
            }
            self.clock.delay_ms(self.config.poll_interval_ms);
            if self.clock.now_ms().saturating_sub(start) >= timeout {
                return Ok(false);
            }
        }
    }
}
