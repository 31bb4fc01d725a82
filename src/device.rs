use core::fmt::Debug;
use core::ops::{Bound, RangeBounds};

use crate::command::{frame, Frame, Opcode};
use crate::config::Config;
use crate::error::Error;
use crate::status::Status;
use crate::traits::{Clock, ConfigureBus};
use crate::verify::{VerifyMode, WriteOutcome};
use crate::{MAX_BLOCKS, SECTOR_SIZE};
use embedded_hal::spi::{Operation, SpiDevice, MODE_0};

/// Release from deep power-down takes tRES1 (3us) before the chip accepts
/// the next instruction, entering it takes tDP (3us).
const POWER_TRANSITION_US: u32 = 3;

/// Power state as tracked by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Deep power-down, only `configure` and `enable` are accepted.
    Disabled,
    Enabled,
}

/// A 25-series NOR flash behind an SPI device.
///
/// Starts out [`DeviceState::Disabled`]; call [`enable`](Self::enable) before
/// any data operation.
pub struct FlashDevice<SPI, T> {
    pub(crate) spi: SPI,
    pub(crate) clock: T,
    pub(crate) config: Config,
    state: DeviceState,
}

impl<SPI, T> Debug for FlashDevice<SPI, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashDevice")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}

impl<SPI, T> FlashDevice<SPI, T> {
    pub fn new(spi: SPI, clock: T, mut config: Config) -> Self {
        if config.blocks > MAX_BLOCKS {
            warn!(
                "{} blocks do not fit 24-bit addressing, using {}",
                config.blocks,
                MAX_BLOCKS
            );
            config.blocks = MAX_BLOCKS;
        }
        Self {
            spi,
            clock,
            config,
            state: DeviceState::Disabled,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gives back the bus and clock handles.
    pub fn release(self) -> (SPI, T) {
        (self.spi, self.clock)
    }
}

impl<SPI, T> FlashDevice<SPI, T>
where
    SPI: ConfigureBus,
{
    /// Puts the bus in SPI mode 0 at up to `speed_hz` and returns the
    /// frequency the bus accepted. Allowed in either power state.
    pub fn configure(&mut self, speed_hz: u32) -> u32 {
        let accepted = self.spi.set_clock(MODE_0, speed_hz);
        debug!("SPI clock {} Hz (requested {} Hz)", accepted, speed_hz);
        accepted
    }
}

impl<SPI, T> FlashDevice<SPI, T>
where
    SPI: SpiDevice,
    T: Clock,
{
    /// Capacity in bytes.
    pub fn size(&self) -> Result<u32, Error<SPI>> {
        self.ensure_enabled()?;
        Ok(self.config.capacity())
    }

    /// Wakes the chip from deep power-down. Does nothing when already enabled.
    pub fn enable(&mut self) -> Result<(), Error<SPI>> {
        if self.state == DeviceState::Enabled {
            return Ok(());
        }
        self.command(&frame(Opcode::ReleasePowerDown, None))?;
        self.clock.delay_us(POWER_TRANSITION_US);
        self.state = DeviceState::Enabled;
        debug!("flash enabled");
        Ok(())
    }

    /// Puts the chip into deep power-down. Does nothing when already disabled.
    pub fn disable(&mut self) -> Result<(), Error<SPI>> {
        if self.state == DeviceState::Disabled {
            return Ok(());
        }
        self.command(&frame(Opcode::PowerDown, None))?;
        self.clock.delay_us(POWER_TRANSITION_US);
        self.state = DeviceState::Disabled;
        debug!("flash disabled");
        Ok(())
    }

    /// Reads the JEDEC identification as `manufacturer << 16 | device id`.
    pub fn chip_id(&mut self) -> Result<u32, Error<SPI>> {
        self.ensure_enabled()?;
        let mut response = [0u8; 3];
        self.command_with_response(&frame(Opcode::ReadJedecId, None), &mut response)?;
        let id = u32::from(response[0]) << 16 | u32::from(response[1]) << 8 | u32::from(response[2]);
        debug!("JEDEC id {:#x}", id);
        Ok(id)
    }

    pub fn is_busy(&mut self) -> Result<bool, Error<SPI>> {
        self.ensure_enabled()?;
        Ok(self.read_status()?.contains(Status::WIP))
    }

    /// Sector erase (see datasheet 8.2.15)
    /// The Sector Erase instruction sets all memory within a specified sector
    /// (4K-bytes) to the erased state of all 1s (FFh). A Write Enable instruction
    /// must be executed before the device will accept the Sector Erase Instruction
    /// (Status Register bit WEL must equal 1).
    ///
    /// Blocks until the chip reports the erase finished.
    pub fn erase_sector(&mut self, addr: u32) -> Result<(), Error<SPI>> {
        self.ensure_enabled()?;
        if addr % SECTOR_SIZE != 0 {
            return Err(Error::SectorBoundary);
        }
        self.check_range(addr, SECTOR_SIZE as usize)?;
        trace!("erasing sector {:#x}", addr);
        self.write_enable()?;
        self.command(&frame(Opcode::SectorErase, Some(addr)))?;
        self.wait_for_status(Status::WIP, Status::empty())
    }

    /// Erases every sector in `from..to`. Both ends must be sector aligned.
    pub fn erase_range(&mut self, from: u32, to: u32) -> Result<(), Error<SPI>> {
        self.ensure_enabled()?;
        if from % SECTOR_SIZE != 0 || to % SECTOR_SIZE != 0 {
            return Err(Error::SectorBoundary);
        }
        if from > to {
            return Err(Error::OutOfRange);
        }
        self.check_range(from, (to - from) as usize)?;
        for addr in (from..to).step_by(SECTOR_SIZE as usize) {
            self.erase_sector(addr)?;
        }
        Ok(())
    }

    /// Chip Erase (see datasheet 8.2.18)
    /// The Chip Erase instruction sets all memory within the device to the erased
    /// state of all 1s (FFh). This takes tens of seconds on larger parts, so the
    /// configured timeout has to allow for it.
    pub fn chip_erase(&mut self) -> Result<(), Error<SPI>> {
        self.ensure_enabled()?;
        debug!("erasing whole chip");
        self.write_enable()?;
        self.command(&frame(Opcode::ChipErase, None))?;
        self.wait_for_status(Status::WIP, Status::empty())
    }

    /// From datasheet section 8.2.6 (Read Data (03h))
    /// Reads flash contents into `buf`, starting at `addr`, in a single
    /// transaction. An empty `buf` does not touch the bus.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI>> {
        self.ensure_enabled()?;
        self.check_range(addr, buf.len())?;
        self.read_raw(addr, buf)
    }

    /// Reads `len` bytes starting at `addr` into the front of `buffer`.
    pub fn read_into(&mut self, addr: u32, buffer: &mut [u8], len: usize) -> Result<(), Error<SPI>> {
        let buf = buffer.get_mut(..len).ok_or(Error::OutOfRange)?;
        self.read(addr, buf)
    }

    /// Programs `data` at `addr`, running the verification passes selected by
    /// `mode`.
    ///
    /// The target range should have been erased; NOR cells can only go from
    /// 1 to 0. A failed pre-verify leaves the flash untouched.
    pub fn write(
        &mut self,
        addr: u32,
        data: &[u8],
        mode: VerifyMode,
    ) -> Result<WriteOutcome, Error<SPI>> {
        self.write_range(addr, data, mode, ..)
    }

    /// Like [`write`](Self::write), but only the `range` part of `data` is
    /// written, starting at `addr`.
    pub fn write_range<R>(
        &mut self,
        addr: u32,
        data: &[u8],
        mode: VerifyMode,
        range: R,
    ) -> Result<WriteOutcome, Error<SPI>>
    where
        R: RangeBounds<usize>,
    {
        self.ensure_enabled()?;
        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n.checked_add(1).ok_or(Error::OutOfRange)?,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&n) => n.checked_add(1).ok_or(Error::OutOfRange)?,
            Bound::Excluded(&n) => n,
            Bound::Unbounded => data.len(),
        };
        let data = data.get(start..end).ok_or(Error::OutOfRange)?;
        self.check_range(addr, data.len())?;

        if mode.contains(VerifyMode::PRE_VERIFY) && !self.preverify(addr, data)? {
            warn!("pre-verify failed at {:#x}, flash needs erasing", addr);
            return Ok(WriteOutcome::PreVerifyFailed);
        }
        self.program(addr, data)?;
        if mode.contains(VerifyMode::POST_VERIFY) && !self.postverify(addr, data)? {
            warn!("post-verify failed at {:#x}", addr);
            return Ok(WriteOutcome::PostVerifyFailed);
        }
        Ok(WriteOutcome::Written)
    }

    pub(crate) fn ensure_enabled(&self) -> Result<(), Error<SPI>> {
        match self.state {
            DeviceState::Enabled => Ok(()),
            DeviceState::Disabled => Err(Error::NotEnabled),
        }
    }

    /// Checks that `addr..addr + len` lies inside the device.
    pub(crate) fn check_range(&self, addr: u32, len: usize) -> Result<(), Error<SPI>> {
        let end = u64::from(addr) + len as u64;
        if end > u64::from(self.config.capacity()) {
            return Err(Error::OutOfRange);
        }
        Ok(())
    }

    /// Reads without state or range checks.
    pub(crate) fn read_raw(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI>> {
        if buf.is_empty() {
            return Ok(());
        }
        self.command_with_response(&frame(Opcode::Read, Some(addr)), buf)
    }

    /// Writes a command to the SPI bus
    pub(crate) fn command(&mut self, cmd: &Frame) -> Result<(), Error<SPI>> {
        self.spi
            .transaction(&mut [Operation::Write(cmd.as_bytes())])
            .map_err(Error::Spi)
    }

    /// Writes a command to the SPI bus and reads the response into `response`
    /// while chip select is still asserted.
    pub(crate) fn command_with_response(
        &mut self,
        cmd: &Frame,
        response: &mut [u8],
    ) -> Result<(), Error<SPI>> {
        self.spi
            .transaction(&mut [Operation::Write(cmd.as_bytes()), Operation::Read(response)])
            .map_err(Error::Spi)
    }
}
