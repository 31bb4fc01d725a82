//! `embedded-storage` traits, so the driver can back any crate written
//! against `NorFlash` (key-value stores, bootloaders).

use embedded_hal::spi::SpiDevice;
use embedded_storage::nor_flash::{ErrorType, MultiwriteNorFlash, NorFlash, ReadNorFlash};

use crate::device::FlashDevice;
use crate::error::Error;
use crate::traits::Clock;
use crate::verify::VerifyMode;
use crate::SECTOR_SIZE;

impl<SPI, T> ErrorType for FlashDevice<SPI, T>
where
    SPI: SpiDevice,
    T: Clock,
{
    type Error = Error<SPI>;
}

impl<SPI, T> ReadNorFlash for FlashDevice<SPI, T>
where
    SPI: SpiDevice,
    T: Clock,
{
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        FlashDevice::read(self, offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.config.capacity() as usize
    }
}

impl<SPI, T> NorFlash for FlashDevice<SPI, T>
where
    SPI: SpiDevice,
    T: Clock,
{
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = SECTOR_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.erase_range(from, to)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        // Unverified writes always end up `Written`.
        let _ = FlashDevice::write(self, offset, bytes, VerifyMode::NONE)?;
        Ok(())
    }
}

/// NOR cells can be programmed again as long as bits only go from 1 to 0.
impl<SPI, T> MultiwriteNorFlash for FlashDevice<SPI, T>
where
    SPI: SpiDevice,
    T: Clock,
{
}
