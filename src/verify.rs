use bitflags::bitflags;
use embedded_hal::spi::SpiDevice;

use crate::device::FlashDevice;
use crate::error::Error;
use crate::traits::Clock;

/// Largest read issued by a single verification step.
pub const VERIFY_WINDOW: usize = 512;

bitflags! {
    /// Verification passes run around a write.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VerifyMode: u8 {
        /// Check that the existing contents can be programmed to the new data.
        const PRE_VERIFY = 1 << 0;
        /// Read the data back after programming.
        const POST_VERIFY = 1 << 1;
    }
}

impl VerifyMode {
    pub const NONE: Self = Self::empty();
}

/// How a write that hit no bus or protocol error ended.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteOutcome {
    Written,
    /// The target range holds 0 bits where the data has 1 bits. Nothing was
    /// programmed; erase the sector and retry.
    PreVerifyFailed,
    /// The data was programmed but reads back differently.
    PostVerifyFailed,
}

/// Programming can only clear bits, so `new` is reachable from `existing`
/// when every 1 bit of `new` is still 1 in `existing`.
fn programmable(existing: u8, new: u8) -> bool {
    existing & new == new
}

impl<SPI, T> FlashDevice<SPI, T>
where
    SPI: SpiDevice,
    T: Clock,
{
    /// Checks whether `expected` can be programmed at `addr` without erasing.
    pub fn preverify(&mut self, addr: u32, expected: &[u8]) -> Result<bool, Error<SPI>> {
        self.compare(addr, expected, programmable)
    }

    /// Checks that the flash at `addr` holds exactly `expected`.
    pub fn postverify(&mut self, addr: u32, expected: &[u8]) -> Result<bool, Error<SPI>> {
        self.compare(addr, expected, |existing, new| existing == new)
    }

    /// Reads the flash behind `expected` window by window and stops at the
    /// first byte for which `accept(flash, expected)` is false.
    fn compare<F>(&mut self, addr: u32, expected: &[u8], accept: F) -> Result<bool, Error<SPI>>
    where
        F: Fn(u8, u8) -> bool,
    {
        self.ensure_enabled()?;
        self.check_range(addr, expected.len())?;

        let mut window = [0u8; VERIFY_WINDOW];
        let mut window_addr = addr;
        for want in expected.chunks(VERIFY_WINDOW) {
            let have = &mut window[..want.len()];
            self.read_raw(window_addr, have)?;
            if let Some(i) = have.iter().zip(want).position(|(&h, &w)| !accept(h, w)) {
                debug!(
                    "mismatch at {:#x}: flash {:#x}, data {:#x}",
                    window_addr + i as u32,
                    have[i],
                    want[i]
                );
                return Ok(false);
            }
            window_addr += want.len() as u32;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::sim::{SimClock, SimFlash};

    fn enabled() -> FlashDevice<SimFlash, SimClock> {
        let config = Config::default().with_blocks(1);
        let mut flash = FlashDevice::new(
            SimFlash::new(config.capacity()),
            SimClock::default(),
            config,
        );
        flash.enable().unwrap();
        flash.spi.transactions.clear();
        flash
    }

    fn reads(flash: &FlashDevice<SimFlash, SimClock>) -> usize {
        flash.spi.transactions.iter().filter(|t| t[0] == 0x03).count()
    }

    #[test]
    fn programmable_bits() {
        assert!(!programmable(0x0F, 0xF0));
        assert!(programmable(0xFF, 0x0F));
        assert!(programmable(0x0F, 0x0F));
        assert!(programmable(0x0F, 0x00));
        assert!(!programmable(0x00, 0x01));
    }

    #[test]
    fn preverify_rejects_setting_bits() {
        let mut flash = enabled();
        flash.spi.memory[0x20] = 0x0F;
        assert!(!flash.preverify(0x20, &[0xF0]).unwrap());
        flash.spi.memory[0x20] = 0xFF;
        assert!(flash.preverify(0x20, &[0x0F]).unwrap());
    }

    #[test]
    fn postverify_needs_exact_match() {
        let mut flash = enabled();
        flash.spi.memory[0x30..0x33].copy_from_slice(&[1, 2, 3]);
        assert!(flash.postverify(0x30, &[1, 2, 3]).unwrap());
        assert!(!flash.postverify(0x30, &[1, 2, 4]).unwrap());
    }

    #[test]
    fn large_buffers_are_read_in_windows() {
        let mut flash = enabled();
        let data = vec![0xFFu8; 1300];
        assert!(flash.preverify(0x100, &data).unwrap());
        assert_eq!(reads(&flash), 3);
        assert_eq!(flash.spi.transactions[0], vec![0x03, 0x00, 0x01, 0x00]);
        assert_eq!(flash.spi.transactions[1], vec![0x03, 0x00, 0x03, 0x00]);
        assert_eq!(flash.spi.transactions[2], vec![0x03, 0x00, 0x05, 0x00]);
    }

    #[test]
    fn mismatch_stops_early() {
        let mut flash = enabled();
        flash.spi.memory[0x10] = 0x00;
        let data = vec![0xFFu8; 2048];
        assert!(!flash.postverify(0, &data).unwrap());
        assert_eq!(reads(&flash), 1);
    }

    #[test]
    fn mismatch_in_a_later_window() {
        let mut flash = enabled();
        flash.spi.memory[1000] = 0x7F;
        let data = vec![0xFFu8; 1200];
        assert!(!flash.postverify(0, &data).unwrap());
        assert_eq!(reads(&flash), 2);
    }

    #[test]
    fn verify_checks_state_and_range() {
        let mut flash = enabled();
        assert!(matches!(
            flash.preverify(0xFFFF, &[0, 0]),
            Err(Error::OutOfRange)
        ));
        flash.disable().unwrap();
        assert!(matches!(flash.postverify(0, &[0]), Err(Error::NotEnabled)));
    }

    #[test]
    fn empty_buffers_verify() {
        let mut flash = enabled();
        assert!(flash.preverify(0x10, &[]).unwrap());
        assert!(flash.postverify(0x10, &[]).unwrap());
        assert_eq!(reads(&flash), 0);
    }
}
