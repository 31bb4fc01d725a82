//! Blocking driver for 25-series serial NOR flash chips.
//!
//! The driver sits on top of an [`embedded_hal::spi::SpiDevice`], which owns
//! the bus and brackets every command with chip-select, and a [`Clock`] used
//! to bound the status polling loops. It exposes byte-addressable read, sector
//! erase and arbitrary-length writes with optional pre- and post-verification.
//!
//! Refer to datasheet:
//! https://datasheet.lcsc.com/lcsc/1912111437_Winbond-Elec-W25Q128JVSIQ_C113767.pdf
//!
//! ```rust,no_run
//! # fn example<SPI, T>(spi: SPI, clock: T) -> Result<(), spi_nor_flash::Error<SPI>>
//! # where SPI: embedded_hal::spi::SpiDevice, T: spi_nor_flash::Clock {
//! use spi_nor_flash::{Config, FlashDevice, VerifyMode, WriteOutcome};
//!
//! let mut flash = FlashDevice::new(spi, clock, Config::default().with_blocks(64));
//! flash.enable()?;
//! flash.erase_sector(0x1000)?;
//! let outcome = flash.write(0x1010, b"hello", VerifyMode::PRE_VERIFY | VerifyMode::POST_VERIFY)?;
//! assert_eq!(outcome, WriteOutcome::Written);
//!
//! let mut buf = [0u8; 5];
//! flash.read(0x1010, &mut buf)?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

mod command;
mod config;
mod device;
mod error;
mod program;
mod status;
mod storage;
mod traits;
mod verify;

#[cfg(test)]
mod sim;

pub use command::{frame, Frame, Opcode};
pub use config::Config;
pub use device::{DeviceState, FlashDevice};
pub use error::Error;
pub use program::{Chunk, PageChunks};
pub use status::Status;
pub use traits::{Clock, ConfigureBus};
pub use verify::{VerifyMode, WriteOutcome, VERIFY_WINDOW};

/// Largest unit a single Page Program command may write.
pub const PAGE_SIZE: u32 = 256;
/// Smallest erasable unit.
pub const SECTOR_SIZE: u32 = 4096;
/// Device capacity is configured in multiples of this.
pub const BLOCK_SIZE: u32 = 65536;
/// 24-bit addressing limits a device to 16 MiB.
pub const MAX_BLOCKS: u16 = 256;
