use core::fmt::{self, Debug, Display};
use embedded_hal::spi::SpiDevice;
use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// The error type used by this library.
///
/// This can encapsulate an SPI error, and adds its own protocol errors
/// on top of that. Verification mismatches are not errors, see
/// [`WriteOutcome`](crate::WriteOutcome).
pub enum Error<SPI: SpiDevice> {
    /// An SPI transfer failed.
    Spi(SPI::Error),
    /// The device is in deep power-down; call `enable` first.
    NotEnabled,
    /// An erase address is not aligned to a sector.
    SectorBoundary,
    /// The write enable latch did not set before the timeout.
    WriteEnableFailed,
    /// The chip was still busy when the timeout expired.
    StatusTimeout,
    /// Address or length lies outside the device.
    OutOfRange,
}

impl<SPI: SpiDevice> Error<SPI> {
    fn name(&self) -> &'static str {
        match self {
            Error::Spi(_) => "Error::Spi",
            Error::NotEnabled => "Error::NotEnabled",
            Error::SectorBoundary => "Error::SectorBoundary",
            Error::WriteEnableFailed => "Error::WriteEnableFailed",
            Error::StatusTimeout => "Error::StatusTimeout",
            Error::OutOfRange => "Error::OutOfRange",
        }
    }
}

#[cfg(feature = "defmt")]
impl<SPI: SpiDevice> defmt::Format for Error<SPI> {
    fn format(&self, fmt: defmt::Formatter) {
        use embedded_hal::spi::Error as _;

        match self {
            Error::Spi(spi) => defmt::write!(fmt, "Error::Spi({})", spi.kind()),
            other => defmt::write!(fmt, "{=str}", other.name()),
        }
    }
}

impl<SPI: SpiDevice> Debug for Error<SPI> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "Error::Spi({:?})", spi),
            other => f.write_str(other.name()),
        }
    }
}

impl<SPI: SpiDevice> Display for Error<SPI> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "SPI transfer failed: {:?}", spi),
            Error::NotEnabled => f.write_str("flash is powered down"),
            Error::SectorBoundary => f.write_str("address is not sector aligned"),
            Error::WriteEnableFailed => f.write_str("write enable latch did not set"),
            Error::StatusTimeout => f.write_str("timed out waiting for flash to finish"),
            Error::OutOfRange => f.write_str("address out of range"),
        }
    }
}

impl<SPI: SpiDevice> NorFlashError for Error<SPI> {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Error::SectorBoundary => NorFlashErrorKind::NotAligned,
            Error::OutOfRange => NorFlashErrorKind::OutOfBounds,
            _ => NorFlashErrorKind::Other,
        }
    }
}
