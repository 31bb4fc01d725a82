use embedded_hal::delay::DelayNs;
use embedded_hal::spi::Mode;

/// Monotonic millisecond time source used to bound the polling loops.
///
/// The [`DelayNs`] supertrait provides the sleep between two status reads.
pub trait Clock: DelayNs {
    /// Milliseconds since an arbitrary, fixed origin. Must never go backwards.
    fn now_ms(&self) -> u64;
}

/// Implemented by bus handles that can change their clock at runtime.
pub trait ConfigureBus {
    /// Applies `mode` and the closest supported frequency not above `hz`,
    /// returning the frequency actually in effect.
    fn set_clock(&mut self, mode: Mode, hz: u32) -> u32;
}
