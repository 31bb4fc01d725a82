use crate::BLOCK_SIZE;

/// Device geometry and polling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Number of 64 KiB blocks on the chip.
    pub blocks: u16,
    /// Upper bound for a single write-enable or busy-wait loop.
    pub timeout_ms: u32,
    /// Sleep between two status register reads.
    pub poll_interval_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocks: 64,
            timeout_ms: 10_000,
            poll_interval_ms: 1,
        }
    }
}

impl Config {
    pub const fn with_blocks(mut self, blocks: u16) -> Self {
        self.blocks = blocks;
        self
    }

    pub const fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub const fn with_poll_interval_ms(mut self, poll_interval_ms: u32) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Size of the device in bytes.
    pub const fn capacity(&self) -> u32 {
        self.blocks as u32 * BLOCK_SIZE
    }
}
