//! Simulated 25-series chip and clock for the unit tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{ErrorKind, ErrorType, Mode, Operation, SpiDevice};

use crate::traits::{Clock, ConfigureBus};
use crate::{PAGE_SIZE, SECTOR_SIZE};

/// A NOR array behind an `SpiDevice`. Each call to `transaction` is one
/// chip-select window.
#[derive(Debug)]
pub struct SimFlash {
    pub memory: Vec<u8>,
    pub wel: bool,
    /// Number of upcoming status reads that still report WIP.
    pub busy_polls: u32,
    /// WIP reads as set forever.
    pub stuck_busy: bool,
    /// WIP sticks after the first program or erase.
    pub stuck_busy_after_program: bool,
    /// Status reads taken by each program or erase.
    pub busy_cycles: u32,
    pub ignore_write_enable: bool,
    /// Status bits outside WIP and WEL.
    pub extra_status: u8,
    pub powered_down: bool,
    pub jedec_id: [u8; 3],
    /// Fail any transaction starting with this opcode.
    pub fail_opcode: Option<u8>,
    /// Bytes written during each transaction, in order.
    pub transactions: Vec<Vec<u8>>,
    pub clock_hz: u32,
    pub mode: Option<Mode>,
}

impl SimFlash {
    pub const MAX_CLOCK_HZ: u32 = 50_000_000;

    pub fn new(capacity: u32) -> Self {
        Self {
            memory: vec![0xFF; capacity as usize],
            wel: false,
            busy_polls: 0,
            stuck_busy: false,
            stuck_busy_after_program: false,
            busy_cycles: 2,
            ignore_write_enable: false,
            extra_status: 0,
            powered_down: true,
            jedec_id: [0xEF, 0x40, 0x18],
            fail_opcode: None,
            transactions: Vec::new(),
            clock_hz: 1_000_000,
            mode: None,
        }
    }

    fn status(&mut self) -> u8 {
        let busy = self.stuck_busy || self.busy_polls > 0;
        self.busy_polls = self.busy_polls.saturating_sub(1);
        let mut status = self.extra_status & !0b11;
        if busy {
            status |= 0b01;
        }
        if self.wel {
            status |= 0b10;
        }
        status
    }

    fn start_cycle(&mut self) {
        self.wel = false;
        self.busy_polls = self.busy_cycles;
        if self.stuck_busy_after_program {
            self.stuck_busy = true;
        }
    }

    fn address(tx: &[u8]) -> usize {
        (usize::from(tx[1]) << 16) | (usize::from(tx[2]) << 8) | usize::from(tx[3])
    }

    /// Applies a command that only writes.
    fn execute(&mut self, tx: &[u8]) {
        let busy = self.stuck_busy || self.busy_polls > 0;
        match tx[0] {
            0x06 if !self.ignore_write_enable => self.wel = true,
            0xB9 => self.powered_down = true,
            0xAB => self.powered_down = false,
            0x02 if self.wel && !busy => {
                let addr = Self::address(tx);
                let page = addr & !(PAGE_SIZE as usize - 1);
                for (i, byte) in tx[4..].iter().enumerate() {
                    // Page program wraps inside the page.
                    let at = page + (addr + i) % PAGE_SIZE as usize;
                    self.memory[at] &= byte;
                }
                self.start_cycle();
            }
            0x20 if self.wel && !busy => {
                let addr = Self::address(tx) & !(SECTOR_SIZE as usize - 1);
                self.memory[addr..addr + SECTOR_SIZE as usize].fill(0xFF);
                self.start_cycle();
            }
            0xC7 if self.wel && !busy => {
                self.memory.fill(0xFF);
                self.start_cycle();
            }
            _ => {}
        }
    }
}

impl ErrorType for SimFlash {
    type Error = ErrorKind;
}

impl SpiDevice for SimFlash {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut tx = Vec::new();
        for op in operations.iter() {
            if let Operation::Write(bytes) = op {
                tx.extend_from_slice(bytes);
            }
        }
        if tx.is_empty() {
            return Err(ErrorKind::Other);
        }
        if self.fail_opcode == Some(tx[0]) {
            return Err(ErrorKind::Other);
        }
        self.transactions.push(tx.clone());

        let read_len: usize = operations
            .iter()
            .map(|op| match op {
                Operation::Read(buf) => buf.len(),
                _ => 0,
            })
            .sum();
        let mut response: Vec<u8> = match tx[0] {
            0x05 => vec![self.status()],
            0x9F => self.jedec_id.to_vec(),
            0x03 => {
                let addr = Self::address(&tx);
                self.memory.iter().skip(addr).take(read_len).copied().collect()
            }
            _ => {
                self.execute(&tx);
                Vec::new()
            }
        };
        response.reverse();
        for op in operations.iter_mut() {
            if let Operation::Read(buf) = op {
                for byte in buf.iter_mut() {
                    *byte = response.pop().unwrap_or(0xFF);
                }
            }
        }
        Ok(())
    }
}

impl ConfigureBus for SimFlash {
    fn set_clock(&mut self, mode: Mode, hz: u32) -> u32 {
        self.mode = Some(mode);
        self.clock_hz = hz.min(Self::MAX_CLOCK_HZ);
        self.clock_hz
    }
}

/// Time only moves when the driver sleeps.
#[derive(Debug, Default)]
pub struct SimClock {
    elapsed_ns: u64,
}

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns += u64::from(ms) * 1_000_000;
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}
