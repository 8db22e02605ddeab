//! Pin-level bus protocol between the 6502 core and whatever owns memory.
//!
//! Every call to [`Cpu6502::tick`](crate::cpu_6502::Cpu6502::tick) returns a
//! [`Pins`] value describing exactly one bus cycle. The embedding system must
//! resolve that cycle (supply the byte for a read, accept the byte for a
//! write) before issuing the next tick. The CPU core itself never decodes
//! addresses; [`Pins::service`] is a convenience for embedders that expose
//! their memory map through [`Memory6502`].

use serde::{Deserialize, Serialize};

/// Memory interface for systems embedding the 6502.
///
/// Implementations own all address decoding (RAM mirrors, ROM windows,
/// register files). Reads take `&mut self` because reading a peripheral
/// register often has side effects.
pub trait Memory6502 {
    /// Read a byte from memory at the given address
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte to memory at the given address
    fn write(&mut self, addr: u16, val: u8);
}

const ADDR_MASK: u64 = 0xFFFF;
const DATA_SHIFT: u32 = 16;
const RW_BIT: u64 = 1 << 24;
const SYNC_BIT: u64 = 1 << 25;
const IRQ_BIT: u64 = 1 << 26;
const NMI_BIT: u64 = 1 << 27;
const RES_BIT: u64 = 1 << 28;

/// One bus cycle worth of CPU pins.
///
/// `addr`, `rw`, `sync` and (for writes) `data` are driven by the CPU. The
/// caller drives `data` for reads and the three request lines, which are
/// active-high here even though the real pins are active-low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pins {
    /// Address bus
    pub addr: u16,
    /// Data bus
    pub data: u8,
    /// Read/write line: `true` while the CPU reads
    pub rw: bool,
    /// High during an opcode fetch
    pub sync: bool,
    /// Maskable interrupt request (level-sensitive)
    pub irq: bool,
    /// Non-maskable interrupt request (edge-sensitive)
    pub nmi: bool,
    /// Reset request
    pub res: bool,
}

impl Pins {
    /// Is the CPU asking for a byte this cycle?
    #[inline]
    pub fn is_read(&self) -> bool {
        self.rw
    }

    /// Is the CPU driving a byte onto the data bus this cycle?
    #[inline]
    pub fn is_write(&self) -> bool {
        !self.rw
    }

    /// Resolve this bus cycle against `mem` and return the pins for the next tick.
    pub fn service<M: Memory6502 + ?Sized>(mut self, mem: &mut M) -> Self {
        if self.rw {
            self.data = mem.read(self.addr);
        } else {
            mem.write(self.addr, self.data);
        }
        self
    }

    /// Pack into a 64-bit pin word.
    ///
    /// Layout: address in bits 0-15, data in 16-23, then RW, SYNC, IRQ, NMI
    /// and RES in bits 24-28.
    pub fn to_word(self) -> u64 {
        let mut w = u64::from(self.addr) | (u64::from(self.data) << DATA_SHIFT);
        if self.rw {
            w |= RW_BIT;
        }
        if self.sync {
            w |= SYNC_BIT;
        }
        if self.irq {
            w |= IRQ_BIT;
        }
        if self.nmi {
            w |= NMI_BIT;
        }
        if self.res {
            w |= RES_BIT;
        }
        w
    }

    /// Unpack a pin word produced by [`Pins::to_word`]. Unused bits are ignored.
    pub fn from_word(w: u64) -> Self {
        Self {
            addr: (w & ADDR_MASK) as u16,
            data: (w >> DATA_SHIFT) as u8,
            rw: w & RW_BIT != 0,
            sync: w & SYNC_BIT != 0,
            irq: w & IRQ_BIT != 0,
            nmi: w & NMI_BIT != 0,
            res: w & RES_BIT != 0,
        }
    }
}

/// Flat 64 KiB memory, mostly for tests and benchmarks.
#[derive(Debug)]
pub struct ArrayMemory {
    pub data: Box<[u8; 0x10000]>,
}

impl ArrayMemory {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 0x10000]),
        }
    }

    /// Memory where every byte holds `fill`.
    pub fn filled(fill: u8) -> Self {
        Self {
            data: Box::new([fill; 0x10000]),
        }
    }

    /// Load a program at `offset` and point the reset vector at it.
    pub fn load_program(&mut self, offset: u16, program: &[u8]) {
        let off = offset as usize;
        self.data[off..off + program.len()].copy_from_slice(program);
        self.set_vector(0xFFFC, offset);
    }

    /// Store a little-endian vector at `at`.
    pub fn set_vector(&mut self, at: u16, target: u16) {
        let [lo, hi] = target.to_le_bytes();
        self.data[at as usize] = lo;
        self.data[at.wrapping_add(1) as usize] = hi;
    }
}

impl Default for ArrayMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory6502 for ArrayMemory {
    fn read(&mut self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.data[addr as usize] = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_packing_keeps_every_line() {
        let p = Pins {
            addr: 0xBEEF,
            data: 0x5A,
            rw: true,
            sync: true,
            irq: false,
            nmi: true,
            res: false,
        };
        let w = p.to_word();
        assert_eq!(w & 0xFFFF, 0xBEEF);
        assert_eq!((w >> 16) & 0xFF, 0x5A);
        assert_eq!(Pins::from_word(w), p);
    }

    #[test]
    fn service_read_fills_data_bus() {
        let mut mem = ArrayMemory::new();
        mem.data[0x1234] = 0x99;
        let p = Pins {
            addr: 0x1234,
            rw: true,
            ..Pins::default()
        };
        assert_eq!(p.service(&mut mem).data, 0x99);
    }

    #[test]
    fn service_write_stores_data_bus() {
        let mut mem = ArrayMemory::new();
        let p = Pins {
            addr: 0x0200,
            data: 0x42,
            rw: false,
            ..Pins::default()
        };
        let out = p.service(&mut mem);
        assert_eq!(mem.data[0x0200], 0x42);
        assert!(out.is_write());
    }

    #[test]
    fn load_program_sets_reset_vector() {
        let mut mem = ArrayMemory::new();
        mem.load_program(0x8000, &[0xA9, 0x01]);
        assert_eq!(mem.data[0xFFFC], 0x00);
        assert_eq!(mem.data[0xFFFD], 0x80);
        assert_eq!(mem.data[0x8001], 0x01);
    }
}
