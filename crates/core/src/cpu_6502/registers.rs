//! Programmer-visible 6502 registers.

use serde::{Deserialize, Serialize};

pub const FLAG_C: u8 = 0x01;
pub const FLAG_Z: u8 = 0x02;
pub const FLAG_I: u8 = 0x04;
pub const FLAG_D: u8 = 0x08;
pub const FLAG_B: u8 = 0x10;
pub const FLAG_U: u8 = 0x20;
pub const FLAG_V: u8 = 0x40;
pub const FLAG_N: u8 = 0x80;

/// Processor status (NV-BDIZC) kept as individual flags.
///
/// Bit 5 has no storage: it reads back as 1 in every byte produced by
/// [`Status::to_byte`]. `break_flag` is not a latch either; it remembers the
/// B bit of the most recent status push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub carry: bool,
    pub zero: bool,
    pub interrupt_disable: bool,
    pub decimal: bool,
    pub break_flag: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl Status {
    /// Byte as pushed to the stack. `brk` selects the B bit (BRK/PHP vs IRQ/NMI).
    pub fn to_byte(self, brk: bool) -> u8 {
        let mut v = FLAG_U;
        if self.carry {
            v |= FLAG_C;
        }
        if self.zero {
            v |= FLAG_Z;
        }
        if self.interrupt_disable {
            v |= FLAG_I;
        }
        if self.decimal {
            v |= FLAG_D;
        }
        if brk {
            v |= FLAG_B;
        }
        if self.overflow {
            v |= FLAG_V;
        }
        if self.negative {
            v |= FLAG_N;
        }
        v
    }

    /// Load from a byte pulled off the stack (PLP/RTI). B and bit 5 are ignored.
    pub fn from_byte(v: u8) -> Self {
        Self {
            carry: v & FLAG_C != 0,
            zero: v & FLAG_Z != 0,
            interrupt_disable: v & FLAG_I != 0,
            decimal: v & FLAG_D != 0,
            break_flag: false,
            overflow: v & FLAG_V != 0,
            negative: v & FLAG_N != 0,
        }
    }

    #[inline]
    pub fn set_zn(&mut self, v: u8) {
        self.zero = v == 0;
        self.negative = v & 0x80 != 0;
    }
}

/// A, X, Y, S, PC and P.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Accumulator register
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (points to 0x0100 + s)
    pub s: u8,
    /// Program counter
    pub pc: u16,
    /// Status register
    pub p: Status,
}

impl Registers {
    /// Power-on contents before the reset sequence runs.
    ///
    /// S starts at 0 so the three suppressed pushes of RESET leave it at 0xFD.
    pub fn power_on() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0x00,
            pc: 0x0000,
            p: Status {
                zero: true,
                interrupt_disable: true,
                ..Status::default()
            },
        }
    }

    /// Address of the current top-of-stack slot.
    #[inline]
    pub fn stack_addr(&self) -> u16 {
        0x0100 | self.s as u16
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::power_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushed_status_always_has_bit5() {
        let p = Status::default();
        assert_eq!(p.to_byte(false), FLAG_U);
        assert_eq!(p.to_byte(true), FLAG_U | FLAG_B);
    }

    #[test]
    fn status_byte_roundtrip_drops_b() {
        let p = Status::from_byte(0xFF);
        assert!(p.carry && p.zero && p.interrupt_disable && p.decimal);
        assert!(p.overflow && p.negative);
        assert!(!p.break_flag);
        assert_eq!(p.to_byte(false), 0xEF);
    }

    #[test]
    fn stack_wraps_within_page_one() {
        let r = Registers {
            s: 0xFF,
            ..Registers::power_on()
        };
        assert_eq!(r.stack_addr(), 0x01FF);
        let r = Registers { s: 0x00, ..r };
        assert_eq!(r.stack_addr(), 0x0100);
    }
}
