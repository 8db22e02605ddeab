//! Instruction effects. Nothing here touches the bus; the sequencer in
//! `mod.rs` hands operands in and takes results out.

use super::opcodes::Op;
use super::Cpu6502;

impl Cpu6502 {
    fn decimal_active(&self) -> bool {
        self.config.bcd_enabled && self.regs.p.decimal
    }

    /// Effect of a read-type instruction on operand `v`.
    pub(super) fn execute_read(&mut self, op: Op, v: u8) {
        match op {
            Op::Lda => {
                self.regs.a = v;
                self.regs.p.set_zn(v);
            }
            Op::Ldx => {
                self.regs.x = v;
                self.regs.p.set_zn(v);
            }
            Op::Ldy => {
                self.regs.y = v;
                self.regs.p.set_zn(v);
            }
            Op::Lax => {
                self.regs.a = v;
                self.regs.x = v;
                self.regs.p.set_zn(v);
            }
            Op::And => {
                self.regs.a &= v;
                self.regs.p.set_zn(self.regs.a);
            }
            Op::Ora => {
                self.regs.a |= v;
                self.regs.p.set_zn(self.regs.a);
            }
            Op::Eor => {
                self.regs.a ^= v;
                self.regs.p.set_zn(self.regs.a);
            }
            Op::Adc => self.adc(v),
            Op::Sbc => self.sbc(v),
            Op::Cmp => self.compare(self.regs.a, v),
            Op::Cpx => self.compare(self.regs.x, v),
            Op::Cpy => self.compare(self.regs.y, v),
            Op::Bit => {
                self.regs.p.zero = self.regs.a & v == 0;
                self.regs.p.overflow = v & 0x40 != 0;
                self.regs.p.negative = v & 0x80 != 0;
            }
            Op::Anc => {
                self.regs.a &= v;
                self.regs.p.set_zn(self.regs.a);
                self.regs.p.carry = self.regs.p.negative;
            }
            Op::Alr => {
                let t = self.regs.a & v;
                self.regs.a = self.lsr(t);
            }
            Op::Arr => self.arr(v),
            Op::Sbx => {
                let t = self.regs.a & self.regs.x;
                self.regs.p.carry = t >= v;
                self.regs.x = t.wrapping_sub(v);
                self.regs.p.set_zn(self.regs.x);
            }
            // Operand NOPs still perform their reads.
            _ => {}
        }
    }

    /// Effect of a read-modify-write instruction; returns the byte to store.
    pub(super) fn execute_modify(&mut self, op: Op, v: u8) -> u8 {
        match op {
            Op::Asl => self.asl(v),
            Op::Lsr => self.lsr(v),
            Op::Rol => self.rol(v),
            Op::Ror => self.ror(v),
            Op::Inc => {
                let r = v.wrapping_add(1);
                self.regs.p.set_zn(r);
                r
            }
            Op::Dec => {
                let r = v.wrapping_sub(1);
                self.regs.p.set_zn(r);
                r
            }
            Op::Slo => {
                let r = self.asl(v);
                self.execute_read(Op::Ora, r);
                r
            }
            Op::Rla => {
                let r = self.rol(v);
                self.execute_read(Op::And, r);
                r
            }
            Op::Sre => {
                let r = self.lsr(v);
                self.execute_read(Op::Eor, r);
                r
            }
            Op::Rra => {
                let r = self.ror(v);
                self.adc(r);
                r
            }
            Op::Dcp => {
                let r = v.wrapping_sub(1);
                self.compare(self.regs.a, r);
                r
            }
            Op::Isc => {
                let r = v.wrapping_add(1);
                self.sbc(r);
                r
            }
            _ => v,
        }
    }

    /// Value a store-type instruction drives onto the data bus.
    pub(super) fn store_value(&self, op: Op) -> u8 {
        match op {
            Op::Sta => self.regs.a,
            Op::Stx => self.regs.x,
            Op::Sty => self.regs.y,
            Op::Sax => self.regs.a & self.regs.x,
            _ => 0,
        }
    }

    /// Register and flag instructions that need no operand.
    pub(super) fn execute_implied(&mut self, op: Op) {
        let r = &mut self.regs;
        match op {
            Op::Tax => {
                r.x = r.a;
                r.p.set_zn(r.x);
            }
            Op::Tay => {
                r.y = r.a;
                r.p.set_zn(r.y);
            }
            Op::Txa => {
                r.a = r.x;
                r.p.set_zn(r.a);
            }
            Op::Tya => {
                r.a = r.y;
                r.p.set_zn(r.a);
            }
            Op::Tsx => {
                r.x = r.s;
                r.p.set_zn(r.x);
            }
            // TXS leaves the flags alone
            Op::Txs => r.s = r.x,
            Op::Inx => {
                r.x = r.x.wrapping_add(1);
                r.p.set_zn(r.x);
            }
            Op::Iny => {
                r.y = r.y.wrapping_add(1);
                r.p.set_zn(r.y);
            }
            Op::Dex => {
                r.x = r.x.wrapping_sub(1);
                r.p.set_zn(r.x);
            }
            Op::Dey => {
                r.y = r.y.wrapping_sub(1);
                r.p.set_zn(r.y);
            }
            Op::Clc => r.p.carry = false,
            Op::Sec => r.p.carry = true,
            Op::Cli => r.p.interrupt_disable = false,
            Op::Sei => r.p.interrupt_disable = true,
            Op::Clv => r.p.overflow = false,
            Op::Cld => r.p.decimal = false,
            Op::Sed => r.p.decimal = true,
            Op::Asl => self.regs.a = self.asl(self.regs.a),
            Op::Lsr => self.regs.a = self.lsr(self.regs.a),
            Op::Rol => self.regs.a = self.rol(self.regs.a),
            Op::Ror => self.regs.a = self.ror(self.regs.a),
            _ => {}
        }
    }

    /// Branch condition for the relative-mode instructions.
    pub(super) fn branch_taken(&self, op: Op) -> bool {
        let p = &self.regs.p;
        match op {
            Op::Bpl => !p.negative,
            Op::Bmi => p.negative,
            Op::Bvc => !p.overflow,
            Op::Bvs => p.overflow,
            Op::Bcc => !p.carry,
            Op::Bcs => p.carry,
            Op::Bne => !p.zero,
            Op::Beq => p.zero,
            _ => false,
        }
    }

    fn asl(&mut self, v: u8) -> u8 {
        let r = v << 1;
        self.regs.p.carry = v & 0x80 != 0;
        self.regs.p.set_zn(r);
        r
    }

    fn lsr(&mut self, v: u8) -> u8 {
        let r = v >> 1;
        self.regs.p.carry = v & 0x01 != 0;
        self.regs.p.set_zn(r);
        r
    }

    fn rol(&mut self, v: u8) -> u8 {
        let r = (v << 1) | u8::from(self.regs.p.carry);
        self.regs.p.carry = v & 0x80 != 0;
        self.regs.p.set_zn(r);
        r
    }

    fn ror(&mut self, v: u8) -> u8 {
        let r = (v >> 1) | (u8::from(self.regs.p.carry) << 7);
        self.regs.p.carry = v & 0x01 != 0;
        self.regs.p.set_zn(r);
        r
    }

    fn compare(&mut self, reg: u8, v: u8) {
        self.regs.p.carry = reg >= v;
        self.regs.p.set_zn(reg.wrapping_sub(v));
    }

    fn adc(&mut self, v: u8) {
        if self.decimal_active() {
            self.adc_decimal(v);
        } else {
            self.adc_binary(v);
        }
    }

    fn sbc(&mut self, v: u8) {
        if self.decimal_active() {
            self.sbc_decimal(v);
        } else {
            self.adc_binary(!v);
        }
    }

    fn adc_binary(&mut self, v: u8) {
        let a = self.regs.a;
        let sum = a as u16 + v as u16 + u16::from(self.regs.p.carry);
        let result = sum as u8;
        self.regs.p.carry = sum > 0xFF;
        // overflow: both operands share a sign that the result lacks
        self.regs.p.overflow = (!(a ^ v) & (a ^ result)) & 0x80 != 0;
        self.regs.a = result;
        self.regs.p.set_zn(result);
    }

    /// NMOS decimal add: Z comes from the binary sum, N and V from the
    /// intermediate high nibble.
    fn adc_decimal(&mut self, v: u8) {
        let a = self.regs.a;
        let carry = u8::from(self.regs.p.carry);

        let mut lo = (a & 0x0F) + (v & 0x0F) + carry;
        if lo > 9 {
            lo += 6;
        }
        let mut hi = (a >> 4) + (v >> 4) + u8::from(lo > 0x0F);

        let binary = a.wrapping_add(v).wrapping_add(carry);
        self.regs.p.zero = binary == 0;
        self.regs.p.negative = hi & 0x08 != 0;
        let intermediate = (hi << 4) | (lo & 0x0F);
        self.regs.p.overflow = (!(a ^ v) & (a ^ intermediate)) & 0x80 != 0;

        if hi > 9 {
            hi += 6;
        }
        self.regs.p.carry = hi > 0x0F;
        self.regs.a = (hi << 4) | (lo & 0x0F);
    }

    /// NMOS decimal subtract: every flag follows the binary difference.
    fn sbc_decimal(&mut self, v: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.carry);

        let binary = i16::from(a) - i16::from(v) - borrow;
        let bin8 = binary as u8;
        self.regs.p.carry = binary >= 0;
        self.regs.p.set_zn(bin8);
        self.regs.p.overflow = ((a ^ v) & (a ^ bin8)) & 0x80 != 0;

        let mut lo = i16::from(a & 0x0F) - i16::from(v & 0x0F) - borrow;
        let mut hi = i16::from(a >> 4) - i16::from(v >> 4);
        if lo < 0 {
            lo -= 6;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 6;
        }
        self.regs.a = ((hi << 4) as u8) | ((lo & 0x0F) as u8);
    }

    /// AND then rotate right, with the adder's odd flag behaviour.
    fn arr(&mut self, v: u8) {
        let t = self.regs.a & v;
        let carry_in = u8::from(self.regs.p.carry);
        let mut r = (t >> 1) | (carry_in << 7);

        if self.decimal_active() {
            self.regs.p.negative = carry_in != 0;
            self.regs.p.zero = r == 0;
            self.regs.p.overflow = (t ^ r) & 0x40 != 0;
            if (t & 0x0F) + (t & 0x01) > 5 {
                r = (r & 0xF0) | (r.wrapping_add(6) & 0x0F);
            }
            let carry = u16::from(t & 0xF0) + u16::from(t & 0x10) > 0x50;
            if carry {
                r = r.wrapping_add(0x60);
            }
            self.regs.p.carry = carry;
        } else {
            self.regs.p.set_zn(r);
            self.regs.p.carry = r & 0x40 != 0;
            self.regs.p.overflow = ((r >> 6) ^ (r >> 5)) & 0x01 != 0;
        }
        self.regs.a = r;
    }
}

#[cfg(test)]
mod tests {
    use super::super::{CpuConfig, Cpu6502};
    use super::*;

    fn cpu(bcd: bool) -> Cpu6502 {
        let config = CpuConfig {
            bcd_enabled: bcd,
            ..CpuConfig::default()
        };
        Cpu6502::init(config).0
    }

    #[test]
    fn adc_sets_carry_and_overflow() {
        let mut c = cpu(true);
        c.regs.a = 0x7F;
        c.regs.p.carry = false;
        c.execute_read(Op::Adc, 0x01);
        assert_eq!(c.regs.a, 0x80);
        assert!(c.regs.p.overflow);
        assert!(c.regs.p.negative);
        assert!(!c.regs.p.carry);

        c.regs.a = 0xFF;
        c.regs.p.carry = false;
        c.execute_read(Op::Adc, 0x01);
        assert_eq!(c.regs.a, 0x00);
        assert!(c.regs.p.carry);
        assert!(c.regs.p.zero);
        assert!(!c.regs.p.overflow);
    }

    #[test]
    fn sbc_binary_borrow() {
        let mut c = cpu(true);
        c.regs.a = 0x50;
        c.regs.p.carry = true;
        c.execute_read(Op::Sbc, 0xB0);
        assert_eq!(c.regs.a, 0xA0);
        assert!(c.regs.p.overflow);
        assert!(!c.regs.p.carry);
    }

    #[test]
    fn decimal_adc_and_sbc() {
        let mut c = cpu(true);
        c.regs.p.decimal = true;
        c.regs.a = 0x15;
        c.regs.p.carry = false;
        c.execute_read(Op::Adc, 0x27);
        assert_eq!(c.regs.a, 0x42);
        assert!(!c.regs.p.carry);

        c.regs.a = 0x99;
        c.regs.p.carry = false;
        c.execute_read(Op::Adc, 0x01);
        assert_eq!(c.regs.a, 0x00);
        assert!(c.regs.p.carry);

        c.regs.a = 0x42;
        c.regs.p.carry = true;
        c.execute_read(Op::Sbc, 0x15);
        assert_eq!(c.regs.a, 0x27);
        assert!(c.regs.p.carry);

        c.regs.a = 0x00;
        c.regs.p.carry = true;
        c.execute_read(Op::Sbc, 0x01);
        assert_eq!(c.regs.a, 0x99);
        assert!(!c.regs.p.carry);
    }

    #[test]
    fn decimal_flag_ignored_without_bcd() {
        let mut c = cpu(false);
        c.regs.p.decimal = true;
        c.regs.a = 0x15;
        c.regs.p.carry = false;
        c.execute_read(Op::Adc, 0x27);
        assert_eq!(c.regs.a, 0x3C);
    }

    #[test]
    fn compare_sets_carry_on_greater_or_equal() {
        let mut c = cpu(true);
        c.regs.a = 0x40;
        c.execute_read(Op::Cmp, 0x40);
        assert!(c.regs.p.carry && c.regs.p.zero);
        c.execute_read(Op::Cmp, 0x41);
        assert!(!c.regs.p.carry && c.regs.p.negative);
    }

    #[test]
    fn bit_copies_high_bits() {
        let mut c = cpu(true);
        c.regs.a = 0x01;
        c.execute_read(Op::Bit, 0xC0);
        assert!(c.regs.p.zero);
        assert!(c.regs.p.overflow);
        assert!(c.regs.p.negative);
    }

    #[test]
    fn rotates_go_through_carry() {
        let mut c = cpu(true);
        c.regs.p.carry = true;
        assert_eq!(c.execute_modify(Op::Rol, 0x80), 0x01);
        assert!(c.regs.p.carry);
        assert_eq!(c.execute_modify(Op::Ror, 0x02), 0x81);
        assert!(!c.regs.p.carry);
    }

    #[test]
    fn combined_undocumented_ops() {
        let mut c = cpu(true);
        c.regs.a = 0x0F;
        assert_eq!(c.execute_modify(Op::Slo, 0x81), 0x02);
        assert!(c.regs.p.carry);
        assert_eq!(c.regs.a, 0x0F);

        c.regs.a = 0x10;
        assert_eq!(c.execute_modify(Op::Dcp, 0x11), 0x10);
        assert!(c.regs.p.zero && c.regs.p.carry);

        c.regs.a = 0xFF;
        c.regs.x = 0x0F;
        c.execute_read(Op::Sbx, 0x05);
        assert_eq!(c.regs.x, 0x0A);
        assert!(c.regs.p.carry);
    }

    #[test]
    fn arr_binary_flags() {
        let mut c = cpu(false);
        c.regs.a = 0xFF;
        c.regs.p.carry = true;
        c.execute_read(Op::Arr, 0xC0);
        assert_eq!(c.regs.a, 0xE0);
        assert!(c.regs.p.carry);
        assert!(!c.regs.p.overflow);
        assert!(c.regs.p.negative);
    }

    #[test]
    fn transfers() {
        let mut c = cpu(true);
        c.regs.a = 0x80;
        c.execute_implied(Op::Tax);
        assert_eq!(c.regs.x, 0x80);
        assert!(c.regs.p.negative);
        c.regs.x = 0x00;
        let before = c.regs.p;
        c.execute_implied(Op::Txs);
        assert_eq!(c.regs.s, 0x00);
        assert_eq!(c.regs.p, before);
    }
}
