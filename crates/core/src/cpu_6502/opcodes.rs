//! Instruction descriptor table.
//!
//! One entry per opcode byte. The core never branches on raw opcode values;
//! it looks up the [`Descriptor`] once during the fetch cycle and drives the
//! addressing sequence from `mode`, the bus access pattern from
//! [`Op::access`] and the page-crossing tick from `page_penalty`.

use std::fmt;

/// Operation performed once the operand (if any) is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    // Undocumented, stable
    Alr,
    Anc,
    Arr,
    Dcp,
    Isc,
    Jam,
    Lax,
    Rla,
    Rra,
    Sax,
    Sbx,
    Slo,
    Sre,
    // Undocumented, unstable on real silicon
    Ahx,
    Las,
    Lxa,
    Shx,
    Shy,
    Tas,
    Xaa,
}

/// Addressing mode, which fixes the shape of the bus sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Implied
    Imp,
    /// Accumulator
    Acc,
    /// #imm
    Imm,
    /// zp
    Zp,
    /// zp,X
    Zpx,
    /// zp,Y
    Zpy,
    /// abs
    Abs,
    /// abs,X
    Abx,
    /// abs,Y
    Aby,
    /// (abs), JMP only
    Ind,
    /// (zp,X)
    Izx,
    /// (zp),Y
    Izy,
    /// Branch offset
    Rel,
}

impl Mode {
    /// Operand bytes following the opcode.
    pub fn operand_len(self) -> u8 {
        match self {
            Mode::Imp | Mode::Acc => 0,
            Mode::Imm | Mode::Zp | Mode::Zpx | Mode::Zpy | Mode::Izx | Mode::Izy | Mode::Rel => 1,
            Mode::Abs | Mode::Abx | Mode::Aby | Mode::Ind => 2,
        }
    }
}

/// How an operation touches its effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reads the operand (loads, ALU ops, compares, operand NOPs)
    Read,
    /// Writes a register-derived value
    Write,
    /// Read, dummy write, real write
    Modify,
    /// Has its own fixed sequence (stack, jumps, branches, implied ops)
    Special,
}

/// Opcode classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeClass {
    /// Part of the published instruction set
    Documented,
    /// Undocumented with behaviour stable across NMOS parts, emulated
    Undocumented,
    /// Undocumented and chip-dependent; traps unless configured to run as NOP
    Unimplemented,
}

/// One row of the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub op: Op,
    pub mode: Mode,
    /// Cycles taken when no page is crossed and no branch is taken
    pub cycles: u8,
    /// Indexed reads and branches: one more cycle only when a page is crossed.
    /// Indexed modes without the flag always spend the fix-up cycle.
    pub page_penalty: bool,
    pub class: OpcodeClass,
}

impl Op {
    pub fn access(self) -> Access {
        use Op::*;
        match self {
            Adc | And | Bit | Cmp | Cpx | Cpy | Eor | Lda | Ldx | Ldy | Nop | Ora | Sbc | Alr
            | Anc | Arr | Lax | Sbx | Las | Lxa | Xaa => Access::Read,
            Sta | Stx | Sty | Sax | Ahx | Shx | Shy | Tas => Access::Write,
            Asl | Lsr | Rol | Ror | Inc | Dec | Slo | Rla | Sre | Rra | Dcp | Isc => Access::Modify,
            _ => Access::Special,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        use Op::*;
        match self {
            Adc => "ADC",
            And => "AND",
            Asl => "ASL",
            Bcc => "BCC",
            Bcs => "BCS",
            Beq => "BEQ",
            Bit => "BIT",
            Bmi => "BMI",
            Bne => "BNE",
            Bpl => "BPL",
            Brk => "BRK",
            Bvc => "BVC",
            Bvs => "BVS",
            Clc => "CLC",
            Cld => "CLD",
            Cli => "CLI",
            Clv => "CLV",
            Cmp => "CMP",
            Cpx => "CPX",
            Cpy => "CPY",
            Dec => "DEC",
            Dex => "DEX",
            Dey => "DEY",
            Eor => "EOR",
            Inc => "INC",
            Inx => "INX",
            Iny => "INY",
            Jmp => "JMP",
            Jsr => "JSR",
            Lda => "LDA",
            Ldx => "LDX",
            Ldy => "LDY",
            Lsr => "LSR",
            Nop => "NOP",
            Ora => "ORA",
            Pha => "PHA",
            Php => "PHP",
            Pla => "PLA",
            Plp => "PLP",
            Rol => "ROL",
            Ror => "ROR",
            Rti => "RTI",
            Rts => "RTS",
            Sbc => "SBC",
            Sec => "SEC",
            Sed => "SED",
            Sei => "SEI",
            Sta => "STA",
            Stx => "STX",
            Sty => "STY",
            Tax => "TAX",
            Tay => "TAY",
            Tsx => "TSX",
            Txa => "TXA",
            Txs => "TXS",
            Tya => "TYA",
            Alr => "ALR",
            Anc => "ANC",
            Arr => "ARR",
            Dcp => "DCP",
            Isc => "ISC",
            Jam => "JAM",
            Lax => "LAX",
            Rla => "RLA",
            Rra => "RRA",
            Sax => "SAX",
            Sbx => "SBX",
            Slo => "SLO",
            Sre => "SRE",
            Ahx => "AHX",
            Las => "LAS",
            Lxa => "LXA",
            Shx => "SHX",
            Shy => "SHY",
            Tas => "TAS",
            Xaa => "XAA",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

/// Look up the descriptor for an opcode byte.
#[inline]
pub fn descriptor(opcode: u8) -> &'static Descriptor {
    &table::TABLE[opcode as usize]
}

/// Same addressing mode and cycle budget, but no effect. Used when an
/// unimplemented opcode is configured to behave as a NOP.
pub fn as_nop(desc: &Descriptor) -> Descriptor {
    Descriptor {
        op: Op::Nop,
        ..*desc
    }
}

mod table {
    use super::Mode::*;
    use super::Op::*;
    use super::{Descriptor, Mode, Op, OpcodeClass};

    const fn d(op: Op, mode: Mode, cycles: u8, page_penalty: bool) -> Descriptor {
        Descriptor {
            op,
            mode,
            cycles,
            page_penalty,
            class: OpcodeClass::Documented,
        }
    }

    const fn u(op: Op, mode: Mode, cycles: u8, page_penalty: bool) -> Descriptor {
        Descriptor {
            op,
            mode,
            cycles,
            page_penalty,
            class: OpcodeClass::Undocumented,
        }
    }

    const fn x(op: Op, mode: Mode, cycles: u8, page_penalty: bool) -> Descriptor {
        Descriptor {
            op,
            mode,
            cycles,
            page_penalty,
            class: OpcodeClass::Unimplemented,
        }
    }

    const JAM: Descriptor = u(Jam, Imp, 2, false);

    #[rustfmt::skip]
    pub(super) static TABLE: [Descriptor; 256] = [
        // 0x00
        d(Brk, Imp, 7, false), d(Ora, Izx, 6, false), JAM,                    u(Slo, Izx, 8, false),
        u(Nop, Zp, 3, false),  d(Ora, Zp, 3, false),  d(Asl, Zp, 5, false),   u(Slo, Zp, 5, false),
        d(Php, Imp, 3, false), d(Ora, Imm, 2, false), d(Asl, Acc, 2, false),  u(Anc, Imm, 2, false),
        u(Nop, Abs, 4, false), d(Ora, Abs, 4, false), d(Asl, Abs, 6, false),  u(Slo, Abs, 6, false),
        // 0x10
        d(Bpl, Rel, 2, true),  d(Ora, Izy, 5, true),  JAM,                    u(Slo, Izy, 8, false),
        u(Nop, Zpx, 4, false), d(Ora, Zpx, 4, false), d(Asl, Zpx, 6, false),  u(Slo, Zpx, 6, false),
        d(Clc, Imp, 2, false), d(Ora, Aby, 4, true),  u(Nop, Imp, 2, false),  u(Slo, Aby, 7, false),
        u(Nop, Abx, 4, true),  d(Ora, Abx, 4, true),  d(Asl, Abx, 7, false),  u(Slo, Abx, 7, false),
        // 0x20
        d(Jsr, Abs, 6, false), d(And, Izx, 6, false), JAM,                    u(Rla, Izx, 8, false),
        d(Bit, Zp, 3, false),  d(And, Zp, 3, false),  d(Rol, Zp, 5, false),   u(Rla, Zp, 5, false),
        d(Plp, Imp, 4, false), d(And, Imm, 2, false), d(Rol, Acc, 2, false),  u(Anc, Imm, 2, false),
        d(Bit, Abs, 4, false), d(And, Abs, 4, false), d(Rol, Abs, 6, false),  u(Rla, Abs, 6, false),
        // 0x30
        d(Bmi, Rel, 2, true),  d(And, Izy, 5, true),  JAM,                    u(Rla, Izy, 8, false),
        u(Nop, Zpx, 4, false), d(And, Zpx, 4, false), d(Rol, Zpx, 6, false),  u(Rla, Zpx, 6, false),
        d(Sec, Imp, 2, false), d(And, Aby, 4, true),  u(Nop, Imp, 2, false),  u(Rla, Aby, 7, false),
        u(Nop, Abx, 4, true),  d(And, Abx, 4, true),  d(Rol, Abx, 7, false),  u(Rla, Abx, 7, false),
        // 0x40
        d(Rti, Imp, 6, false), d(Eor, Izx, 6, false), JAM,                    u(Sre, Izx, 8, false),
        u(Nop, Zp, 3, false),  d(Eor, Zp, 3, false),  d(Lsr, Zp, 5, false),   u(Sre, Zp, 5, false),
        d(Pha, Imp, 3, false), d(Eor, Imm, 2, false), d(Lsr, Acc, 2, false),  u(Alr, Imm, 2, false),
        d(Jmp, Abs, 3, false), d(Eor, Abs, 4, false), d(Lsr, Abs, 6, false),  u(Sre, Abs, 6, false),
        // 0x50
        d(Bvc, Rel, 2, true),  d(Eor, Izy, 5, true),  JAM,                    u(Sre, Izy, 8, false),
        u(Nop, Zpx, 4, false), d(Eor, Zpx, 4, false), d(Lsr, Zpx, 6, false),  u(Sre, Zpx, 6, false),
        d(Cli, Imp, 2, false), d(Eor, Aby, 4, true),  u(Nop, Imp, 2, false),  u(Sre, Aby, 7, false),
        u(Nop, Abx, 4, true),  d(Eor, Abx, 4, true),  d(Lsr, Abx, 7, false),  u(Sre, Abx, 7, false),
        // 0x60
        d(Rts, Imp, 6, false), d(Adc, Izx, 6, false), JAM,                    u(Rra, Izx, 8, false),
        u(Nop, Zp, 3, false),  d(Adc, Zp, 3, false),  d(Ror, Zp, 5, false),   u(Rra, Zp, 5, false),
        d(Pla, Imp, 4, false), d(Adc, Imm, 2, false), d(Ror, Acc, 2, false),  u(Arr, Imm, 2, false),
        d(Jmp, Ind, 5, false), d(Adc, Abs, 4, false), d(Ror, Abs, 6, false),  u(Rra, Abs, 6, false),
        // 0x70
        d(Bvs, Rel, 2, true),  d(Adc, Izy, 5, true),  JAM,                    u(Rra, Izy, 8, false),
        u(Nop, Zpx, 4, false), d(Adc, Zpx, 4, false), d(Ror, Zpx, 6, false),  u(Rra, Zpx, 6, false),
        d(Sei, Imp, 2, false), d(Adc, Aby, 4, true),  u(Nop, Imp, 2, false),  u(Rra, Aby, 7, false),
        u(Nop, Abx, 4, true),  d(Adc, Abx, 4, true),  d(Ror, Abx, 7, false),  u(Rra, Abx, 7, false),
        // 0x80
        u(Nop, Imm, 2, false), d(Sta, Izx, 6, false), u(Nop, Imm, 2, false),  u(Sax, Izx, 6, false),
        d(Sty, Zp, 3, false),  d(Sta, Zp, 3, false),  d(Stx, Zp, 3, false),   u(Sax, Zp, 3, false),
        d(Dey, Imp, 2, false), u(Nop, Imm, 2, false), d(Txa, Imp, 2, false),  x(Xaa, Imm, 2, false),
        d(Sty, Abs, 4, false), d(Sta, Abs, 4, false), d(Stx, Abs, 4, false),  u(Sax, Abs, 4, false),
        // 0x90
        d(Bcc, Rel, 2, true),  d(Sta, Izy, 6, false), JAM,                    x(Ahx, Izy, 6, false),
        d(Sty, Zpx, 4, false), d(Sta, Zpx, 4, false), d(Stx, Zpy, 4, false),  u(Sax, Zpy, 4, false),
        d(Tya, Imp, 2, false), d(Sta, Aby, 5, false), d(Txs, Imp, 2, false),  x(Tas, Aby, 5, false),
        x(Shy, Abx, 5, false), d(Sta, Abx, 5, false), x(Shx, Aby, 5, false),  x(Ahx, Aby, 5, false),
        // 0xA0
        d(Ldy, Imm, 2, false), d(Lda, Izx, 6, false), d(Ldx, Imm, 2, false),  u(Lax, Izx, 6, false),
        d(Ldy, Zp, 3, false),  d(Lda, Zp, 3, false),  d(Ldx, Zp, 3, false),   u(Lax, Zp, 3, false),
        d(Tay, Imp, 2, false), d(Lda, Imm, 2, false), d(Tax, Imp, 2, false),  x(Lxa, Imm, 2, false),
        d(Ldy, Abs, 4, false), d(Lda, Abs, 4, false), d(Ldx, Abs, 4, false),  u(Lax, Abs, 4, false),
        // 0xB0
        d(Bcs, Rel, 2, true),  d(Lda, Izy, 5, true),  JAM,                    u(Lax, Izy, 5, true),
        d(Ldy, Zpx, 4, false), d(Lda, Zpx, 4, false), d(Ldx, Zpy, 4, false),  u(Lax, Zpy, 4, false),
        d(Clv, Imp, 2, false), d(Lda, Aby, 4, true),  d(Tsx, Imp, 2, false),  x(Las, Aby, 4, true),
        d(Ldy, Abx, 4, true),  d(Lda, Abx, 4, true),  d(Ldx, Aby, 4, true),   u(Lax, Aby, 4, true),
        // 0xC0
        d(Cpy, Imm, 2, false), d(Cmp, Izx, 6, false), u(Nop, Imm, 2, false),  u(Dcp, Izx, 8, false),
        d(Cpy, Zp, 3, false),  d(Cmp, Zp, 3, false),  d(Dec, Zp, 5, false),   u(Dcp, Zp, 5, false),
        d(Iny, Imp, 2, false), d(Cmp, Imm, 2, false), d(Dex, Imp, 2, false),  u(Sbx, Imm, 2, false),
        d(Cpy, Abs, 4, false), d(Cmp, Abs, 4, false), d(Dec, Abs, 6, false),  u(Dcp, Abs, 6, false),
        // 0xD0
        d(Bne, Rel, 2, true),  d(Cmp, Izy, 5, true),  JAM,                    u(Dcp, Izy, 8, false),
        u(Nop, Zpx, 4, false), d(Cmp, Zpx, 4, false), d(Dec, Zpx, 6, false),  u(Dcp, Zpx, 6, false),
        d(Cld, Imp, 2, false), d(Cmp, Aby, 4, true),  u(Nop, Imp, 2, false),  u(Dcp, Aby, 7, false),
        u(Nop, Abx, 4, true),  d(Cmp, Abx, 4, true),  d(Dec, Abx, 7, false),  u(Dcp, Abx, 7, false),
        // 0xE0
        d(Cpx, Imm, 2, false), d(Sbc, Izx, 6, false), u(Nop, Imm, 2, false),  u(Isc, Izx, 8, false),
        d(Cpx, Zp, 3, false),  d(Sbc, Zp, 3, false),  d(Inc, Zp, 5, false),   u(Isc, Zp, 5, false),
        d(Inx, Imp, 2, false), d(Sbc, Imm, 2, false), d(Nop, Imp, 2, false),  u(Sbc, Imm, 2, false),
        d(Cpx, Abs, 4, false), d(Sbc, Abs, 4, false), d(Inc, Abs, 6, false),  u(Isc, Abs, 6, false),
        // 0xF0
        d(Beq, Rel, 2, true),  d(Sbc, Izy, 5, true),  JAM,                    u(Isc, Izy, 8, false),
        u(Nop, Zpx, 4, false), d(Sbc, Zpx, 4, false), d(Inc, Zpx, 6, false),  u(Isc, Zpx, 6, false),
        d(Sed, Imp, 2, false), d(Sbc, Aby, 4, true),  u(Nop, Imp, 2, false),  u(Isc, Aby, 7, false),
        u(Nop, Abx, 4, true),  d(Sbc, Abx, 4, true),  d(Inc, Abx, 7, false),  u(Isc, Abx, 7, false),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(class: OpcodeClass) -> usize {
        (0..=255u8)
            .filter(|&op| descriptor(op).class == class)
            .count()
    }

    #[test]
    fn every_opcode_is_classified() {
        assert_eq!(count(OpcodeClass::Documented), 151);
        assert_eq!(count(OpcodeClass::Unimplemented), 8);
        assert_eq!(count(OpcodeClass::Undocumented), 256 - 151 - 8);
    }

    #[test]
    fn spot_check_rows() {
        let lda = descriptor(0xA9);
        assert_eq!((lda.op, lda.mode, lda.cycles), (Op::Lda, Mode::Imm, 2));

        let sta = descriptor(0x9D);
        assert_eq!((sta.op, sta.mode, sta.cycles), (Op::Sta, Mode::Abx, 5));
        assert!(!sta.page_penalty);

        let lda_abx = descriptor(0xBD);
        assert!(lda_abx.page_penalty);

        let jmp = descriptor(0x6C);
        assert_eq!((jmp.op, jmp.mode), (Op::Jmp, Mode::Ind));

        assert_eq!(descriptor(0xEB).op, Op::Sbc);
        assert_eq!(descriptor(0xEB).class, OpcodeClass::Undocumented);
    }

    #[test]
    fn jam_opcodes() {
        let jams: Vec<u8> = (0..=255u8)
            .filter(|&op| descriptor(op).op == Op::Jam)
            .collect();
        assert_eq!(
            jams,
            vec![0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
        );
    }

    #[test]
    fn modify_ops_never_take_page_penalty_shortcut() {
        for op in 0..=255u8 {
            let d = descriptor(op);
            if d.op.access() != Access::Read && d.op.access() != Access::Special {
                assert!(!d.page_penalty, "opcode {op:02X}");
            }
        }
    }

    #[test]
    fn mnemonic_display_pads() {
        assert_eq!(format!("{:<4}|", Op::Lda), "LDA |");
        assert_eq!(Op::Jam.to_string(), "JAM");
    }

    #[test]
    fn operand_lengths() {
        assert_eq!(Mode::Imp.operand_len(), 0);
        assert_eq!(Mode::Izy.operand_len(), 1);
        assert_eq!(Mode::Ind.operand_len(), 2);
    }
}
