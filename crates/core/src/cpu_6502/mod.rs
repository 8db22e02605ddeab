//! Cycle-stepped MOS 6502 core.
//!
//! The CPU is a state machine advanced by [`Cpu6502::tick`]. Each tick takes
//! the pins of the previous bus cycle (with the data bus resolved by the
//! caller) and returns the pins describing the next bus cycle. A
//! two-cycle instruction therefore takes two ticks, a seven-cycle interrupt
//! sequence seven, and so on. The core never touches memory itself.
//!
//! ```rust
//! use pin6502_core::cpu_6502::{Cpu6502, CpuConfig};
//! use pin6502_core::pins::ArrayMemory;
//!
//! let mut mem = ArrayMemory::new();
//! mem.load_program(0x0400, &[0xA9, 0x42]); // LDA #$42
//!
//! let (mut cpu, mut pins) = Cpu6502::init(CpuConfig::default());
//! for _ in 0..9 {
//!     pins = cpu.tick(pins).unwrap().service(&mut mem);
//! }
//! assert_eq!(cpu.regs.a, 0x42);
//! ```

mod alu;
mod config;
pub mod opcodes;
mod registers;


pub use config::{CpuConfig, UndocumentedPolicy};
pub use opcodes::{Access, Descriptor, Mode, Op, OpcodeClass};
pub use registers::{
    Registers, Status, FLAG_B, FLAG_C, FLAG_D, FLAG_I, FLAG_N, FLAG_U, FLAG_V, FLAG_Z,
};

use crate::logging::{log, LogCategory, LogLevel};
use crate::pins::{Memory6502, Pins};
use serde::Serialize;
use thiserror::Error;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Address put on the bus while the CPU is jammed.
const JAM_BUS_ADDR: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    /// An unimplemented opcode was decoded under [`UndocumentedPolicy::Trap`].
    /// `pc` is the address the opcode was fetched from.
    #[error("unimplemented opcode ${opcode:02X} at ${pc:04X}")]
    UnimplementedOpcode { opcode: u8, pc: u16 },
}

/// The four hardware sequences sharing the BRK microcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Interrupt {
    Reset,
    Nmi,
    Irq,
    Brk,
}

/// What the next tick will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// The data bus holds an opcode; the next tick decodes it
    Fetch,
    /// Fetching operands and forming the effective address
    Address,
    /// Reading, writing or modifying the effective address
    Access,
    /// Stack, jump, branch or implied instruction with its own sequence
    Control,
    /// RESET, NMI, IRQ or BRK
    Interrupt(Interrupt),
    /// Halted by a JAM opcode until the next reset
    Jammed,
    /// Stopped on an unimplemented opcode
    Trapped { opcode: u8, pc: u16 },
}

/// Snapshot of the CPU for debuggers and `--save` dumps.
#[derive(Debug, Clone, Serialize)]
pub struct CpuState {
    pub registers: Registers,
    pub phase: Phase,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub step: u8,
    pub cycles: u64,
    pub nmi_pending: bool,
    pub irq_line: bool,
}

pub struct Cpu6502 {
    pub regs: Registers,
    pub config: CpuConfig,
    phase: Phase,
    desc: Descriptor,
    opcode: u8,
    /// Micro-step within the current phase
    step: u8,
    /// Effective address of the current access
    addr: u16,
    /// Low byte latch (operand, pointer target, vector, pulled PCL)
    base: u16,
    /// Zero-page pointer for the indirect modes
    pointer: u8,
    /// Value read by a read-modify-write, held across the dummy write
    latch: u8,
    nmi_line: bool,
    nmi_pending: bool,
    irq_line: bool,
    /// IRQ seen unmasked during the last cycle of the previous instruction
    irq_pending: bool,
    cycles: u64,
}

/// Request a read of `addr` on the next bus cycle.
#[inline]
fn bus_read(pins: &mut Pins, addr: u16) {
    pins.addr = addr;
    pins.rw = true;
}

/// Request a write of `val` to `addr` on the next bus cycle.
#[inline]
fn bus_write(pins: &mut Pins, addr: u16, val: u8) {
    pins.addr = addr;
    pins.data = val;
    pins.rw = false;
}

impl Cpu6502 {
    /// Build a CPU and the pins for its first bus cycle.
    ///
    /// Without `config.registers` the CPU starts at power-on and the first
    /// seven ticks run the reset sequence. With registers supplied the first
    /// tick decodes the opcode fetched from `registers.pc`.
    pub fn init(config: CpuConfig) -> (Self, Pins) {
        let (regs, phase) = match config.registers {
            Some(regs) => (regs, Phase::Fetch),
            None => (Registers::power_on(), Phase::Interrupt(Interrupt::Reset)),
        };
        let cpu = Self {
            regs,
            config,
            phase,
            desc: *opcodes::descriptor(0xEA),
            opcode: 0xEA,
            step: 0,
            addr: 0,
            base: 0,
            pointer: 0,
            latch: 0,
            nmi_line: false,
            nmi_pending: false,
            irq_line: false,
            irq_pending: false,
            cycles: 0,
        };
        let pins = Pins {
            addr: regs.pc,
            rw: true,
            sync: phase == Phase::Fetch,
            ..Pins::default()
        };
        (cpu, pins)
    }

    /// Advance one bus cycle.
    ///
    /// `pins` must be the pins returned by the previous tick, with `data`
    /// filled in if that cycle was a read, and with the interrupt request
    /// lines set however the system currently drives them.
    pub fn tick(&mut self, pins: Pins) -> Result<Pins, CpuError> {
        let mut pins = pins;

        if pins.nmi && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = pins.nmi;
        self.irq_line = pins.irq;
        // I as it stands before this cycle's update, so CLI/SEI/PLP act one
        // instruction late
        let irq_sample = self.irq_line && !self.regs.p.interrupt_disable;

        if pins.res {
            pins.res = false;
            self.start_reset();
        }

        if let Phase::Trapped { opcode, pc } = self.phase {
            return Err(CpuError::UnimplementedOpcode { opcode, pc });
        }

        pins.sync = false;
        let data = pins.data;

        match self.phase {
            // a trapped decode is not counted; resume_as_nop replays it
            Phase::Fetch => self.decode(data, &mut pins)?,
            Phase::Address => self.address_step(data, &mut pins),
            Phase::Access => self.access_step(data, &mut pins),
            Phase::Control => self.control_step(data, &mut pins),
            Phase::Interrupt(kind) => self.interrupt_step(kind, data, &mut pins),
            Phase::Jammed => bus_read(&mut pins, JAM_BUS_ADDR),
            // returned above
            Phase::Trapped { .. } => {}
        }
        self.cycles += 1;
        if pins.sync {
            self.irq_pending = irq_sample;
        }
        Ok(pins)
    }

    /// Continue past a trapped opcode by running it as a NOP of the same
    /// addressing mode. The next tick, given the same pins as the trapped
    /// one, stands in for the decode cycle, so the NOP takes its table cycle
    /// count. Returns `false` when the CPU is not trapped.
    pub fn resume_as_nop(&mut self) -> bool {
        let Phase::Trapped { opcode, pc } = self.phase else {
            return false;
        };
        let desc = opcodes::descriptor(opcode);
        log(LogCategory::Stubs, LogLevel::Warn, || {
            format!(
                "CPU: resuming {} (${:02X}) at {:04X} as NOP, skipping {} operand byte(s)",
                desc.op,
                opcode,
                pc,
                desc.mode.operand_len()
            )
        });
        self.regs.pc = pc.wrapping_add(1);
        self.opcode = opcode;
        self.desc = opcodes::as_nop(desc);
        self.enter_instruction();
        true
    }

    /// Total ticks since init.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_jammed(&self) -> bool {
        self.phase == Phase::Jammed
    }

    /// The opcode and address the CPU is trapped on, if any.
    pub fn trapped(&self) -> Option<(u8, u16)> {
        match self.phase {
            Phase::Trapped { opcode, pc } => Some((opcode, pc)),
            _ => None,
        }
    }

    /// Is an NMI edge latched and waiting for the next instruction boundary?
    pub fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    pub fn state(&self) -> CpuState {
        CpuState {
            registers: self.regs,
            phase: self.phase,
            opcode: self.opcode,
            mnemonic: self.desc.op.mnemonic(),
            step: self.step,
            cycles: self.cycles,
            nmi_pending: self.nmi_pending,
            irq_line: self.irq_line,
        }
    }

    fn start_reset(&mut self) {
        log(LogCategory::Interrupts, LogLevel::Info, || {
            format!("CPU: RESET at cycle {}", self.cycles)
        });
        self.nmi_pending = false;
        self.irq_pending = false;
        self.phase = Phase::Interrupt(Interrupt::Reset);
        self.step = 0;
    }

    /// Emit the opcode fetch at PC; the next tick decodes.
    fn fetch(&mut self, pins: &mut Pins) {
        bus_read(pins, self.regs.pc);
        pins.sync = true;
        self.phase = Phase::Fetch;
        self.step = 0;
    }

    /// Read the next operand byte at PC.
    fn read_operand(&mut self, pins: &mut Pins) {
        bus_read(pins, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
    }

    fn decode(&mut self, opcode: u8, pins: &mut Pins) -> Result<(), CpuError> {
        if self.nmi_pending {
            self.nmi_pending = false;
            self.start_interrupt(Interrupt::Nmi, pins);
            return Ok(());
        }
        if self.irq_pending {
            self.irq_pending = false;
            self.start_interrupt(Interrupt::Irq, pins);
            return Ok(());
        }

        let pc = self.regs.pc;
        let mut desc = *opcodes::descriptor(opcode);
        log(LogCategory::CPU, LogLevel::Trace, || {
            format!(
                "{:04X}  {:02X}  {:<4} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
                pc,
                opcode,
                desc.op,
                self.regs.a,
                self.regs.x,
                self.regs.y,
                self.regs.p.to_byte(false),
                self.regs.s,
                self.cycles
            )
        });

        if desc.class == OpcodeClass::Unimplemented {
            match self.config.undocumented {
                UndocumentedPolicy::Trap => {
                    log(LogCategory::CPU, LogLevel::Error, || {
                        format!("CPU: unimplemented opcode ${:02X} at {:04X}", opcode, pc)
                    });
                    self.opcode = opcode;
                    self.phase = Phase::Trapped { opcode, pc };
                    return Err(CpuError::UnimplementedOpcode { opcode, pc });
                }
                UndocumentedPolicy::Nop => {
                    log(LogCategory::Stubs, LogLevel::Warn, || {
                        format!("CPU: unimplemented opcode ${:02X} at {:04X} run as NOP", opcode, pc)
                    });
                    desc = opcodes::as_nop(&desc);
                }
            }
        }

        self.regs.pc = pc.wrapping_add(1);
        self.opcode = opcode;
        self.desc = desc;
        self.enter_instruction();
        self.run_step(pins);
        Ok(())
    }

    /// Pick the phase for `self.desc` at step 0 without running it.
    fn enter_instruction(&mut self) {
        self.step = 0;
        self.phase = if self.desc.op == Op::Brk {
            Phase::Interrupt(Interrupt::Brk)
        } else if self.desc.op.access() == Access::Special
            || matches!(self.desc.mode, Mode::Imp | Mode::Acc)
        {
            Phase::Control
        } else {
            Phase::Address
        };
    }

    /// Run the current step of the current phase in this tick. Step 0 of
    /// every sequence ignores the data bus.
    fn run_step(&mut self, pins: &mut Pins) {
        match self.phase {
            Phase::Address => self.address_step(0, pins),
            Phase::Control => self.control_step(0, pins),
            Phase::Interrupt(kind) => self.interrupt_step(kind, 0, pins),
            _ => {}
        }
    }

    fn start_interrupt(&mut self, kind: Interrupt, pins: &mut Pins) {
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!("CPU: {:?} at PC={:04X}", kind, self.regs.pc)
        });
        self.phase = Phase::Interrupt(kind);
        self.step = 0;
        self.interrupt_step(kind, 0, pins);
    }

    fn address_step(&mut self, data: u8, pins: &mut Pins) {
        let step = self.step;
        self.step += 1;
        match (self.desc.mode, step) {
            (Mode::Imm, _) => {
                let addr = self.regs.pc;
                self.regs.pc = addr.wrapping_add(1);
                self.begin_access(addr, pins);
            }
            (_, 0) => self.read_operand(pins),

            (Mode::Zp, _) => self.begin_access(data as u16, pins),

            (Mode::Zpx | Mode::Zpy, 1) => {
                // the unindexed zero-page address is read and discarded
                self.pointer = data;
                bus_read(pins, data as u16);
            }
            (Mode::Zpx, _) => {
                let addr = self.pointer.wrapping_add(self.regs.x);
                self.begin_access(addr as u16, pins);
            }
            (Mode::Zpy, _) => {
                let addr = self.pointer.wrapping_add(self.regs.y);
                self.begin_access(addr as u16, pins);
            }

            (Mode::Abs | Mode::Abx | Mode::Aby, 1) => {
                self.base = data as u16;
                self.read_operand(pins);
            }
            (Mode::Abs, _) => {
                let addr = self.base | (data as u16) << 8;
                self.begin_access(addr, pins);
            }
            (Mode::Abx, 2) => {
                let base = self.base | (data as u16) << 8;
                self.index(base, self.regs.x, pins);
            }
            (Mode::Aby, 2) => {
                let base = self.base | (data as u16) << 8;
                self.index(base, self.regs.y, pins);
            }
            (Mode::Abx | Mode::Aby, _) => self.begin_access(self.addr, pins),

            (Mode::Izx, 1) => {
                self.pointer = data;
                bus_read(pins, data as u16);
            }
            (Mode::Izx, 2) => {
                self.pointer = self.pointer.wrapping_add(self.regs.x);
                bus_read(pins, self.pointer as u16);
            }
            (Mode::Izx, 3) => {
                self.base = data as u16;
                bus_read(pins, self.pointer.wrapping_add(1) as u16);
            }
            (Mode::Izx, _) => {
                let addr = self.base | (data as u16) << 8;
                self.begin_access(addr, pins);
            }

            (Mode::Izy, 1) => {
                self.pointer = data;
                bus_read(pins, data as u16);
            }
            (Mode::Izy, 2) => {
                self.base = data as u16;
                bus_read(pins, self.pointer.wrapping_add(1) as u16);
            }
            (Mode::Izy, 3) => {
                let base = self.base | (data as u16) << 8;
                self.index(base, self.regs.y, pins);
            }
            (Mode::Izy, _) => self.begin_access(self.addr, pins),

            // Imp, Acc, Ind and Rel run in the control phase
            _ => self.fetch(pins),
        }
    }

    /// Add an index register to `base`. Without a page crossing, reads with
    /// the page penalty flag go straight to the access. Everything else first
    /// reads from the address with the uncorrected high byte.
    fn index(&mut self, base: u16, index: u8, pins: &mut Pins) {
        let effective = base.wrapping_add(index as u16);
        let crossed = (base ^ effective) & 0xFF00 != 0;
        if self.desc.page_penalty && !crossed {
            self.begin_access(effective, pins);
        } else {
            self.addr = effective;
            bus_read(pins, (base & 0xFF00) | (effective & 0x00FF));
        }
    }

    /// Emit the first bus cycle at the effective address.
    fn begin_access(&mut self, addr: u16, pins: &mut Pins) {
        self.addr = addr;
        self.phase = Phase::Access;
        self.step = 1;
        match self.desc.op.access() {
            Access::Write => {
                let val = self.store_value(self.desc.op);
                bus_write(pins, addr, val);
            }
            _ => bus_read(pins, addr),
        }
    }

    fn access_step(&mut self, data: u8, pins: &mut Pins) {
        let step = self.step;
        self.step += 1;
        match (self.desc.op.access(), step) {
            (Access::Read, _) => {
                self.execute_read(self.desc.op, data);
                self.fetch(pins);
            }
            (Access::Modify, 1) => {
                // the unmodified value is written back first
                self.latch = data;
                bus_write(pins, self.addr, data);
            }
            (Access::Modify, 2) => {
                let result = self.execute_modify(self.desc.op, self.latch);
                bus_write(pins, self.addr, result);
            }
            _ => self.fetch(pins),
        }
    }

    fn control_step(&mut self, data: u8, pins: &mut Pins) {
        let step = self.step;
        self.step += 1;
        let op = self.desc.op;
        match op {
            Op::Jsr => self.jsr(step, data, pins),
            Op::Rts => self.rts(step, data, pins),
            Op::Rti => self.rti(step, data, pins),
            Op::Pha | Op::Php => self.push(op, step, pins),
            Op::Pla | Op::Plp => self.pull(op, step, data, pins),
            Op::Jmp if self.desc.mode == Mode::Ind => self.jmp_indirect(step, data, pins),
            Op::Jmp => self.jmp_absolute(step, data, pins),
            Op::Jam => {
                log(LogCategory::CPU, LogLevel::Warn, || {
                    format!(
                        "CPU: JAM ${:02X} at {:04X}, halted until reset",
                        self.opcode,
                        self.regs.pc.wrapping_sub(1)
                    )
                });
                self.phase = Phase::Jammed;
                bus_read(pins, JAM_BUS_ADDR);
            }
            _ if self.desc.mode == Mode::Rel => self.branch(step, data, pins),
            _ => match step {
                0 => bus_read(pins, self.regs.pc),
                _ => {
                    self.execute_implied(op);
                    self.fetch(pins);
                }
            },
        }
    }

    fn branch(&mut self, step: u8, data: u8, pins: &mut Pins) {
        match step {
            0 => self.read_operand(pins),
            1 => {
                if !self.branch_taken(self.desc.op) {
                    self.fetch(pins);
                    return;
                }
                self.addr = self.regs.pc.wrapping_add(data as i8 as u16);
                bus_read(pins, self.regs.pc);
            }
            2 => {
                let pc = self.regs.pc;
                let crossed = (pc ^ self.addr) & 0xFF00 != 0;
                if self.desc.page_penalty && !crossed {
                    self.regs.pc = self.addr;
                    self.fetch(pins);
                } else {
                    bus_read(pins, (pc & 0xFF00) | (self.addr & 0x00FF));
                }
            }
            _ => {
                self.regs.pc = self.addr;
                self.fetch(pins);
            }
        }
    }

    fn jmp_absolute(&mut self, step: u8, data: u8, pins: &mut Pins) {
        match step {
            0 => self.read_operand(pins),
            1 => {
                self.base = data as u16;
                self.read_operand(pins);
            }
            _ => {
                self.regs.pc = self.base | (data as u16) << 8;
                self.fetch(pins);
            }
        }
    }

    fn jmp_indirect(&mut self, step: u8, data: u8, pins: &mut Pins) {
        match step {
            0 => self.read_operand(pins),
            1 => {
                self.base = data as u16;
                self.read_operand(pins);
            }
            2 => {
                self.addr = self.base | (data as u16) << 8;
                bus_read(pins, self.addr);
            }
            3 => {
                self.base = data as u16;
                // the pointer's high byte comes from the same page
                let hi = (self.addr & 0xFF00) | (self.addr.wrapping_add(1) & 0x00FF);
                bus_read(pins, hi);
            }
            _ => {
                self.regs.pc = self.base | (data as u16) << 8;
                self.fetch(pins);
            }
        }
    }

    fn jsr(&mut self, step: u8, data: u8, pins: &mut Pins) {
        match step {
            0 => self.read_operand(pins),
            1 => {
                self.base = data as u16;
                bus_read(pins, self.regs.stack_addr());
            }
            2 => {
                bus_write(pins, self.regs.stack_addr(), (self.regs.pc >> 8) as u8);
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            3 => {
                bus_write(pins, self.regs.stack_addr(), self.regs.pc as u8);
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            4 => bus_read(pins, self.regs.pc),
            _ => {
                self.regs.pc = self.base | (data as u16) << 8;
                self.fetch(pins);
            }
        }
    }

    fn rts(&mut self, step: u8, data: u8, pins: &mut Pins) {
        match step {
            0 => bus_read(pins, self.regs.pc),
            1 | 2 => {
                bus_read(pins, self.regs.stack_addr());
                self.regs.s = self.regs.s.wrapping_add(1);
            }
            3 => {
                self.base = data as u16;
                bus_read(pins, self.regs.stack_addr());
            }
            4 => {
                self.regs.pc = self.base | (data as u16) << 8;
                self.read_operand(pins);
            }
            _ => self.fetch(pins),
        }
    }

    fn rti(&mut self, step: u8, data: u8, pins: &mut Pins) {
        match step {
            0 => bus_read(pins, self.regs.pc),
            1 | 2 => {
                bus_read(pins, self.regs.stack_addr());
                self.regs.s = self.regs.s.wrapping_add(1);
            }
            3 => {
                self.pull_status(data);
                bus_read(pins, self.regs.stack_addr());
                self.regs.s = self.regs.s.wrapping_add(1);
            }
            4 => {
                self.base = data as u16;
                bus_read(pins, self.regs.stack_addr());
            }
            _ => {
                self.regs.pc = self.base | (data as u16) << 8;
                self.fetch(pins);
            }
        }
    }

    fn push(&mut self, op: Op, step: u8, pins: &mut Pins) {
        match step {
            0 => bus_read(pins, self.regs.pc),
            1 => {
                let val = if op == Op::Php {
                    self.regs.p.break_flag = true;
                    self.regs.p.to_byte(true)
                } else {
                    self.regs.a
                };
                bus_write(pins, self.regs.stack_addr(), val);
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            _ => self.fetch(pins),
        }
    }

    fn pull(&mut self, op: Op, step: u8, data: u8, pins: &mut Pins) {
        match step {
            0 => bus_read(pins, self.regs.pc),
            1 => {
                bus_read(pins, self.regs.stack_addr());
                self.regs.s = self.regs.s.wrapping_add(1);
            }
            2 => bus_read(pins, self.regs.stack_addr()),
            _ => {
                if op == Op::Plp {
                    self.pull_status(data);
                } else {
                    self.regs.a = data;
                    self.regs.p.set_zn(data);
                }
                self.fetch(pins);
            }
        }
    }

    /// PLP/RTI: B and bit 5 of the pulled byte do not exist in the register.
    fn pull_status(&mut self, data: u8) {
        let break_flag = self.regs.p.break_flag;
        self.regs.p = Status::from_byte(data);
        self.regs.p.break_flag = break_flag;
    }

    /// The shared seven-cycle sequence. RESET runs the three stack cycles as
    /// reads, so S still drops by three but memory is left alone.
    fn interrupt_step(&mut self, kind: Interrupt, data: u8, pins: &mut Pins) {
        let step = self.step;
        self.step += 1;
        match step {
            0 => {
                bus_read(pins, self.regs.pc);
                if kind == Interrupt::Brk {
                    // BRK skips its padding byte
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                }
            }
            1 => self.push_or_read(kind, (self.regs.pc >> 8) as u8, pins),
            2 => self.push_or_read(kind, self.regs.pc as u8, pins),
            3 => {
                let brk = kind == Interrupt::Brk;
                let status = self.regs.p.to_byte(brk);
                self.push_or_read(kind, status, pins);
                if kind != Interrupt::Reset {
                    self.regs.p.break_flag = brk;
                }
                self.addr = match kind {
                    Interrupt::Reset => RESET_VECTOR,
                    Interrupt::Nmi => NMI_VECTOR,
                    Interrupt::Irq | Interrupt::Brk if self.nmi_pending => {
                        log(LogCategory::Interrupts, LogLevel::Debug, || {
                            format!("CPU: NMI hijacked {:?} vector", kind)
                        });
                        self.nmi_pending = false;
                        NMI_VECTOR
                    }
                    Interrupt::Irq | Interrupt::Brk => IRQ_VECTOR,
                };
            }
            4 => {
                self.regs.p.interrupt_disable = true;
                bus_read(pins, self.addr);
            }
            5 => {
                self.base = data as u16;
                bus_read(pins, self.addr.wrapping_add(1));
            }
            _ => {
                self.regs.pc = self.base | (data as u16) << 8;
                log(LogCategory::Interrupts, LogLevel::Debug, || {
                    format!(
                        "CPU: {:?} vector {:04X} -> PC={:04X}",
                        kind, self.addr, self.regs.pc
                    )
                });
                self.fetch(pins);
            }
        }
    }

    fn push_or_read(&mut self, kind: Interrupt, val: u8, pins: &mut Pins) {
        let addr = self.regs.stack_addr();
        if kind == Interrupt::Reset {
            bus_read(pins, addr);
        } else {
            bus_write(pins, addr, val);
        }
        self.regs.s = self.regs.s.wrapping_sub(1);
    }
}

/// Tick `cpu` against `mem` until the next opcode fetch has been serviced.
///
/// Returns the pins to pass to the following tick and the number of ticks
/// taken. A jammed CPU stops after one tick.
pub fn step_instruction<M: Memory6502 + ?Sized>(
    cpu: &mut Cpu6502,
    pins: Pins,
    mem: &mut M,
) -> Result<(Pins, u32), CpuError> {
    let mut pins = pins;
    let mut ticks = 0;
    loop {
        pins = cpu.tick(pins)?.service(mem);
        ticks += 1;
        if pins.sync || cpu.is_jammed() {
            return Ok((pins, ticks));
        }
    }
}
