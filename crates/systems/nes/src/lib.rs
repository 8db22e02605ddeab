//! NES-shaped host for the pin-level 6502: an iNES loader and a CPU memory
//! map with stubbed PPU/APU registers, driven one bus cycle at a time.

pub mod bus;
pub mod cartridge;

use bus::NesBus;
use cartridge::{Cartridge, CartridgeError};
use pin6502_core::cpu_6502::{self, Cpu6502, CpuConfig, CpuError, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use pin6502_core::logging::{log, LogCategory, LogLevel};
use pin6502_core::{MountPointInfo, Pins, System};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use cartridge::{ChrMemory, Header, Mirroring};

/// Options for [`NesSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NesConfig {
    pub cpu: CpuConfig,
    /// Make `run_cycles` return early once the CPU jams
    pub stop_on_jam: bool,
}

impl Default for NesConfig {
    fn default() -> Self {
        Self {
            cpu: CpuConfig::ricoh_2a03(),
            stop_on_jam: true,
        }
    }
}

impl NesConfig {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NesError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Cpu(#[from] CpuError),
    #[error("unknown mount point: {0}")]
    UnknownMountPoint(String),
}

const CARTRIDGE_SLOT: &str = "Cartridge";

pub struct NesSystem {
    cpu: Cpu6502,
    bus: NesBus,
    pins: Pins,
    config: NesConfig,
    /// Drop NMI after the CPU has sampled it once
    nmi_pulse: bool,
}

impl NesSystem {
    pub fn new(cart: Cartridge, config: NesConfig) -> Self {
        let (cpu, pins) = Cpu6502::init(config.cpu);
        Self {
            cpu,
            bus: NesBus::new(cart),
            pins,
            config,
            nmi_pulse: false,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, config: NesConfig) -> Result<Self, NesError> {
        Ok(Self::new(Cartridge::from_path(path)?, config))
    }

    pub fn cpu(&self) -> &Cpu6502 {
        &self.cpu
    }

    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    /// Pins of the last serviced bus cycle.
    pub fn pins(&self) -> Pins {
        self.pins
    }

    pub fn config(&self) -> &NesConfig {
        &self.config
    }

    /// One bus cycle: tick the CPU, then service its request on the bus.
    pub fn tick(&mut self) -> Result<Pins, NesError> {
        let pins = self.cpu.tick(self.pins)?;
        self.pins = pins.service(&mut self.bus);
        if self.nmi_pulse {
            self.pins.nmi = false;
            self.nmi_pulse = false;
        }
        Ok(self.pins)
    }

    /// Run until the next opcode fetch has been serviced. Returns the ticks taken.
    pub fn step_instruction(&mut self) -> Result<u32, NesError> {
        let (pins, ticks) = cpu_6502::step_instruction(&mut self.cpu, self.pins, &mut self.bus)?;
        self.pins = pins;
        if self.nmi_pulse {
            self.pins.nmi = false;
            self.nmi_pulse = false;
        }
        Ok(ticks)
    }

    /// Raise NMI for one tick, producing a single edge.
    pub fn trigger_nmi(&mut self) {
        self.pins.nmi = true;
        self.nmi_pulse = true;
    }

    /// Drive the NMI line as a level; the CPU reacts to the rising edge.
    pub fn set_nmi(&mut self, level: bool) {
        self.pins.nmi = level;
        self.nmi_pulse = false;
    }

    pub fn set_irq(&mut self, level: bool) {
        self.pins.irq = level;
    }

    /// Continue past a trapped opcode as a NOP. See [`Cpu6502::resume_as_nop`].
    pub fn resume_as_nop(&mut self) -> bool {
        self.cpu.resume_as_nop()
    }

    pub fn debug_state(&self) -> serde_json::Value {
        let bus = &self.bus;
        let ram_nonzero = bus.ram.iter().filter(|&&b| b != 0).count();
        serde_json::json!({
            "system": "nes",
            "cpu": self.cpu.state(),
            "pins": {
                "addr": self.pins.addr,
                "data": self.pins.data,
                "rw": self.pins.rw,
                "sync": self.pins.sync,
                "irq": self.pins.irq,
                "nmi": self.pins.nmi,
                "word": self.pins.to_word(),
            },
            "cartridge": {
                "mapper": bus.mapper(),
                "prg_rom_len": bus.prg_rom().len(),
                "chr_len": bus.chr().len(),
                "chr_is_ram": bus.chr_is_ram(),
                "mirroring": bus.mirroring(),
            },
            "vectors": {
                "nmi": bus.peek_vector(NMI_VECTOR),
                "reset": bus.peek_vector(RESET_VECTOR),
                "irq": bus.peek_vector(IRQ_VECTOR),
            },
            "ppu_stub": {
                "ctrl": bus.ppu_register(0),
                "mask": bus.ppu_register(1),
            },
            "io_stub": {
                "apu_status": bus.io_register(0x4015),
                "joypad_strobe": bus.io_register(0x4016),
                "frame_counter": bus.io_register(0x4017),
            },
            "zero_page": &bus.ram[..0x100],
            "ram_nonzero": ram_nonzero,
        })
    }
}

impl System for NesSystem {
    type Error = NesError;

    fn reset(&mut self) {
        log(LogCategory::Interrupts, LogLevel::Info, || {
            "NES: RESET requested".to_string()
        });
        self.pins.res = true;
    }

    fn run_cycles(&mut self, cycles: u64) -> Result<u64, Self::Error> {
        for done in 1..=cycles {
            self.tick()?;
            if self.config.stop_on_jam && self.cpu.is_jammed() {
                return Ok(done);
            }
        }
        Ok(cycles)
    }

    fn debug_state(&self) -> serde_json::Value {
        NesSystem::debug_state(self)
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        vec![MountPointInfo {
            id: CARTRIDGE_SLOT.to_string(),
            name: "Cartridge Slot".to_string(),
            extensions: vec!["nes".to_string()],
            required: true,
        }]
    }

    /// Swap the cartridge and power-cycle the CPU.
    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        if mount_point_id != CARTRIDGE_SLOT {
            return Err(NesError::UnknownMountPoint(mount_point_id.to_string()));
        }
        let cart = Cartridge::from_bytes(data)?;
        *self = NesSystem::new(cart, self.config);
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        mount_point_id == CARTRIDGE_SLOT
    }
}
