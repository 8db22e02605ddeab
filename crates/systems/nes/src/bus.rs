use crate::cartridge::{Cartridge, ChrMemory, Mirroring};
use pin6502_core::logging::{log, LogCategory, LogLevel};
use pin6502_core::Memory6502;

/// PPUSTATUS bit reported on every read so vblank wait loops make progress.
const STATUS_VBLANK: u8 = 0x80;

/// CPU-side NES memory map for an NROM-layout cartridge.
///
/// | range         | target                                    |
/// |---------------|-------------------------------------------|
/// | `0000-1FFF`   | 2 KiB internal RAM, mirrored every 0x800  |
/// | `2000-3FFF`   | 8 PPU register stubs, mirrored            |
/// | `4000-401F`   | APU and I/O register stubs                |
/// | `4020-5FFF`   | unmapped, reads return open bus           |
/// | `6000-7FFF`   | 8 KiB PRG RAM (trainer at `7000`)         |
/// | `8000-FFFF`   | PRG ROM                                   |
#[derive(Debug)]
pub struct NesBus {
    pub ram: [u8; 0x800],
    pub prg_ram: [u8; 0x2000],
    prg_rom: Vec<u8>,
    /// CHR ROM, or the CHR RAM this bus allocated when the image had none
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
    mapper: u8,
    ppu_regs: [u8; 8],
    io_regs: [u8; 0x20],
    /// Last byte seen on the data bus
    open_bus: u8,
}

impl NesBus {
    /// Build the memory map for `cart`. Allocates CHR RAM when the cartridge
    /// reports it and copies a trainer into PRG RAM at 0x7000.
    pub fn new(cart: Cartridge) -> Self {
        let mapper = cart.mapper();
        if mapper != 0 {
            log(LogCategory::Cartridge, LogLevel::Warn, || {
                format!(
                    "Cartridge: mapper {} has no bank switching here, using NROM layout",
                    mapper
                )
            });
        }

        let mut prg_ram = [0u8; 0x2000];
        if let Some(trainer) = &cart.trainer {
            prg_ram[0x1000..0x1000 + trainer.len()].copy_from_slice(trainer);
        }

        let (chr, chr_is_ram) = match cart.chr {
            ChrMemory::Rom(rom) => (rom, false),
            ChrMemory::Ram { size } => (vec![0u8; size], true),
        };

        Self {
            ram: [0; 0x800],
            prg_ram,
            mirroring: cart.header.mirroring(),
            prg_rom: cart.prg_rom,
            chr,
            chr_is_ram,
            mapper,
            ppu_regs: [0; 8],
            io_regs: [0; 0x20],
            open_bus: 0,
        }
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr(&self) -> &[u8] {
        &self.chr
    }

    pub fn chr_is_ram(&self) -> bool {
        self.chr_is_ram
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn mapper(&self) -> u8 {
        self.mapper
    }

    /// Last value written to PPU register `0..8`.
    pub fn ppu_register(&self, reg: usize) -> u8 {
        self.ppu_regs[reg & 7]
    }

    /// Last value written to the APU/IO register at `addr` (`4000-401F`).
    /// These registers are write-only, so the CPU itself never reads this.
    pub fn io_register(&self, addr: u16) -> u8 {
        self.io_regs[(addr & 0x1F) as usize]
    }

    /// Read a vector from PRG ROM without bus side effects.
    pub fn peek_vector(&self, addr: u16) -> u16 {
        let lo = self.read_prg(addr);
        let hi = self.read_prg(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// 0x8000-0xBFFF shows the first 16 KiB bank, 0xC000-0xFFFF the last.
    /// A single 16 KiB bank appears in both windows.
    fn read_prg(&self, addr: u16) -> u8 {
        let len = self.prg_rom.len();
        if len == 0 {
            return 0;
        }
        let window = (addr as usize) & 0x3FFF;
        let off = if addr < 0xC000 {
            window
        } else {
            len.saturating_sub(0x4000) + window
        };
        self.prg_rom[off % len]
    }

    fn read_ppu_stub(&self, addr: u16) -> u8 {
        let reg = (addr & 7) as usize;
        let val = match reg {
            2 => STATUS_VBLANK | (self.open_bus & 0x1F),
            _ => self.ppu_regs[reg],
        };
        log(LogCategory::Stubs, LogLevel::Trace, || {
            format!("Bus: PPU stub read {:04X} (reg {}) -> {:02X}", addr, reg, val)
        });
        val
    }
}

impl Memory6502 for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        let val = match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => self.read_ppu_stub(addr),
            0x4000..=0x401F => {
                log(LogCategory::Stubs, LogLevel::Trace, || {
                    format!("Bus: APU/IO stub read {:04X}", addr)
                });
                // controller ports report "no buttons"
                match addr {
                    0x4016 | 0x4017 => 0x40,
                    _ => self.open_bus,
                }
            }
            0x4020..=0x5FFF => {
                log(LogCategory::Bus, LogLevel::Debug, || {
                    format!("Bus: open bus read {:04X}", addr)
                });
                self.open_bus
            }
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => self.read_prg(addr),
        };
        self.open_bus = val;
        val
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.open_bus = val;
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = val,
            0x2000..=0x3FFF => {
                let reg = (addr & 7) as usize;
                log(LogCategory::Stubs, LogLevel::Trace, || {
                    format!("Bus: PPU stub write {:04X} (reg {}) <- {:02X}", addr, reg, val)
                });
                self.ppu_regs[reg] = val;
            }
            0x4000..=0x401F => {
                log(LogCategory::Stubs, LogLevel::Trace, || {
                    format!("Bus: APU/IO stub write {:04X} <- {:02X}", addr, val)
                });
                self.io_regs[(addr - 0x4000) as usize] = val;
            }
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize] = val,
            _ => {
                log(LogCategory::Bus, LogLevel::Debug, || {
                    format!("Bus: ignored write {:04X} <- {:02X}", addr, val)
                });
            }
        }
    }
}
