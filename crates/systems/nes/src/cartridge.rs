//! iNES container loader.
//!
//! Parses the 16-byte header, then pulls the optional trainer, PRG ROM and
//! CHR ROM out of the stream in that order. Every region is read with its
//! exact size; a short stream is reported as the region that came up short.

use pin6502_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

pub const HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_UNIT: usize = 16 * 1024;
pub const CHR_UNIT: usize = 8 * 1024;
/// CHR RAM a board provides when the image carries no CHR ROM.
pub const CHR_RAM_LEN: usize = 0x2000;

const MAGIC: [u8; 4] = *b"NES\x1A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TvSystem {
    Ntsc,
    Pal,
}

/// Why a header was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("stream ended after {0} of 16 header bytes")]
    Short(usize),
    #[error("bad magic {0:02X?}, expected \"NES\\x1A\"")]
    BadMagic([u8; 4]),
    #[error("PRG ROM size is zero")]
    EmptyPrg,
}

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("invalid iNES header: {0}")]
    InvalidHeader(#[from] HeaderError),
    #[error("trainer truncated: expected {expected} bytes, found {found}")]
    TruncatedTrainer { expected: usize, found: usize },
    #[error("PRG ROM truncated: expected {expected} bytes, found {found}")]
    TruncatedPrg { expected: usize, found: usize },
    #[error("CHR ROM truncated: expected {expected} bytes, found {found}")]
    TruncatedChr { expected: usize, found: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CartridgeError {
    /// Loader stage that failed, for diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            CartridgeError::InvalidHeader(_) => "header",
            CartridgeError::TruncatedTrainer { .. } => "trainer",
            CartridgeError::TruncatedPrg { .. } => "PRG",
            CartridgeError::TruncatedChr { .. } => "CHR",
            CartridgeError::Io(_) => "I/O",
        }
    }

    /// Malformed container, as opposed to a container cut short.
    pub fn is_format_error(&self) -> bool {
        matches!(self, CartridgeError::InvalidHeader(_))
    }
}

/// The 16-byte iNES header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// PRG ROM size in 16 KiB units
    pub prg_units: u8,
    /// CHR ROM size in 8 KiB units; 0 means the board has CHR RAM
    pub chr_units: u8,
    pub flags6: u8,
    pub flags7: u8,
    /// PRG RAM size in 8 KiB units (0 is read as one unit by most boards)
    pub prg_ram_units: u8,
    pub tv_system_byte: u8,
    /// Bytes 10-15, kept as found
    pub reserved: [u8; 6],
}

impl Header {
    /// Validate and decode the first 16 bytes of an image.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self, HeaderError> {
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != MAGIC {
            return Err(HeaderError::BadMagic(magic));
        }
        if bytes[4] == 0 {
            return Err(HeaderError::EmptyPrg);
        }
        let mut reserved = [0u8; 6];
        reserved.copy_from_slice(&bytes[10..16]);
        Ok(Self {
            prg_units: bytes[4],
            chr_units: bytes[5],
            flags6: bytes[6],
            flags7: bytes[7],
            prg_ram_units: bytes[8],
            tv_system_byte: bytes[9],
            reserved,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&MAGIC);
        out[4] = self.prg_units;
        out[5] = self.chr_units;
        out[6] = self.flags6;
        out[7] = self.flags7;
        out[8] = self.prg_ram_units;
        out[9] = self.tv_system_byte;
        out[10..].copy_from_slice(&self.reserved);
        out
    }

    pub fn mapper(&self) -> u8 {
        (self.flags7 & 0xF0) | (self.flags6 >> 4)
    }

    pub fn prg_len(&self) -> usize {
        self.prg_units as usize * PRG_UNIT
    }

    pub fn chr_len(&self) -> usize {
        self.chr_units as usize * CHR_UNIT
    }

    pub fn has_battery(&self) -> bool {
        self.flags6 & 0x02 != 0
    }

    pub fn has_trainer(&self) -> bool {
        self.flags6 & 0x04 != 0
    }

    pub fn mirroring(&self) -> Mirroring {
        if self.flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if self.flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    pub fn tv_system(&self) -> TvSystem {
        if self.tv_system_byte & 0x01 != 0 {
            TvSystem::Pal
        } else {
            TvSystem::Ntsc
        }
    }

    /// Flags 7 bits 2-3 equal to 0b10 mark an NES 2.0 header. Only the iNES
    /// fields are decoded either way.
    pub fn is_nes2(&self) -> bool {
        self.flags7 & 0x0C == 0x08
    }

    /// Human-readable report of the header fields.
    pub fn summary(&self) -> HeaderSummary<'_> {
        HeaderSummary(self)
    }
}

/// `Display` adapter returned by [`Header::summary`].
pub struct HeaderSummary<'a>(&'a Header);

impl fmt::Display for HeaderSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.0;
        let yes_no = |b: bool| if b { "Yes" } else { "No" };
        writeln!(f, "PRG ROM: {} KB", h.prg_len() / 1024)?;
        if h.chr_units == 0 {
            writeln!(f, "CHR ROM: none (8 KB CHR RAM)")?;
        } else {
            writeln!(f, "CHR ROM: {} KB", h.chr_len() / 1024)?;
        }
        writeln!(f, "Mapper: {}", h.mapper())?;
        writeln!(f, "Mirroring: {:?}", h.mirroring())?;
        writeln!(f, "Battery: {}", yes_no(h.has_battery()))?;
        writeln!(f, "Trainer: {}", yes_no(h.has_trainer()))?;
        write!(
            f,
            "Format: {}, {:?}",
            if h.is_nes2() { "NES 2.0" } else { "iNES" },
            h.tv_system()
        )
    }
}

/// Pattern memory as the image describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChrMemory {
    Rom(Vec<u8>),
    /// No CHR ROM in the image; the board supplies `size` bytes of RAM
    Ram { size: usize },
}

impl ChrMemory {
    pub fn is_ram(&self) -> bool {
        matches!(self, ChrMemory::Ram { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            ChrMemory::Rom(rom) => rom.len(),
            ChrMemory::Ram { size } => *size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Cartridge {
    pub header: Header,
    pub trainer: Option<Vec<u8>>,
    pub prg_rom: Vec<u8>,
    pub chr: ChrMemory,
}

/// Fill `buf` from `r`, returning how many bytes were available.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly `len` bytes, or report how many were found.
fn read_region<R: Read>(r: &mut R, len: usize) -> io::Result<Result<Vec<u8>, usize>> {
    let mut buf = vec![0u8; len];
    let found = read_full(r, &mut buf)?;
    if found < len {
        Ok(Err(found))
    } else {
        Ok(Ok(buf))
    }
}

impl Cartridge {
    /// Parse an iNES image from any byte stream.
    pub fn load<R: Read>(mut reader: R) -> Result<Self, CartridgeError> {
        let mut raw = [0u8; HEADER_LEN];
        let found = read_full(&mut reader, &mut raw)?;
        if found < HEADER_LEN {
            return Err(HeaderError::Short(found).into());
        }
        let header = Header::parse(&raw)?;
        log(LogCategory::Cartridge, LogLevel::Info, || {
            format!(
                "Cartridge: PRG {} KB, CHR {} KB, mapper {}, trainer {}",
                header.prg_len() / 1024,
                header.chr_len() / 1024,
                header.mapper(),
                header.has_trainer()
            )
        });

        let trainer = if header.has_trainer() {
            match read_region(&mut reader, TRAINER_LEN)? {
                Ok(t) => Some(t),
                Err(found) => {
                    return Err(CartridgeError::TruncatedTrainer {
                        expected: TRAINER_LEN,
                        found,
                    })
                }
            }
        } else {
            None
        };

        let prg_rom = read_region(&mut reader, header.prg_len())?.map_err(|found| {
            CartridgeError::TruncatedPrg {
                expected: header.prg_len(),
                found,
            }
        })?;

        let chr = if header.chr_units == 0 {
            log(LogCategory::Cartridge, LogLevel::Debug, || {
                "Cartridge: no CHR ROM, board uses 8 KB CHR RAM".to_string()
            });
            ChrMemory::Ram { size: CHR_RAM_LEN }
        } else {
            let rom = read_region(&mut reader, header.chr_len())?.map_err(|found| {
                CartridgeError::TruncatedChr {
                    expected: header.chr_len(),
                    found,
                }
            })?;
            ChrMemory::Rom(rom)
        };

        Ok(Self {
            header,
            trainer,
            prg_rom,
            chr,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CartridgeError> {
        Self::load(bytes)
    }

    /// The file is closed when this returns, on success or failure.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let file = File::open(path)?;
        Self::load(io::BufReader::new(file))
    }

    pub fn mapper(&self) -> u8 {
        self.header.mapper()
    }

    pub fn mirroring(&self) -> Mirroring {
        self.header.mirroring()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a synthetic image; PRG bytes are `0x10 + bank`, CHR bytes `0xC0 + bank`.
    pub(crate) fn image(prg_units: u8, chr_units: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let header = Header {
            prg_units,
            chr_units,
            flags6,
            flags7,
            prg_ram_units: 0,
            tv_system_byte: 0,
            reserved: [0; 6],
        };
        let mut out = header.to_bytes().to_vec();
        if flags6 & 0x04 != 0 {
            out.extend(std::iter::repeat(0x7E).take(TRAINER_LEN));
        }
        for bank in 0..prg_units {
            out.extend(std::iter::repeat(0x10 + bank).take(PRG_UNIT));
        }
        for bank in 0..chr_units {
            out.extend(std::iter::repeat(0xC0 + bank).take(CHR_UNIT));
        }
        out
    }

    #[test]
    fn mapper_number_from_both_nibbles() {
        let cart = Cartridge::from_bytes(&image(1, 1, 0x40, 0x10)).unwrap();
        assert_eq!(cart.mapper(), 0x14);
        let cart = Cartridge::from_bytes(&image(1, 1, 0xF1, 0xA0)).unwrap();
        assert_eq!(cart.mapper(), 0xAF);
        assert_eq!(cart.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn regions_land_in_order() {
        let cart = Cartridge::from_bytes(&image(2, 1, 0x00, 0x00)).unwrap();
        assert_eq!(cart.prg_rom.len(), 2 * PRG_UNIT);
        assert_eq!(cart.prg_rom[0], 0x10);
        assert_eq!(cart.prg_rom[PRG_UNIT], 0x11);
        assert_eq!(cart.chr, ChrMemory::Rom(vec![0xC0; CHR_UNIT]));
        assert!(cart.trainer.is_none());
    }

    #[test]
    fn zero_chr_units_reports_chr_ram() {
        let cart = Cartridge::from_bytes(&image(1, 0, 0x00, 0x00)).unwrap();
        assert_eq!(cart.chr, ChrMemory::Ram { size: 0x2000 });
        assert!(cart.chr.is_ram());
    }

    #[test]
    fn trainer_is_kept_and_skipped() {
        let cart = Cartridge::from_bytes(&image(1, 1, 0x04, 0x00)).unwrap();
        let trainer = cart.trainer.expect("trainer");
        assert_eq!(trainer.len(), TRAINER_LEN);
        assert!(trainer.iter().all(|&b| b == 0x7E));
        assert_eq!(cart.prg_rom[0], 0x10);
    }

    #[test]
    fn bad_magic() {
        let mut bytes = image(1, 1, 0, 0);
        bytes[3] = 0x1B;
        let err = Cartridge::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::InvalidHeader(HeaderError::BadMagic(_))
        ));
        assert_eq!(err.stage(), "header");
        assert!(err.is_format_error());
    }

    #[test]
    fn short_header() {
        let err = Cartridge::from_bytes(b"NES\x1A\x01").unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::InvalidHeader(HeaderError::Short(5))
        ));
    }

    #[test]
    fn empty_prg_rejected() {
        let err = Cartridge::from_bytes(&image(0, 1, 0, 0)).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::InvalidHeader(HeaderError::EmptyPrg)
        ));
    }

    #[test]
    fn truncation_names_the_region() {
        let full = image(1, 1, 0x04, 0x00);

        let err = Cartridge::from_bytes(&full[..HEADER_LEN + 100]).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::TruncatedTrainer {
                expected: 512,
                found: 100
            }
        ));

        let cut = HEADER_LEN + TRAINER_LEN + 1000;
        let err = Cartridge::from_bytes(&full[..cut]).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::TruncatedPrg {
                expected: PRG_UNIT,
                found: 1000
            }
        ));
        assert_eq!(err.stage(), "PRG");

        let err = Cartridge::from_bytes(&full[..full.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::TruncatedChr {
                expected: CHR_UNIT,
                found: 8191
            }
        ));
        assert!(!err.is_format_error());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = image(1, 0, 0, 0);
        bytes.extend_from_slice(&[0xFF; 32]);
        let cart = Cartridge::from_bytes(&bytes).unwrap();
        assert_eq!(cart.prg_rom.len(), PRG_UNIT);
    }

    #[test]
    fn header_flags() {
        let mut raw = [0u8; HEADER_LEN];
        raw[..4].copy_from_slice(b"NES\x1A");
        raw[4] = 2;
        raw[6] = 0x0A;
        raw[7] = 0x08;
        raw[9] = 0x01;
        raw[12] = 0x55;
        let h = Header::parse(&raw).unwrap();
        assert!(h.has_battery());
        assert!(!h.has_trainer());
        assert_eq!(h.mirroring(), Mirroring::FourScreen);
        assert_eq!(h.tv_system(), TvSystem::Pal);
        assert!(h.is_nes2());
        assert_eq!(h.reserved[2], 0x55);
        assert_eq!(h.to_bytes(), raw);
    }

    #[test]
    fn summary_report() {
        let bytes = image(2, 0, 0x12, 0x00);
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&bytes[..HEADER_LEN]);
        let h = Header::parse(&raw).unwrap();
        let text = h.summary().to_string();
        assert!(text.contains("PRG ROM: 32 KB"));
        assert!(text.contains("CHR RAM"));
        assert!(text.contains("Mapper: 1"));
        assert!(text.contains("Battery: Yes"));
        assert!(text.contains("Trainer: No"));
    }

    #[test]
    fn from_path_missing_file_is_io() {
        let err = Cartridge::from_path("/nonexistent/rom.nes").unwrap_err();
        assert!(matches!(err, CartridgeError::Io(_)));
    }
}
