//! Assemble a tiny cartridge in memory, run it without a ROM file and dump
//! the debug state.

use pin6502_core::System;
use pin6502_nes::cartridge::{Cartridge, Header, PRG_UNIT};
use pin6502_nes::{NesConfig, NesSystem};

fn main() -> anyhow::Result<()> {
    // LDX #$00; loop: INX; STX $0200; JMP loop
    let program = [0xA2, 0x00, 0xE8, 0x8E, 0x00, 0x02, 0x4C, 0x02, 0x80];

    let header = Header {
        prg_units: 1,
        chr_units: 0,
        flags6: 0,
        flags7: 0,
        prg_ram_units: 0,
        tv_system_byte: 0,
        reserved: [0; 6],
    };
    let mut prg = vec![0u8; PRG_UNIT];
    prg[..program.len()].copy_from_slice(&program);
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;
    let mut image = header.to_bytes().to_vec();
    image.extend_from_slice(&prg);

    let cart = Cartridge::from_bytes(&image)?;
    println!("{}", cart.header.summary());

    let mut sys = NesSystem::new(cart, NesConfig::default());
    let ran = sys.run_cycles(1_000)?;
    println!("Ran {} cycles, $0200 = {:02X}", ran, sys.bus().ram[0x200]);
    println!("{}", serde_json::to_string_pretty(&sys.debug_state())?);
    Ok(())
}
