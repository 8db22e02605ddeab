use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use pin6502_core::cpu_6502::{CpuError, UndocumentedPolicy};
use pin6502_core::logging::{LogCategory, LogConfig, LogLevel};
use pin6502_core::System;
use pin6502_nes::cartridge::Cartridge;
use pin6502_nes::{NesConfig, NesError, NesSystem};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Unimplemented {
    /// Stop with an error naming the opcode
    Trap,
    /// Execute as a NOP of the same length
    Nop,
}

impl From<Unimplemented> for UndocumentedPolicy {
    fn from(u: Unimplemented) -> Self {
        match u {
            Unimplemented::Trap => UndocumentedPolicy::Trap,
            Unimplemented::Nop => UndocumentedPolicy::Nop,
        }
    }
}

/// Load an iNES image and run its program on the cycle-stepped 6502.
#[derive(Parser, Debug)]
#[command(name = "pin6502", version)]
struct Args {
    /// Path to an iNES (.nes) file
    rom: PathBuf,

    /// Number of bus cycles to run
    #[arg(long, default_value_t = 100_000)]
    cycles: u64,

    /// Print the header report and exit
    #[arg(long, default_value_t = false)]
    header_only: bool,

    /// Log every instruction fetch (CPU category at trace, no rate limit)
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// How to handle the unstable undocumented opcodes
    #[arg(long, value_enum)]
    unimplemented: Option<Unimplemented>,

    /// After a trap, continue as NOP instead of exiting
    #[arg(long, default_value_t = false)]
    resume_traps: bool,

    /// Honour the decimal flag (NMOS 6502 instead of the 2A03)
    #[arg(long, default_value_t = false)]
    bcd: bool,

    /// JSON file with a NesConfig; command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the final debug state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// Global level for core logging (off, error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Level for the CPU category
    #[arg(long)]
    log_cpu: Option<String>,

    /// Level for the Bus category
    #[arg(long)]
    log_bus: Option<String>,

    /// Level for the Interrupts category
    #[arg(long)]
    log_irq: Option<String>,

    /// Level for the Stubs category
    #[arg(long)]
    log_stubs: Option<String>,

    /// Level for the Cartridge category
    #[arg(long)]
    log_cart: Option<String>,

    /// Core log messages per second per category (0 = unlimited)
    #[arg(long)]
    log_rate: Option<usize>,

    /// Write core logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_level(s: &str) -> Result<LogLevel> {
    LogLevel::from_str(s).with_context(|| format!("unknown log level '{}'", s))
}

fn configure_logging(args: &Args) -> Result<()> {
    let config = LogConfig::global();
    if let Some(level) = &args.log_level {
        config.set_global_level(parse_level(level)?);
    }
    let per_category = [
        (LogCategory::CPU, &args.log_cpu),
        (LogCategory::Bus, &args.log_bus),
        (LogCategory::Interrupts, &args.log_irq),
        (LogCategory::Stubs, &args.log_stubs),
        (LogCategory::Cartridge, &args.log_cart),
    ];
    for (category, level) in per_category {
        if let Some(level) = level {
            config.set_level(category, parse_level(level)?);
        }
    }
    if args.trace {
        config.set_level(LogCategory::CPU, LogLevel::Trace);
        config.set_rate_limit(0);
    }
    if let Some(rate) = args.log_rate {
        config.set_rate_limit(rate);
    }
    if let Some(path) = &args.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("cannot open log file {}", path.display()))?;
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<NesConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            NesConfig::from_json(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => NesConfig::default(),
    };
    if let Some(policy) = args.unimplemented {
        config.cpu.undocumented = policy.into();
    }
    if args.bcd {
        config.cpu.bcd_enabled = true;
    }
    Ok(config)
}

fn load_cartridge(path: &Path) -> Result<Cartridge> {
    Cartridge::from_path(path).map_err(|e| {
        let stage = e.stage();
        anyhow::Error::new(e).context(format!(
            "failed to load {} at the {} stage",
            path.display(),
            stage
        ))
    })
}

/// Run up to `cycles` bus cycles. Stops early when the CPU jams and the
/// config asks for it. Returns the cycles run.
fn run(sys: &mut NesSystem, cycles: u64, resume_traps: bool) -> Result<u64> {
    let start = sys.cpu().cycles();
    loop {
        let elapsed = sys.cpu().cycles() - start;
        if elapsed >= cycles || (sys.config().stop_on_jam && sys.cpu().is_jammed()) {
            return Ok(elapsed);
        }
        match sys.run_cycles(cycles - elapsed) {
            Ok(_) => {}
            Err(NesError::Cpu(CpuError::UnimplementedOpcode { opcode, pc })) if resume_traps => {
                warn!("opcode ${:02X} at ${:04X} trapped, resuming as NOP", opcode, pc);
                sys.resume_as_nop();
            }
            Err(e) => {
                return Err(e).with_context(|| format!("CPU stopped after {} cycles", elapsed))
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_logging(&args)?;
    let config = build_config(&args)?;

    let cart = load_cartridge(&args.rom)?;
    println!("{}", cart.header.summary());
    if let Some(trainer) = &cart.trainer {
        println!("Trainer: {} bytes (mapped at $7000)", trainer.len());
    }
    println!("Loaded {} bytes of PRG ROM", cart.prg_rom.len());
    if cart.chr.is_ram() {
        println!("No CHR ROM - using {} bytes of CHR RAM", cart.chr.len());
    } else {
        println!("Loaded {} bytes of CHR ROM", cart.chr.len());
    }
    if args.header_only {
        return Ok(());
    }

    let mut sys = NesSystem::new(cart, config);
    let ran = run(&mut sys, args.cycles, args.resume_traps)?;
    info!("ran {} cycles", ran);

    let cpu = sys.cpu();
    let r = cpu.regs;
    println!(
        "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}{}",
        r.pc,
        r.a,
        r.x,
        r.y,
        r.p.to_byte(r.p.break_flag),
        r.s,
        cpu.cycles(),
        if cpu.is_jammed() { " (jammed)" } else { "" }
    );

    if let Some(path) = &args.save {
        let state = sys.debug_state();
        let mut f = File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
        info!("debug state written to {}", path.display());
    }

    Ok(())
}
