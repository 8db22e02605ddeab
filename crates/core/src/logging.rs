//! Centralized logging configuration.
//!
//! Logging is configured at runtime through a global [`LogConfig`] rather
//! than environment variables. Each [`LogCategory`] carries its own level and
//! falls back to the global level when its own is `Off`.
//!
//! Messages are built lazily: the closure handed to [`log`] only runs when the
//! category and level are enabled, so disabled tracing in the tick loop costs
//! two atomic loads. Output goes to stderr, or to a file written by a
//! background thread once [`LogConfig::set_log_file`] has been called.
//!
//! ```rust
//! use pin6502_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::CPU, LogLevel::Debug, || {
//!     format!("CPU: BRK at PC={:04X}", 0x1234)
//! });
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for the emulator components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Instruction decode and execution
    CPU,
    /// Memory map accesses in the embedding system
    Bus,
    /// RESET, NMI, IRQ and BRK sequences
    Interrupts,
    /// iNES loading
    Cartridge,
    /// Register windows that are only stubbed
    Stubs,
}

const CATEGORY_COUNT: usize = 5;

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::CPU,
        LogCategory::Bus,
        LogCategory::Interrupts,
        LogCategory::Cartridge,
        LogCategory::Stubs,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::CPU => 0,
            LogCategory::Bus => 1,
            LogCategory::Interrupts => 2,
            LogCategory::Cartridge => 3,
            LogCategory::Stubs => 4,
        }
    }

    /// Parse a category name as used on the command line
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Some(LogCategory::CPU),
            "bus" => Some(LogCategory::Bus),
            "irq" | "interrupts" => Some(LogCategory::Interrupts),
            "cart" | "cartridge" => Some(LogCategory::Cartridge),
            "stubs" => Some(LogCategory::Stubs),
            _ => None,
        }
    }
}

/// Per-category cap on messages per one-second window.
///
/// A per-tick trace can produce millions of lines a second; anything past
/// the cap is counted and reported once the window rolls over.
struct RateLimiter {
    max_per_window: AtomicUsize,
    window: Duration,
    state: Mutex<[WindowState; CATEGORY_COUNT]>,
}

#[derive(Clone, Copy)]
struct WindowState {
    started: Option<Instant>,
    emitted: usize,
    dropped: usize,
}

impl RateLimiter {
    fn new(max_per_window: usize) -> Self {
        Self {
            max_per_window: AtomicUsize::new(max_per_window),
            window: Duration::from_secs(1),
            state: Mutex::new(
                [WindowState {
                    started: None,
                    emitted: 0,
                    dropped: 0,
                }; CATEGORY_COUNT],
            ),
        }
    }

    /// Returns whether to emit, plus the number of messages dropped in the
    /// previous window when it just closed.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let max = self.max_per_window.load(Ordering::Relaxed);
        if max == 0 {
            return (true, None);
        }
        let now = Instant::now();
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        let w = &mut state[category.index()];

        let mut report = None;
        let expired = match w.started {
            None => true,
            Some(t) => now.duration_since(t) >= self.window,
        };
        if expired {
            if w.dropped > 0 {
                report = Some(w.dropped);
            }
            *w = WindowState {
                started: Some(now),
                emitted: 0,
                dropped: 0,
            };
        }

        if w.emitted < max {
            w.emitted += 1;
            (true, report)
        } else {
            w.dropped += 1;
            (false, report)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    levels: [AtomicU8; CATEGORY_COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// All logging disabled, 60 messages per second per category.
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            levels: [
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
            ],
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(60),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category with its own level uses it; otherwise the global level applies.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    /// Maximum messages per second per category; 0 disables the limit.
    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .max_per_window
            .store(max_logs_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_window.load(Ordering::Relaxed)
    }

    /// Send output to `path` through a background writer thread.
    ///
    /// Replaces any previous log file. Fails if the file cannot be opened.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
            })?;

        if let Ok(mut slot) = self.log_sender.lock() {
            *slot = Some(sender);
        }
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop writing to the log file; the writer thread exits once the channel closes.
    pub fn clear_log_file(&self) {
        if let Ok(mut slot) = self.log_sender.lock() {
            *slot = None;
        }
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    fn write_message(&self, message: String) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Ok(slot) = self.log_sender.lock() {
                if let Some(sender) = slot.as_ref() {
                    match sender.send(message) {
                        Ok(()) => return,
                        Err(e) => {
                            eprintln!("{}", e.0);
                            return;
                        }
                    }
                }
            }
        }
        eprintln!("{}", message);
    }
}

/// Log a lazily built message under `category` at `level`.
///
/// The closure only runs when the category/level pair is enabled and the
/// rate limiter lets the message through.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }
    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped {
        config.write_message(format!(
            "[{:?}] WARNING: rate limit exceeded, {} message(s) dropped",
            category, count
        ));
    }
    if allowed {
        config.write_message(message_fn());
    }
}
