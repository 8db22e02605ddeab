//! Core 6502 primitives: the pin-level bus protocol, the cycle-stepped CPU
//! and the logging shared by every system built on them.

pub mod cpu_6502;
pub mod logging;
pub mod pins;

pub use cpu_6502::{Cpu6502, CpuConfig, CpuError};
pub use pins::{Memory6502, Pins};

use serde_json::Value;

/// Description of a mount point (media slot) that a system supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPointInfo {
    /// Unique identifier for this mount point (e.g., "Cartridge")
    pub id: String,
    /// User-friendly name for display (e.g., "Cartridge Slot")
    pub name: String,
    /// File extensions accepted by this mount point (e.g., ["nes"])
    pub extensions: Vec<String>,
    /// Whether this mount point is required for the system to function
    pub required: bool,
}

/// A machine built around a [`Cpu6502`] and a memory map.
pub trait System {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Assert RES; the CPU runs its reset sequence on the next ticks.
    fn reset(&mut self);

    /// Advance `cycles` bus cycles. Returns the cycles actually run, which
    /// is smaller when the CPU jammed.
    fn run_cycles(&mut self, cycles: u64) -> Result<u64, Self::Error>;

    /// JSON snapshot of CPU registers and machine state for debugging.
    /// Never includes ROM contents.
    fn debug_state(&self) -> Value;

    /// Get the list of mount points this system supports
    fn mount_points(&self) -> Vec<MountPointInfo>;

    /// Load media into a specific mount point
    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if a mount point has media loaded
    fn is_mounted(&self, mount_point_id: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::ArrayMemory;

    /// Flat RAM machine used to exercise the trait surface.
    struct MockSystem {
        cpu: Cpu6502,
        pins: Pins,
        mem: ArrayMemory,
        mounted: bool,
    }

    impl MockSystem {
        fn new() -> Self {
            let (cpu, pins) = Cpu6502::init(CpuConfig::default());
            Self {
                cpu,
                pins,
                mem: ArrayMemory::filled(0xEA),
                mounted: false,
            }
        }
    }

    impl System for MockSystem {
        type Error = CpuError;

        fn reset(&mut self) {
            self.pins.res = true;
        }

        fn run_cycles(&mut self, cycles: u64) -> Result<u64, Self::Error> {
            for _ in 0..cycles {
                self.pins = self.cpu.tick(self.pins)?.service(&mut self.mem);
            }
            Ok(cycles)
        }

        fn debug_state(&self) -> Value {
            serde_json::json!({ "cpu": self.cpu.state() })
        }

        fn mount_points(&self) -> Vec<MountPointInfo> {
            vec![MountPointInfo {
                id: "test".to_string(),
                name: "Test Slot".to_string(),
                extensions: vec!["bin".to_string()],
                required: false,
            }]
        }

        fn mount(&mut self, _mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
            self.mem.data[..data.len()].copy_from_slice(data);
            self.mounted = true;
            Ok(())
        }

        fn is_mounted(&self, _mount_point_id: &str) -> bool {
            self.mounted
        }
    }

    #[test]
    fn test_mount_point_info() {
        let sys = MockSystem::new();
        let mount_points = sys.mount_points();

        assert_eq!(mount_points.len(), 1);
        assert_eq!(mount_points[0].id, "test");
        assert_eq!(mount_points[0].extensions, vec!["bin".to_string()]);
        assert!(!mount_points[0].required);
    }

    #[test]
    fn test_system_mount_operations() {
        let mut sys = MockSystem::new();
        assert!(!sys.is_mounted("test"));
        assert!(sys.mount("test", &[1, 2, 3]).is_ok());
        assert!(sys.is_mounted("test"));
        assert_eq!(sys.mem.data[2], 3);
    }

    #[test]
    fn test_debug_state_after_cycles() {
        let mut sys = MockSystem::new();
        assert_eq!(sys.run_cycles(11).expect("run"), 11);
        let v = sys.debug_state();
        assert_eq!(v["cpu"]["cycles"], 11);
        assert_eq!(v["cpu"]["registers"]["pc"], 0xEAEC);
    }

    #[test]
    fn test_reset_is_taken_on_next_tick() {
        let mut sys = MockSystem::new();
        sys.run_cycles(20).expect("run");
        sys.reset();
        sys.run_cycles(7).expect("run");
        assert!(sys.pins.sync);
        assert_eq!(sys.pins.addr, 0xEAEA);
        assert!(!sys.pins.res);
    }
}
