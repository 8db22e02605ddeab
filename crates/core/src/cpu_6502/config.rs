use super::registers::Registers;
use serde::{Deserialize, Serialize};

/// What to do with opcodes classified as unimplemented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndocumentedPolicy {
    /// Stop in a trapped state and report [`CpuError::UnimplementedOpcode`](super::CpuError)
    #[default]
    Trap,
    /// Run the opcode as a NOP with its addressing mode's bus cycles
    Nop,
}

/// Options recognised by [`Cpu6502::init`](super::Cpu6502::init).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Start from these registers with an opcode fetch at `pc` instead of
    /// running the reset sequence.
    pub registers: Option<Registers>,
    /// Honour the D flag in ADC/SBC. The NES 2A03 has the BCD adder removed.
    pub bcd_enabled: bool,
    pub undocumented: UndocumentedPolicy,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            registers: None,
            bcd_enabled: true,
            undocumented: UndocumentedPolicy::Trap,
        }
    }
}

impl CpuConfig {
    /// Configuration for a Ricoh 2A03 (no decimal mode).
    pub fn ricoh_2a03() -> Self {
        Self {
            bcd_enabled: false,
            ..Self::default()
        }
    }

    pub fn with_registers(mut self, registers: Registers) -> Self {
        self.registers = Some(registers);
        self
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_bcd_and_trap() {
        let c = CpuConfig::default();
        assert!(c.bcd_enabled);
        assert_eq!(c.undocumented, UndocumentedPolicy::Trap);
        assert!(c.registers.is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = CpuConfig::from_json(r#"{"undocumented":"nop"}"#).expect("parse");
        assert_eq!(c.undocumented, UndocumentedPolicy::Nop);
        assert!(c.bcd_enabled);
    }

    #[test]
    fn json_with_registers() {
        let json = r#"{
            "bcd_enabled": false,
            "registers": {
                "a": 1, "x": 2, "y": 3, "s": 253, "pc": 49152,
                "p": {"carry": true, "zero": false, "interrupt_disable": true,
                      "decimal": false, "break_flag": false, "overflow": false,
                      "negative": false}
            }
        }"#;
        let c = CpuConfig::from_json(json).expect("parse");
        let r = c.registers.expect("registers");
        assert_eq!(r.pc, 0xC000);
        assert!(r.p.carry);
        assert!(!c.bcd_enabled);
    }
}
