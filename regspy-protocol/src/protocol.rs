use std::{fmt::Display, str::FromStr};

use crate::error::ProtocolError;

/// Target memory address.
pub type Address = u64;

/// Prompt byte emitted by the debug server once it is ready for the next command.
pub const DEFAULT_PROMPT: u8 = b'>';

/// Element size of a memory access command.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Unit {
    /// 8 bit
    Byte,
    /// 16 bit
    HalfWord,
    /// 32 bit
    Word,
}

impl Unit {
    /// Number of bytes of one element.
    pub fn size(&self) -> usize {
        match self {
            Unit::Byte => 1,
            Unit::HalfWord => 2,
            Unit::Word => 4,
        }
    }

    /// Suffix of the memory display / memory write commands (`mdb`, `mdh`, `mdw`).
    pub fn suffix(&self) -> char {
        match self {
            Unit::Byte => 'b',
            Unit::HalfWord => 'h',
            Unit::Word => 'w',
        }
    }

    pub fn from_suffix(suffix: char) -> Option<Unit> {
        match suffix {
            'b' => Some(Unit::Byte),
            'h' => Some(Unit::HalfWord),
            'w' => Some(Unit::Word),
            _ => None,
        }
    }
}

/// Byte width of a single read.
///
/// Only the 8, 16 and 32 bit command variants exist on the wire.
/// An 8 byte read is performed as two consecutive words.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Width {
    Byte,
    HalfWord,
    Word,
    DoubleWord,
}

impl Width {
    /// Returns the width for a number of bytes, if it is supported.
    pub fn from_bytes(bytes: usize) -> Option<Width> {
        match bytes {
            1 => Some(Width::Byte),
            2 => Some(Width::HalfWord),
            4 => Some(Width::Word),
            8 => Some(Width::DoubleWord),
            _ => None,
        }
    }

    /// Number of bytes covered by this width.
    pub fn bytes(&self) -> usize {
        match self {
            Width::Byte => 1,
            Width::HalfWord => 2,
            Width::Word => 4,
            Width::DoubleWord => 8,
        }
    }

    /// The command unit and element count used to read this width.
    pub fn access(&self) -> (Unit, u32) {
        match self {
            Width::Byte => (Unit::Byte, 1),
            Width::HalfWord => (Unit::HalfWord, 1),
            Width::Word => (Unit::Word, 1),
            Width::DoubleWord => (Unit::Word, 2),
        }
    }
}

impl Display for Width {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.bytes())
    }
}

#[test]
fn width_access() {
    assert_eq!(Width::from_bytes(8), Some(Width::DoubleWord));
    assert_eq!(Width::from_bytes(3), None);
    assert_eq!(Width::DoubleWord.access(), (Unit::Word, 2));
    assert!(Width::Byte < Width::Word);
}

/// Run state of a debug target as reported by the server.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TargetState {
    DebugRunning,
    Halted,
    Reset,
    Running,
    Unknown,
}

impl TargetState {
    /// Returns true for both running states.
    pub fn is_running(&self) -> bool {
        matches!(self, TargetState::Running | TargetState::DebugRunning)
    }
}

impl FromStr for TargetState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug-running" => Ok(TargetState::DebugRunning),
            "halted" => Ok(TargetState::Halted),
            "reset" => Ok(TargetState::Reset),
            "running" => Ok(TargetState::Running),
            "unknown" => Ok(TargetState::Unknown),
            other => Err(ProtocolError::UnknownTargetState(other.to_string())),
        }
    }
}

impl Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TargetState::DebugRunning => "debug-running",
            TargetState::Halted => "halted",
            TargetState::Reset => "reset",
            TargetState::Running => "running",
            TargetState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[test]
fn target_state_round_trip() {
    for state in ["debug-running", "halted", "reset", "running", "unknown"] {
        assert_eq!(state.parse::<TargetState>().unwrap().to_string(), state);
    }
    assert!(matches!(
        "sleeping".parse::<TargetState>(),
        Err(ProtocolError::UnknownTargetState(s)) if s == "sleeping"
    ));
}

/// One row of the target list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetInfo {
    pub name: String,
    pub state: TargetState,
    /// Marked as the currently selected target.
    pub current: bool,
}

/// A command is sent from the client to the server as a single line.
/// The server echoes the line, prints its output and finishes with the prompt.
/// Commands are processed strictly one at a time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Lists all debug targets together with their state.
    Targets,
    /// Prints the name of the currently selected target.
    TargetCurrent,
    /// Makes the named target the current one.
    SelectTarget(String),
    /// Halts the current target.
    Halt,
    /// Resets the current target and lets it run.
    ResetRun,
    /// Displays `count` elements of `unit` size starting at `address`.
    ReadMemory {
        address: Address,
        unit: Unit,
        count: u32,
    },
    /// Writes a single element of `unit` size.
    WriteMemory {
        address: Address,
        unit: Unit,
        value: u32,
    },
    /// Reads a core register by its selector, e.g. `pc`.
    ReadRegister(String),
    /// Any other command, sent verbatim.
    Raw(String),
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Targets => write!(f, "targets"),
            Command::TargetCurrent => write!(f, "target current"),
            Command::SelectTarget(name) => write!(f, "targets {}", name),
            Command::Halt => write!(f, "halt"),
            Command::ResetRun => write!(f, "reset run"),
            Command::ReadMemory {
                address,
                unit,
                count,
            } => write!(f, "md{} 0x{:08x} {}", unit.suffix(), address, count),
            Command::WriteMemory {
                address,
                unit,
                value,
            } => write!(f, "mw{} 0x{:08x} 0x{:x}", unit.suffix(), address, value),
            Command::ReadRegister(selector) => write!(f, "reg {}", selector),
            Command::Raw(line) => f.write_str(line),
        }
    }
}
