//! # Simulated Debug Server
//!
//! This crate provides a stand-in for the telnet command port of an on-chip debug
//! server. It speaks the same line protocol as the real thing and is backed by a
//! target that lives entirely in memory, which makes it suitable for testing
//! clients without hardware.
//!
//! ## Architecture
//!
//! - **[`DebugTarget`] Trait**: the operations a simulated target supports
//!   (run control, memory access and core registers)
//! - **[`MemoryTarget`]**: a [`DebugTarget`] with sparse byte-addressed memory and a
//!   register file
//! - **[`server::Server`]**: accepts TCP connections, echoes every command line,
//!   dispatches it to the target and terminates the output with the prompt
//!
//! ## Basic Usage
//!
//! ```no_run
//! use regspy_protocol::TargetState;
//! use regspy_sim::{MemoryTarget, server::Builder};
//!
//! let target = MemoryTarget::new("cpu0", TargetState::Running);
//! target.write_word(0xE000_E010, 0x0000_0007);
//! target.set_register("pc", 0x0800_01c4);
//!
//! let server = Builder::new().build(target);
//! server.listen("127.0.0.1:4444")?;
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Supported Commands
//!
//! `targets`, `targets <name>`, `target current`, `halt`, `reset run`,
//! `mdb|mdh|mdw <address> [count]`, `mwb|mwh|mww <address> <value>`,
//! `reg <selector>`, `version` and `sleep <ms>`. Anything else is answered
//! with an error line, like the real server does.
//!
//! ## Thread Model
//!
//! Clients are served one after the other on the thread that calls
//! [`server::Server::listen`]. Every received command line is recorded in a
//! [`server::CommandLog`] that can be inspected from other threads.
use std::sync::Arc;

use regspy_protocol::{Address, TargetState, Unit};

mod memory;
pub mod server;

pub use memory::MemoryTarget;

/// Operations of a simulated debug target.
///
/// All methods take `&self`; implementations use interior mutability so that
/// tests can keep a handle to the target while the server runs.
pub trait DebugTarget {
    /// Name listed by `targets`.
    fn name(&self) -> String;

    fn state(&self) -> TargetState;

    /// Stops a running target.
    fn halt(&self);

    /// Resets the target and lets it run.
    fn reset_run(&self);

    /// Reads one element of `unit` size.
    fn read_memory(&self, address: Address, unit: Unit) -> u32;

    /// Writes the low `unit.size()` bytes of `value`.
    fn write_memory(&self, address: Address, unit: Unit, value: u32);

    /// Value of a core register, `None` if the target has no such register.
    /// Only called while the target is halted.
    fn read_register(&self, selector: &str) -> Option<u32>;
}

impl<T: DebugTarget + ?Sized> DebugTarget for Arc<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn state(&self) -> TargetState {
        (**self).state()
    }

    fn halt(&self) {
        (**self).halt()
    }

    fn reset_run(&self) {
        (**self).reset_run()
    }

    fn read_memory(&self, address: Address, unit: Unit) -> u32 {
        (**self).read_memory(address, unit)
    }

    fn write_memory(&self, address: Address, unit: Unit, value: u32) {
        (**self).write_memory(address, unit, value)
    }

    fn read_register(&self, selector: &str) -> Option<u32> {
        (**self).read_register(selector)
    }
}
