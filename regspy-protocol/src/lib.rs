//! # Debug Server Command Protocol
//!
//! This crate describes the line-oriented command port of an on-chip debug server
//! (the telnet port of OpenOCD and compatible servers) that is used to inspect a
//! running microcontroller.
//!
//! ## Overview
//!
//! The port is half-duplex. The client writes one command terminated by a newline,
//! the server echoes the command, prints its output and finally emits a single
//! prompt character (`>`) to signal that it is ready for the next command.
//! This library implements the pieces of that contract:
//!
//! - Formatting [`Command`]s as lines
//! - Splitting raw bytes into a [`codec::Response`] and checking the echo
//! - Parsing memory display lines, core register values and the target table
//! - The server side: parsing command lines and formatting memory and register lines
//!
//! ## Message Format
//!
//! - **List targets**: `targets`
//! - **Current target**: `target current`
//! - **Select target**: `targets <name>`
//! - **Halt / restart**: `halt`, `reset run`
//! - **Read memory**: `mdb|mdh|mdw 0x<address> <count>` answered by `0x<address>: <value> ...`
//! - **Write memory**: `mwb|mwh|mww 0x<address> 0x<value>`
//! - **Read core register**: `reg <selector>` answered by `<selector> (/32): 0x<value>`
//!
//! ## Basic Usage
//!
//! ```
//! use regspy_protocol::{Command, Unit, codec::{Response, parse_memory_line}};
//!
//! let cmd = Command::ReadMemory { address: 0x2000_0000, unit: Unit::Word, count: 1 };
//! let mut buffer = Vec::new();
//! cmd.write_to(&mut buffer).expect("Writing to vector shouldn't fail");
//! assert_eq!(buffer, b"mdw 0x20000000 1\n");
//!
//! let raw = b"mdw 0x20000000 1\r\n0x20000000: 0000002a \r\n> ";
//! let response = Response::from_bytes(&cmd.to_string(), raw, b'>').expect("Valid response");
//! let bytes = parse_memory_line(&response.lines[0], 0x2000_0000, Unit::Word, 1).unwrap();
//! assert_eq!(bytes, vec![0x2a, 0, 0, 0]);
//! ```
//!
//! ## Error Handling
//!
//! This library uses the [`error::ProtocolError`] type for everything that breaks the
//! command/response contract. A response without a prompt is *not* an error, it is
//! reported as incomplete.
//!
//! ## Async Transports
//!
//! With the `tokio` feature, [`framed::PromptCodec`] provides a
//! `tokio_util::codec` implementation of the same framing.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
#[cfg(feature = "tokio")]
pub mod framed;
