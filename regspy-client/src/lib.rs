//! # Debug Server Client
//!
//! A blocking client for the telnet command port of an on-chip debug server
//! (OpenOCD or compatible), used to read the state of a running microcontroller.
//!
//! ## Overview
//!
//! A [`Session`] owns one connection and walks through `Closed -> Connected -> Ready -> Closed`:
//!
//! 1. **Connect**: open the transport and consume the banner up to the first prompt
//! 2. **Ready**: list the targets, select the configured one and apply the
//!    restart / halt policies from [`Config`]
//! 3. **Commands**: one command at a time, each answered by echo, output and prompt
//! 4. **Close**: the transport is released exactly once, on [`Session::close`] or on drop
//!
//! ## Basic Usage
//!
//! ```ignore
//! use regspy_client::{Builder, Session};
//! use regspy_protocol::Width;
//!
//! let config = Builder::new().halt_if_running(true).build();
//! let mut session = Session::connect("127.0.0.1:4444", config)?;
//!
//! let csr = session.read_memory(0xE000_E010, Width::Word)?;
//! let lr = session.read_core_register("lr")?; // None if the target is not halted
//! ```
//!
//! ## Error Handling
//!
//! - A response that misses the prompt within the timeout is returned as far as it
//!   was received and logged as a warning.
//! - An echo mismatch, a malformed value line or an I/O error is fatal: the session
//!   closes itself and every further command fails with [`SessionError::Closed`].
//! - A core register that cannot be read is `Ok(None)`, not an error.
//!
//! ## Logging
//!
//! This crate uses the `log` crate. Commands are logged at `debug`, raw bytes at
//! `trace`, degraded responses at `warn`.
mod config;
mod error;
mod session;
mod transport;

pub use config::{Builder, Config};
pub use error::SessionError;
pub use session::{Session, SessionState};
pub use transport::Transport;

/// Opens a fresh [`Session`] to the same server for every call.
#[derive(Debug, Clone)]
pub struct Connector {
    host: String,
    port: u16,
    config: Config,
}

impl Connector {
    pub fn new(host: impl Into<String>, port: u16, config: Config) -> Connector {
        Connector {
            host: host.into(),
            port,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connect(&self) -> Result<Session, SessionError> {
        log::debug!("Opening session to {}:{}", self.host, self.port);
        Session::connect((self.host.as_str(), self.port), self.config.clone())
    }
}
