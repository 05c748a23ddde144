use std::{
    io::{ErrorKind, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::{Duration, Instant},
};

use bytes::BytesMut;
use regspy_protocol::{
    Address, Command, TargetInfo, TargetState, Unit, Width,
    codec::{self, Response},
    error::ProtocolError,
};

use crate::{Config, SessionError, Transport};

const READ_CHUNK: usize = 512;

/// Lifecycle of a [`Session`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionState {
    Closed,
    /// The transport is open, the target is not prepared yet.
    Connected,
    Ready,
}

/// One command/response session with a debug server.
///
/// Commands are strictly sequential. Dropping the session releases the transport.
pub struct Session<T: Transport = TcpStream> {
    transport: T,
    config: Config,
    state: SessionState,
    target: Option<TargetInfo>,
}

impl Session<TcpStream> {
    /// Connects over TCP and prepares the target according to `config`.
    pub fn connect(addr: impl ToSocketAddrs, config: Config) -> Result<Session, SessionError> {
        let tcp = TcpStream::connect(addr)?;
        if let Ok(peer) = tcp.peer_addr() {
            log::debug!("Connected to debug server at {}", peer);
        }
        Session::open(tcp, config)
    }
}

impl<T: Transport> Session<T> {
    /// Consumes the connection banner and prepares the target.
    pub fn open(transport: T, config: Config) -> Result<Session<T>, SessionError> {
        let mut session = Session {
            transport,
            config,
            state: SessionState::Connected,
            target: None,
        };
        let (banner, complete) = session.accumulate(session.config.banner_timeout)?;
        if !complete {
            log::warn!("No prompt in connection banner ({} bytes)", banner.len());
        }
        log::trace!("Banner: {:?}", String::from_utf8_lossy(&banner));
        session.prepare_target()?;
        session.state = SessionState::Ready;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The selected target as observed after the target policies were applied.
    pub fn target(&self) -> Option<&TargetInfo> {
        self.target.as_ref()
    }

    fn prepare_target(&mut self) -> Result<(), SessionError> {
        let targets = self.targets()?;
        for target in &targets {
            log::debug!(
                "Target {}{}: {}",
                target.name,
                if target.current { " (current)" } else { "" },
                target.state
            );
        }

        if let Some(name) = self.config.target_name.clone() {
            if !targets.iter().any(|t| t.name == name) {
                return Err(SessionError::UnknownTarget {
                    name,
                    available: targets.into_iter().map(|t| t.name).collect(),
                });
            }
            log::info!("Selecting target {}", name);
            self.send(&Command::SelectTarget(name))?;
        }

        let (mut name, mut state) = self.current_target_state()?;
        if self.config.restart_if_not_running && !state.is_running() {
            log::info!("Target {} is {}, restarting", name, state);
            self.send(&Command::ResetRun)?;
            (name, state) = self.current_target_state()?;
        }
        if self.config.halt_if_running && state.is_running() {
            log::info!("Target {} is {}, halting", name, state);
            self.send(&Command::Halt)?;
            (name, state) = self.current_target_state()?;
        }
        log::debug!("Target {} is {}", name, state);
        self.target = Some(TargetInfo {
            name,
            state,
            current: true,
        });
        Ok(())
    }

    /// Lists all targets known to the server.
    pub fn targets(&mut self) -> Result<Vec<TargetInfo>, SessionError> {
        let response = self.send(&Command::Targets)?;
        codec::parse_targets(&response.lines).map_err(|e| self.fail(e))
    }

    /// Name and run state of the current target.
    pub fn current_target_state(&mut self) -> Result<(String, TargetState), SessionError> {
        let response = self.send(&Command::TargetCurrent)?;
        let name = match response.lines.as_slice() {
            [name] => name.trim().to_string(),
            _ => return Err(SessionError::NoCurrentTarget),
        };
        let state = self
            .targets()?
            .into_iter()
            .find(|t| t.name == name)
            .map(|t| t.state)
            .ok_or(SessionError::NoCurrentTarget)?;
        Ok((name, state))
    }

    /// Sends an arbitrary command line, e.g. `version`.
    pub fn request(&mut self, line: &str) -> Result<Response, SessionError> {
        self.send(&Command::Raw(line.to_string()))
    }

    /// Performs one command/response cycle.
    ///
    /// A response that does not end with the prompt within the timeout is returned
    /// as it is and marked incomplete. An echo mismatch closes the session.
    pub fn send(&mut self, command: &Command) -> Result<Response, SessionError> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed);
        }

        let stale = self.transport.discard_unread().map_err(|e| self.fail(e))?;
        if stale > 0 {
            log::debug!("Discarded {} stale bytes", stale);
        }

        let line = command.to_string();
        log::debug!("Sending '{}'", line);
        command
            .write_to(&mut self.transport)
            .and_then(|_| self.transport.flush())
            .map_err(|e| self.fail(e))?;

        let (buf, complete) = self.accumulate(self.config.response_timeout)?;
        log::trace!("Received {:?}", String::from_utf8_lossy(&buf));
        if !complete {
            log::warn!(
                "No prompt within {:?} after '{}', using {} bytes received so far",
                self.config.response_timeout,
                line,
                buf.len()
            );
        }

        let response =
            Response::from_bytes(&line, &buf, self.config.prompt).map_err(|e| self.fail(e))?;
        if complete && !response.complete {
            log::warn!("Response to '{}' does not end with the prompt", line);
        }
        Ok(response)
    }

    /// Reads bytes until the prompt arrives or `timeout` elapses.
    /// Returns the bytes and whether the prompt was seen.
    fn accumulate(&mut self, timeout: Duration) -> Result<(BytesMut, bool), SessionError> {
        let deadline = Instant::now() + timeout;
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok((buf, false));
            }
            self.transport
                .set_read_timeout(Some(remaining))
                .map_err(|e| self.fail(e))?;
            match self.transport.read(&mut chunk) {
                Ok(0) => return Err(self.fail(ProtocolError::UnexpectedEof)),
                Ok(n) => {
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(end) = codec::prompt_position(&buf, self.config.prompt) {
                        if end + 1 < buf.len() {
                            log::debug!("Ignoring {} bytes after the prompt", buf.len() - end - 1);
                            buf.truncate(end + 1);
                        }
                        return Ok((buf, true));
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    return Ok((buf, false));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    /// Reads `width` bytes starting at `address`.
    pub fn read_memory(&mut self, address: Address, width: Width) -> Result<Vec<u8>, SessionError> {
        let (unit, count) = width.access();
        let response = self.send(&Command::ReadMemory {
            address,
            unit,
            count,
        })?;
        response
            .single_line()
            .and_then(|line| codec::parse_memory_line(line, address, unit, count))
            .map_err(|e| self.fail(e))
    }

    /// Reads a core register as 4 little-endian bytes.
    ///
    /// Returns `None` if the server could not read the register, e.g. because the
    /// target is not halted.
    pub fn read_core_register(&mut self, selector: &str) -> Result<Option<[u8; 4]>, SessionError> {
        let response = self.send(&Command::ReadRegister(selector.to_string()))?;
        match codec::parse_register_lines(&response.lines) {
            Ok(Some(value)) => Ok(Some(value.to_le_bytes())),
            Ok(None) => {
                log::warn!(
                    "Could not read core register {}: {}",
                    selector,
                    response.lines.join(" ")
                );
                Ok(None)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Writes a single element. The server prints nothing on success.
    pub fn write_memory(
        &mut self,
        address: Address,
        unit: Unit,
        value: u32,
    ) -> Result<(), SessionError> {
        let command = Command::WriteMemory {
            address,
            unit,
            value,
        };
        let response = self.send(&command)?;
        if !response.lines.is_empty() {
            return Err(SessionError::CommandFailed {
                command: command.to_string(),
                output: response.lines,
            });
        }
        Ok(())
    }

    /// Releases the transport.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        log::debug!("Closing session");
        if let Err(e) = self.transport.shutdown() {
            log::debug!("Error while closing the transport: {}", e);
        }
    }

    /// Closes the session after a fatal error and hands the error back.
    fn fail(&mut self, error: impl Into<SessionError>) -> SessionError {
        let error = error.into();
        log::error!("Closing session after fatal error: {}", error);
        self.release();
        error
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.release();
    }
}
