use std::{
    io::{self, BufRead, BufReader, ErrorKind, Write},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    sync::{Arc, Mutex, PoisonError},
    thread,
    time::Duration,
};

use regspy_protocol::{
    Command, DEFAULT_PROMPT, TargetState,
    codec::{format_memory_line, format_register_line},
};

use crate::DebugTarget;

#[derive(Debug, Clone)]
pub struct Config {
    /// Sent to every client before the first prompt.
    pub banner: String,
    pub prompt: u8,
    pub read_write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            banner: "Open On-Chip Debugger".to_string(),
            prompt: DEFAULT_PROMPT,
            read_write_timeout: Duration::from_secs(30),
        }
    }
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```
/// use regspy_protocol::TargetState;
/// use regspy_sim::{MemoryTarget, server::Builder};
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .banner("Simulated debugger")
///     .rw_timeout(Duration::from_secs(5))
///     .build(MemoryTarget::new("cpu0", TargetState::Halted));
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the greeting sent on connect.
    pub fn banner(mut self, banner: impl Into<String>) -> Self {
        self.config.banner = banner.into();
        self
    }

    /// Set the byte that terminates every response.
    pub fn prompt(mut self, prompt: u8) -> Self {
        self.config.prompt = prompt;
        self
    }

    /// Set the TCP read and write timeout
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = timeout;
        self
    }

    /// Build and return the server
    pub fn build<T: DebugTarget>(self, target: T) -> Server<T> {
        Server::new(target, self.config)
    }
}

/// Every command line received, across all clients. Cloning shares the log.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CommandLog {
    fn record(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `md*` commands.
    pub fn memory_reads(&self) -> usize {
        self.count(|command| matches!(command, Command::ReadMemory { .. }))
    }

    /// Number of `reg` commands.
    pub fn register_reads(&self) -> usize {
        self.count(|command| matches!(command, Command::ReadRegister(_)))
    }

    pub fn count(&self, filter: impl Fn(&Command) -> bool) -> usize {
        self.lines()
            .iter()
            .filter_map(|line| line.parse::<Command>().ok())
            .filter(|command| filter(command))
            .count()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[derive(Debug)]
pub struct Server<T: DebugTarget> {
    target: T,
    config: Config,
    log: CommandLog,
}

impl<T: DebugTarget> Server<T> {
    pub fn new(target: T, config: Config) -> Server<T> {
        Server {
            target,
            config,
            log: CommandLog::default(),
        }
    }

    /// Handle to the commands received by this server.
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    pub fn listen(&self, addr: impl ToSocketAddrs) -> io::Result<()> {
        self.serve(TcpListener::bind(addr)?)
    }

    /// Serves clients of an already bound listener, one at a time.
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        log::info!("Server listening on {}", listener.local_addr()?);

        for stream in listener.incoming() {
            match stream {
                Ok(tcp) => {
                    if let Ok(addr) = tcp.peer_addr() {
                        log::info!("New client connection from {}", addr);
                    }
                    if let Err(e) = self.handle_client(tcp) {
                        log::error!("Client error: {}", e);
                    }
                }
                Err(e) => log::error!("Connection error: {}", e),
            }
        }
        Ok(())
    }

    fn handle_client(&self, mut tcp: TcpStream) -> io::Result<()> {
        tcp.set_read_timeout(Some(self.config.read_write_timeout))?;
        tcp.set_write_timeout(Some(self.config.read_write_timeout))?;

        let prompt = char::from(self.config.prompt);
        write!(tcp, "{}\r\n{} ", self.config.banner, prompt)?;

        let mut reader = BufReader::new(tcp.try_clone()?);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    log::error!("Client read timeout, closing connection");
                    break;
                }
                Err(e)
                    if e.kind() == ErrorKind::ConnectionAborted
                        || e.kind() == ErrorKind::ConnectionReset =>
                {
                    break;
                } // Client disconnected
                Err(e) => return Err(e),
            }

            let command = line.trim_end_matches(['\r', '\n']);
            log::debug!("Received '{}'", command);
            self.log.record(command);

            let mut response = format!("{}\r\n", command);
            for output in self.execute(command) {
                response.push_str(&output);
                response.push_str("\r\n");
            }
            response.push(prompt);
            response.push(' ');
            log::trace!("Sending {:?}", response);
            tcp.write_all(response.as_bytes())?;
        }
        log::info!("Client disconnected");
        Ok(())
    }

    /// Runs one command line and returns its output lines.
    fn execute(&self, line: &str) -> Vec<String> {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => return vec![format!("invalid arguments: {}", e)],
        };
        let name = self.target.name();
        match command {
            Command::Targets => vec![
                "    TargetName         Type       Endian TapName            State       ".into(),
                "--  ------------------ ---------- ------ ------------------ ------------".into(),
                format!(
                    " 0* {:<18} cortex_m   little {:<18} {}",
                    name,
                    name,
                    self.target.state()
                ),
            ],
            Command::SelectTarget(selected) if selected == name => Vec::new(),
            Command::SelectTarget(selected) => {
                vec![format!("Target '{}' not defined", selected)]
            }
            Command::TargetCurrent => vec![name],
            Command::Halt => {
                self.target.halt();
                vec![format!("{}: target halted due to debug-request", name)]
            }
            Command::ResetRun => {
                self.target.reset_run();
                Vec::new()
            }
            Command::ReadMemory {
                address,
                unit,
                count,
            } => {
                let values: Vec<u32> = (0..u64::from(count))
                    .map(|i| {
                        self.target
                            .read_memory(address + i * unit.size() as u64, unit)
                    })
                    .collect();
                vec![format_memory_line(address, unit, &values)]
            }
            Command::WriteMemory {
                address,
                unit,
                value,
            } => {
                self.target.write_memory(address, unit, value);
                Vec::new()
            }
            Command::ReadRegister(selector) => {
                if self.target.state() != TargetState::Halted {
                    return vec![
                        "Target not halted".into(),
                        format!("could not read register '{}'", selector),
                    ];
                }
                match self.target.read_register(&selector) {
                    Some(value) => vec![format_register_line(&selector, value)],
                    None => vec![format!("register {} not found in current target", selector)],
                }
            }
            Command::Raw(raw) => self.execute_raw(&raw),
        }
    }

    fn execute_raw(&self, raw: &str) -> Vec<String> {
        let words: Vec<&str> = raw.split_whitespace().collect();
        match words.as_slice() {
            [] => Vec::new(),
            ["version"] => vec![format!("regspy-sim {}", env!("CARGO_PKG_VERSION"))],
            ["sleep", ms] => match ms.parse() {
                Ok(ms) => {
                    thread::sleep(Duration::from_millis(ms));
                    Vec::new()
                }
                Err(_) => vec![format!("invalid sleep duration '{}'", ms)],
            },
            [name, ..] => vec![format!("invalid command name \"{}\"", name)],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MemoryTarget;

    fn server(state: TargetState) -> Server<MemoryTarget> {
        Builder::new().build(MemoryTarget::new("stm32f7x.cpu", state))
    }

    #[test]
    fn target_table() {
        let server = server(TargetState::Running);
        let lines = server.execute("targets");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with(" 0* stm32f7x.cpu "));
        assert!(lines[2].ends_with(" running"));
        assert_eq!(server.execute("target current"), vec!["stm32f7x.cpu"]);
        assert!(server.execute("targets stm32f7x.cpu").is_empty());
        assert_eq!(server.execute("targets other").len(), 1);
    }

    #[test]
    fn memory_commands() {
        let server = server(TargetState::Halted);
        assert!(server.execute("mww 0x20000000 0x12345678").is_empty());
        assert_eq!(
            server.execute("mdw 0x20000000 2"),
            vec!["0x20000000: 12345678 00000000 "]
        );
        assert_eq!(server.execute("mdb 0x20000001"), vec!["0x20000001: 56 "]);
        assert_eq!(server.execute("mdh 0x20000002 1"), vec!["0x20000002: 1234 "]);
    }

    #[test]
    fn registers_need_halt() {
        let server = server(TargetState::Running);
        server.target.set_register("pc", 0x0800_01c4);
        let lines = server.execute("reg pc");
        assert_eq!(lines[0], "Target not halted");

        server.execute("halt");
        assert_eq!(server.target.state(), TargetState::Halted);
        assert_eq!(server.execute("reg pc"), vec!["pc (/32): 0x080001c4"]);
        assert_eq!(
            server.execute("reg r99"),
            vec!["register r99 not found in current target"]
        );
    }

    #[test]
    fn other_commands() {
        let server = server(TargetState::Halted);
        assert!(server.execute("version")[0].starts_with("regspy-sim "));
        assert!(server.execute("").is_empty());
        assert_eq!(
            server.execute("flash write_image"),
            vec!["invalid command name \"flash\""]
        );
        assert!(server.execute("sleep 1").is_empty());
    }

    #[test]
    fn command_log_counts() {
        let log = CommandLog::default();
        for line in ["targets", "mdw 0x0 1", "reg pc", "mdb 0x4 1", "version"] {
            log.record(line);
        }
        assert_eq!(log.memory_reads(), 2);
        assert_eq!(log.register_reads(), 1);
        assert_eq!(log.lines().len(), 5);
        log.clear();
        assert!(log.lines().is_empty());
    }
}
