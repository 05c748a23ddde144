//! # regspy
//!
//! Reads core registers, peripheral bit-fields, raw memory and firmware symbols
//! from a microcontroller through the telnet port of an on-chip debug server.
//!
//! ```text
//! regspy --halt read core:PC mmap:SYST_CSR.ENABLE mem:0x20000000:2
//! regspy write SYST_CSR.TICKINT 0
//! regspy list
//! regspy simulate --state running
//! ```
use std::error::Error;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use env_logger::Env;
use regspy_client::{Builder, Connector};
use regspy_protocol::{Address, TargetState};
use regspy_reader::{Catalog, ReadRequest, Reader, SymbolTable, catalog::armv7m};
use regspy_sim::MemoryTarget;

/// Width of `mem:` and `sym:` requests that do not name one.
const DEFAULT_WIDTH: usize = 4;

#[derive(Subcommand, Clone)]
enum Action {
    /// Read registers, bit-fields, memory and symbols in one batch
    Read {
        /// core:NAME, core:REG.FIELD, mmap:NAME, mmap:REG.FIELD, mem:ADDR[:WIDTH], sym:NAME[:WIDTH]
        #[arg(required = true, value_parser = parse_spec)]
        requests: Vec<RequestSpec>,
    },
    /// Set a bit-field of a memory-mapped register, keeping all other bits
    Write {
        /// REG.FIELD
        field: String,
        #[arg(value_parser = maybe_hex::<u32>)]
        value: u32,
    },
    /// Print the built-in register catalog
    List,
    /// Serve a simulated target on --host/--port instead of connecting to one
    Simulate {
        #[arg(long, default_value = "cpu0")]
        name: String,
        #[arg(long, default_value = "halted", value_parser = parse_state)]
        state: TargetState,
    },
}

#[derive(Parser)]
#[command(about = "Read microcontroller state through an on-chip debug server", long_about = None)]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(short, long, default_value = "4444")]
    port: u16,

    /// Target to select, the server's current target otherwise
    #[arg(short, long)]
    target: Option<String>,

    /// Halt the target if it is running, required for core registers
    #[arg(long)]
    halt: bool,

    /// Reset and run the target if it is not running
    #[arg(long)]
    restart: bool,

    #[arg(long, default_value = "2000", help = "The response timeout in milliseconds")]
    timeout_ms: u64,

    /// Firmware symbol as NAME=ADDR:SIZE, may be repeated
    #[arg(long = "symbol", value_parser = parse_symbol)]
    symbols: Vec<(String, Address, usize)>,

    #[clap(subcommand)]
    action: Action,
}

/// A request as given on the command line. Symbols without a width take the
/// size from the symbol table.
#[derive(Clone, Debug, Eq, PartialEq)]
enum RequestSpec {
    Request(ReadRequest),
    Symbol { name: String, width: Option<usize> },
}

impl RequestSpec {
    fn resolve(self, symbols: &SymbolTable) -> ReadRequest {
        match self {
            RequestSpec::Request(request) => request,
            RequestSpec::Symbol { name, width } => {
                let width = width
                    .or_else(|| symbols.get(&name).map(|symbol| symbol.size))
                    .unwrap_or(DEFAULT_WIDTH);
                ReadRequest::symbol(name, width)
            }
        }
    }
}

fn parse_width(s: &str) -> Result<usize, String> {
    s.parse()
        .map_err(|_| format!("'{}' is not a width in bytes", s))
}

fn parse_spec(s: &str) -> Result<RequestSpec, String> {
    let (kind, rest) = s
        .split_once(':')
        .ok_or_else(|| format!("'{}' has no kind, use core:, mmap:, mem: or sym:", s))?;
    let spec = match kind {
        "core" => RequestSpec::Request(match rest.split_once('.') {
            Some((register, field)) => ReadRequest::core_bits(register, field),
            None => ReadRequest::core(rest),
        }),
        "mmap" => RequestSpec::Request(match rest.split_once('.') {
            Some((register, field)) => ReadRequest::mmap_bits(register, field),
            None => ReadRequest::mmap(rest),
        }),
        "mem" => {
            let (address, width) = match rest.split_once(':') {
                Some((address, width)) => (address, parse_width(width)?),
                None => (rest, DEFAULT_WIDTH),
            };
            RequestSpec::Request(ReadRequest::memory(maybe_hex::<Address>(address)?, width))
        }
        "sym" => match rest.split_once(':') {
            Some((name, width)) => RequestSpec::Symbol {
                name: name.to_string(),
                width: Some(parse_width(width)?),
            },
            None => RequestSpec::Symbol {
                name: rest.to_string(),
                width: None,
            },
        },
        other => return Err(format!("Unknown request kind '{}'", other)),
    };
    Ok(spec)
}

fn parse_symbol(s: &str) -> Result<(String, Address, usize), String> {
    let malformed = || format!("'{}' is not NAME=ADDR:SIZE", s);
    let (name, location) = s.split_once('=').ok_or_else(malformed)?;
    let (address, size) = location.split_once(':').ok_or_else(malformed)?;
    Ok((
        name.to_string(),
        maybe_hex::<Address>(address)?,
        parse_width(size)?,
    ))
}

fn parse_state(s: &str) -> Result<TargetState, String> {
    s.parse().map_err(|e| format!("{}", e))
}

/// Registers with their location, each followed by its fields.
fn list_catalog(catalog: &Catalog) -> Vec<String> {
    let mut lines = Vec::new();
    for register in catalog.iter() {
        lines.push(format!(
            "{:<12} {:<24} {}",
            register.name(),
            register.location().to_string(),
            register.description().unwrap_or_default()
        ));
        for field in register.fields() {
            lines.push(format!("    {}", field.summary()));
        }
    }
    lines
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("Parsed arguments: host={}, port={}", args.host, args.port);

    let catalog = armv7m::catalog()?;
    let symbols: SymbolTable = args.symbols.into_iter().collect();

    let mut config = Builder::new()
        .response_timeout(Duration::from_millis(args.timeout_ms))
        .restart_if_not_running(args.restart)
        .halt_if_running(args.halt);
    if let Some(target) = args.target {
        config = config.target(target);
    }
    let connector = Connector::new(args.host.clone(), args.port, config.build());

    match args.action {
        Action::Read { requests } => {
            let requests: Vec<ReadRequest> = requests
                .into_iter()
                .map(|spec| spec.resolve(&symbols))
                .collect();
            let reader = Reader::new(connector, catalog).with_symbols(symbols);
            for outcome in reader.read(&requests)? {
                match outcome.result {
                    Ok(decoded) => println!("{}", decoded.description),
                    Err(unreadable) => println!("{}: {}", outcome.request.key(), unreadable),
                }
            }
        }
        Action::Write { field, value } => {
            let (register, field) = field
                .split_once('.')
                .ok_or_else(|| format!("'{}' is not REG.FIELD", field))?;
            let reader = Reader::new(connector, catalog);
            let written = reader.write_field(register, field, value)?;
            println!("{} = 0x{:08X}", register, written);
        }
        Action::List => {
            for line in list_catalog(&catalog) {
                println!("{}", line);
            }
        }
        Action::Simulate { name, state } => {
            let target = MemoryTarget::new(name, state);
            // Cortex-M7 r1p1
            target.write_word(0xE000_ED00, 0x411F_C271);
            let server = regspy_sim::server::Builder::new().build(target);
            log::info!("Simulating on {}:{}", args.host, args.port);
            server.listen((args.host.as_str(), args.port))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_specs() {
        assert_eq!(
            parse_spec("core:PC"),
            Ok(RequestSpec::Request(ReadRequest::core("PC")))
        );
        assert_eq!(
            parse_spec("core:xPSR.APSR:N"),
            Ok(RequestSpec::Request(ReadRequest::core_bits("xPSR", "APSR:N")))
        );
        assert_eq!(
            parse_spec("mmap:SYST_CSR.ENABLE"),
            Ok(RequestSpec::Request(ReadRequest::mmap_bits("SYST_CSR", "ENABLE")))
        );
        assert_eq!(
            parse_spec("mem:0x20000000:2"),
            Ok(RequestSpec::Request(ReadRequest::memory(0x2000_0000, 2)))
        );
        assert_eq!(
            parse_spec("mem:1024"),
            Ok(RequestSpec::Request(ReadRequest::memory(1024, 4)))
        );
        assert!(parse_spec("PC").is_err());
        assert!(parse_spec("disk:0").is_err());
        assert!(parse_spec("mem:0x0:two").is_err());
    }

    #[test]
    fn symbol_width_from_table() {
        let symbols: SymbolTable = [parse_symbol("gFlags=0x20000010:2").unwrap()]
            .into_iter()
            .collect();
        assert_eq!(
            parse_spec("sym:gFlags").unwrap().resolve(&symbols),
            ReadRequest::symbol("gFlags", 2)
        );
        assert_eq!(
            parse_spec("sym:gFlags:4").unwrap().resolve(&symbols),
            ReadRequest::symbol("gFlags", 4)
        );
        assert_eq!(
            parse_spec("sym:gOther").unwrap().resolve(&symbols),
            ReadRequest::symbol("gOther", DEFAULT_WIDTH)
        );
        assert!(parse_symbol("gFlags=0x20000010").is_err());
    }

    #[test]
    fn list_shows_field_descriptions() {
        let lines = list_catalog(&armv7m::catalog().unwrap());
        assert!(lines.iter().any(|line| line.starts_with("SYST_CSR ")));
        assert!(lines.contains(&"    ENABLE [0] Enables the counter".to_string()));
        assert!(lines.contains(
            &"    COUNTFLAG [16] 1 if the timer counted to 0 since this register was last read"
                .to_string()
        ));
    }
}
