/// Encoding of commands and parsing of the server responses
use std::{
    io::{self, Write},
    str::FromStr,
};

use crate::{
    error::ProtocolError,
    protocol::{Address, Command, TargetInfo, TargetState, Unit},
};

/// Phrases the server prints when a core register cannot be read,
/// typically because the target is not halted.
const REGISTER_UNAVAILABLE: [&str; 2] = ["not halted", "could not read"];

impl Command {
    /// Writes the command line, terminated by a single newline.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "{}", self)
    }
}

/// Parses a command line as received by the server.
/// Lines that are not one of the known commands become [`Command::Raw`].
impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Command, ProtocolError> {
        let malformed = || ProtocolError::MalformedLine(line.to_string());
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            ["targets"] => Command::Targets,
            ["targets", name] => Command::SelectTarget(name.to_string()),
            ["target", "current"] => Command::TargetCurrent,
            ["halt"] => Command::Halt,
            ["reset", "run"] => Command::ResetRun,
            ["reg", selector] => Command::ReadRegister(selector.to_string()),
            [name, args @ ..] if memory_command(name).is_some() => {
                let (write, unit) = memory_command(name).ok_or_else(malformed)?;
                match (write, args) {
                    (false, [address]) => Command::ReadMemory {
                        address: parse_number(address)?,
                        unit,
                        count: 1,
                    },
                    (false, [address, count]) => Command::ReadMemory {
                        address: parse_number(address)?,
                        unit,
                        count: u32::try_from(parse_number(count)?).map_err(|_| malformed())?,
                    },
                    (true, [address, value]) => Command::WriteMemory {
                        address: parse_number(address)?,
                        unit,
                        value: u32::try_from(parse_number(value)?).map_err(|_| malformed())?,
                    },
                    _ => return Err(malformed()),
                }
            }
            _ => Command::Raw(line.trim().to_string()),
        };
        Ok(command)
    }
}

/// `mdw` -> (false, Word), `mwb` -> (true, Byte)
fn memory_command(name: &str) -> Option<(bool, Unit)> {
    let mut chars = name.chars();
    let write = match (chars.next(), chars.next()) {
        (Some('m'), Some('d')) => false,
        (Some('m'), Some('w')) => true,
        _ => return None,
    };
    let unit = Unit::from_suffix(chars.next()?)?;
    match chars.next() {
        None => Some((write, unit)),
        Some(_) => None,
    }
}

/// Hex with a `0x` prefix, decimal otherwise.
fn parse_number(s: &str) -> Result<u64, ProtocolError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => Ok(u64::from_str_radix(digits, 16)?),
        None => Ok(s.parse()?),
    }
}

/// Position of the prompt byte, once it has been received.
/// The prompt only counts at the start of a line.
pub fn prompt_position(buf: &[u8], prompt: u8) -> Option<usize> {
    buf.iter()
        .enumerate()
        .position(|(i, b)| *b == prompt && (i == 0 || buf[i - 1] == b'\n'))
}

/// The interior lines of one response, i.e. without the echoed command and the prompt.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Response {
    pub lines: Vec<String>,
    /// false if the prompt never arrived and the lines may be truncated
    pub complete: bool,
}

impl Response {
    /// Splits the raw bytes received after sending `echo` into a response.
    ///
    /// The first line must repeat `echo`. A missing prompt is not an error,
    /// the response is marked incomplete instead.
    pub fn from_bytes(echo: &str, bytes: &[u8], prompt: u8) -> Result<Response, ProtocolError> {
        let text = str::from_utf8(bytes)?;
        if text.is_empty() {
            return Ok(Response::default());
        }

        let mut lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .collect();

        let prompt = char::from(prompt);
        let complete = lines
            .last()
            .is_some_and(|line| line.trim().starts_with(prompt) && line.trim().len() == 1);
        if complete {
            lines.pop();
        }

        // A lone, unterminated first line is a truncated echo
        if !complete && lines.len() == 1 {
            return Ok(Response::default());
        }

        // A prompt left over from an earlier command
        if lines.is_empty() {
            return Err(ProtocolError::EchoMismatch {
                expected: echo.to_string(),
                got: String::new(),
            });
        }

        let first = lines.remove(0);
        if first.trim_end() != echo {
            return Err(ProtocolError::EchoMismatch {
                expected: echo.to_string(),
                got: first.to_string(),
            });
        }

        let lines = lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.trim_end().to_string())
            .collect();
        Ok(Response { lines, complete })
    }

    /// Returns the only interior line.
    pub fn single_line(&self) -> Result<&str, ProtocolError> {
        match self.lines.as_slice() {
            [line] => Ok(line.as_str()),
            [] => Err(ProtocolError::MalformedLine(String::new())),
            lines => Err(ProtocolError::MalformedLine(lines.join("\\n"))),
        }
    }
}

fn parse_hex(s: &str) -> Result<u64, ProtocolError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    Ok(u64::from_str_radix(digits, 16)?)
}

/// Parses a memory display line of the form `0x<address>: <value> [<value> ...]`
/// into exactly `count * unit.size()` little-endian bytes.
pub fn parse_memory_line(
    line: &str,
    address: Address,
    unit: Unit,
    count: u32,
) -> Result<Vec<u8>, ProtocolError> {
    let malformed = || ProtocolError::MalformedLine(line.to_string());

    let (addr_part, values_part) = line.split_once(':').ok_or_else(malformed)?;
    let line_address = parse_hex(addr_part.trim()).map_err(|_| malformed())?;
    if line_address != address {
        return Err(malformed());
    }

    let values: Vec<&str> = values_part.split_whitespace().collect();
    if values.len() != count as usize {
        return Err(malformed());
    }

    let mut bytes = Vec::with_capacity(count as usize * unit.size());
    for value in values {
        let value = u64::from_str_radix(value, 16).map_err(|_| malformed())?;
        if value >> (unit.size() * 8) != 0 {
            return Err(malformed());
        }
        bytes.extend_from_slice(&value.to_le_bytes()[..unit.size()]);
    }
    Ok(bytes)
}

/// Formats a memory display line, the inverse of [`parse_memory_line`].
pub fn format_memory_line(address: Address, unit: Unit, values: &[u32]) -> String {
    let digits = unit.size() * 2;
    let values: Vec<String> = values
        .iter()
        .map(|value| format!("{:0digits$x}", value, digits = digits))
        .collect();
    format!("0x{:08x}: {} ", address, values.join(" "))
}

/// Formats the output of a successful register read.
pub fn format_register_line(selector: &str, value: u32) -> String {
    format!("{} (/32): 0x{:08x}", selector, value)
}

/// Parses the body of a register read of the form `<name> (/32): 0x<value>`.
///
/// Returns `None` if the server reports that the register could not be read.
pub fn parse_register_lines(lines: &[String]) -> Result<Option<u32>, ProtocolError> {
    let unavailable = lines.iter().any(|line| {
        let line = line.to_ascii_lowercase();
        REGISTER_UNAVAILABLE
            .iter()
            .any(|phrase| line.contains(phrase))
    });
    if unavailable {
        return Ok(None);
    }

    let line = match lines {
        [line] => line,
        _ => return Err(ProtocolError::MalformedLine(lines.join("\\n"))),
    };
    let (_, value) = line
        .rsplit_once(':')
        .ok_or_else(|| ProtocolError::MalformedLine(line.clone()))?;
    let value = parse_hex(value.trim()).map_err(|_| ProtocolError::MalformedLine(line.clone()))?;
    let value = u32::try_from(value).map_err(|_| ProtocolError::MalformedLine(line.clone()))?;
    Ok(Some(value))
}

/// Parses the target table printed by the `targets` command.
///
/// ```text
///     TargetName         Type       Endian TapName            State
/// --  ------------------ ---------- ------ ------------------ ------------
///  0* stm32f7x.cpu       cortex_m   little stm32f7x.cpu       halted
/// ```
pub fn parse_targets(lines: &[String]) -> Result<Vec<TargetInfo>, ProtocolError> {
    let mut targets = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(index) = fields.first() else {
            continue;
        };
        let (index, current) = match index.strip_suffix('*') {
            Some(index) => (index, true),
            None => (*index, false),
        };
        // Header and separator rows do not start with a number
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if fields.len() < 3 {
            return Err(ProtocolError::MalformedLine(line.clone()));
        }
        let state: TargetState = fields[fields.len() - 1].parse()?;
        targets.push(TargetInfo {
            name: fields[1].to_string(),
            state,
            current,
        });
    }
    Ok(targets)
}
