use std::fmt::Display;

use regspy_protocol::Address;

/// One item the caller wants read.
///
/// Widths are in bytes. Register widths default to the full 4 byte register.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ReadRequest {
    CoreRegister { name: String, width: usize },
    CoreRegisterBits { register: String, field: String },
    MmapRegister { name: String, width: usize },
    MmapRegisterBits { register: String, field: String },
    MemoryCell { address: Address, width: usize },
    /// A firmware symbol; `width` must equal the size from the symbol table.
    Symbol { name: String, width: usize },
}

impl ReadRequest {
    pub fn core(name: impl Into<String>) -> ReadRequest {
        ReadRequest::CoreRegister {
            name: name.into(),
            width: 4,
        }
    }

    pub fn core_bits(register: impl Into<String>, field: impl Into<String>) -> ReadRequest {
        ReadRequest::CoreRegisterBits {
            register: register.into(),
            field: field.into(),
        }
    }

    pub fn mmap(name: impl Into<String>) -> ReadRequest {
        ReadRequest::MmapRegister {
            name: name.into(),
            width: 4,
        }
    }

    pub fn mmap_bits(register: impl Into<String>, field: impl Into<String>) -> ReadRequest {
        ReadRequest::MmapRegisterBits {
            register: register.into(),
            field: field.into(),
        }
    }

    pub fn memory(address: Address, width: usize) -> ReadRequest {
        ReadRequest::MemoryCell { address, width }
    }

    pub fn symbol(name: impl Into<String>, width: usize) -> ReadRequest {
        ReadRequest::Symbol {
            name: name.into(),
            width,
        }
    }

    /// True for requests that need a halted target.
    pub fn is_core(&self) -> bool {
        matches!(
            self,
            ReadRequest::CoreRegister { .. } | ReadRequest::CoreRegisterBits { .. }
        )
    }

    /// Short name identifying the request in results: `NAME`, `REG.FIELD`,
    /// `0x<address>` or the symbol name.
    pub fn key(&self) -> String {
        match self {
            ReadRequest::CoreRegister { name, .. }
            | ReadRequest::MmapRegister { name, .. }
            | ReadRequest::Symbol { name, .. } => name.clone(),
            ReadRequest::CoreRegisterBits { register, field }
            | ReadRequest::MmapRegisterBits { register, field } => {
                format!("{}.{}", register, field)
            }
            ReadRequest::MemoryCell { address, .. } => format!("0x{:08x}", address),
        }
    }
}

impl Display for ReadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadRequest::CoreRegister { name, width } => write!(f, "core {} ({}B)", name, width),
            ReadRequest::CoreRegisterBits { register, field } => {
                write!(f, "core {}.{}", register, field)
            }
            ReadRequest::MmapRegister { name, width } => write!(f, "mmap {} ({}B)", name, width),
            ReadRequest::MmapRegisterBits { register, field } => {
                write!(f, "mmap {}.{}", register, field)
            }
            ReadRequest::MemoryCell { address, width } => {
                write!(f, "memory 0x{:08x} ({}B)", address, width)
            }
            ReadRequest::Symbol { name, width } => write!(f, "symbol {} ({}B)", name, width),
        }
    }
}

#[test]
fn request_keys() {
    assert_eq!(ReadRequest::core("PC").key(), "PC");
    assert_eq!(ReadRequest::mmap_bits("SYST_CSR", "ENABLE").key(), "SYST_CSR.ENABLE");
    assert_eq!(ReadRequest::memory(0x2000_0000, 4).key(), "0x20000000");
    assert_eq!(ReadRequest::symbol("gCounter", 4).key(), "gCounter");
    assert!(ReadRequest::core_bits("xPSR", "EPSR:T").is_core());
    assert!(!ReadRequest::mmap("SYST_CSR").is_core());
    assert_eq!(
        ReadRequest::memory(0x2000_0000, 2).to_string(),
        "memory 0x20000000 (2B)"
    );
}
