use std::{error::Error, fmt::Display};

use regspy_client::SessionError;

/// Whether a register lives in the core or in the memory map.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegisterKind {
    Core,
    MemoryMapped,
}

impl Display for RegisterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterKind::Core => write!(f, "core"),
            RegisterKind::MemoryMapped => write!(f, "memory-mapped"),
        }
    }
}

/// Errors that fail a whole batch.
///
/// All variants except [`ReaderError::Session`] are detected while planning,
/// before the debug server is contacted.
#[derive(Debug)]
pub enum ReaderError {
    UnknownRegister(String),
    UnknownBitField {
        register: String,
        field: String,
    },
    UnknownSymbol(String),
    /// The requested width differs from the size recorded in the symbol table.
    SizeMismatch {
        symbol: String,
        size: usize,
        requested: usize,
    },
    UnsupportedWidth(usize),
    WrongRegisterKind {
        register: String,
        expected: RegisterKind,
    },
    /// Core registers are requested but the halt policy is off.
    HaltRequired,
    FieldValueOverflow {
        field: String,
        value: u32,
        bits: usize,
    },
    Session(SessionError),
}

impl From<SessionError> for ReaderError {
    fn from(value: SessionError) -> Self {
        ReaderError::Session(value)
    }
}

impl Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::UnknownRegister(name) => write!(f, "Register '{}' is not in the catalog", name),
            ReaderError::UnknownBitField { register, field } => {
                write!(f, "Register '{}' has no bit-field '{}'", register, field)
            }
            ReaderError::UnknownSymbol(name) => write!(f, "Symbol '{}' not found", name),
            ReaderError::SizeMismatch {
                symbol,
                size,
                requested,
            } => write!(
                f,
                "Symbol '{}' is {} bytes, requested {} bytes",
                symbol, size, requested
            ),
            ReaderError::UnsupportedWidth(width) => write!(f, "Unsupported width of {} bytes", width),
            ReaderError::WrongRegisterKind { register, expected } => {
                write!(f, "Register '{}' is not a {} register", register, expected)
            }
            ReaderError::HaltRequired => write!(
                f,
                "Reading core registers requires the halt-if-running policy"
            ),
            ReaderError::FieldValueOverflow { field, value, bits } => write!(
                f,
                "Value {} does not fit into the {} bits of '{}'",
                value, bits, field
            ),
            ReaderError::Session(error) => write!(f, "{}", error),
        }
    }
}

impl Error for ReaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReaderError::Session(error) => Some(error),
            _ => None,
        }
    }
}

/// Invalid bit-field definition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BitFieldError {
    BlankName,
    NoPositions(String),
    /// Only 32 bit containers are supported.
    PositionOutOfRange { field: String, position: u8 },
    DuplicatePosition { field: String, position: u8 },
}

impl Display for BitFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BitFieldError::BlankName => write!(f, "Bit-field name cannot be blank"),
            BitFieldError::NoPositions(field) => write!(f, "Bit-field '{}' has no bits", field),
            BitFieldError::PositionOutOfRange { field, position } => write!(
                f,
                "Bit {} of '{}' is outside of a 32 bit register",
                position, field
            ),
            BitFieldError::DuplicatePosition { field, position } => {
                write!(f, "Bit {} appears twice in '{}'", position, field)
            }
        }
    }
}

impl Error for BitFieldError {}

/// Invalid register catalog.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CatalogError {
    DuplicateRegister(String),
    BitField(BitFieldError),
}

impl From<BitFieldError> for CatalogError {
    fn from(value: BitFieldError) -> Self {
        CatalogError::BitField(value)
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::DuplicateRegister(name) => {
                write!(f, "Register '{}' is already in the catalog", name)
            }
            CatalogError::BitField(error) => write!(f, "{}", error),
        }
    }
}

impl Error for CatalogError {}
