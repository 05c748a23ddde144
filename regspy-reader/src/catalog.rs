//! Register catalogs and symbol tables
//!
//! Both are plain values built once and handed to the [`Planner`](crate::plan::Planner).
//! Nothing in here talks to the debug server.
use std::{
    collections::{BTreeMap, HashMap, btree_map::Entry},
    fmt::Display,
};

use regspy_protocol::Address;

use crate::{
    bits::{self, BitField},
    error::{CatalogError, RegisterKind},
};

pub mod armv7m;

/// Where a register is read from.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Location {
    /// Memory-mapped, read like ordinary memory.
    Address(Address),
    /// Core register, addressed by the selector the debug server understands.
    Core(String),
}

impl Location {
    pub fn kind(&self) -> RegisterKind {
        match self {
            Location::Address(_) => RegisterKind::MemoryMapped,
            Location::Core(_) => RegisterKind::Core,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Address(address) => write!(f, "0x{:08x}", address),
            Location::Core(selector) => write!(f, "core register '{}'", selector),
        }
    }
}

/// A 32 bit register together with its bit-fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterDescriptor {
    name: String,
    location: Location,
    description: Option<String>,
    fields: Vec<BitField>,
}

impl RegisterDescriptor {
    /// A memory-mapped register at `address`.
    pub fn mmap(name: impl Into<String>, address: Address) -> RegisterDescriptor {
        RegisterDescriptor::new(name, Location::Address(address))
    }

    /// A core register read with `reg <selector>`.
    pub fn core(name: impl Into<String>, selector: impl Into<String>) -> RegisterDescriptor {
        RegisterDescriptor::new(name, Location::Core(selector.into()))
    }

    pub fn new(name: impl Into<String>, location: Location) -> RegisterDescriptor {
        RegisterDescriptor {
            name: name.into(),
            location,
            description: None,
            fields: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: BitField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = BitField>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Bit-fields in declaration order.
    pub fn fields(&self) -> &[BitField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&BitField> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// The register value followed by the value of every bit-field.
    pub fn describe(&self, raw: u32) -> String {
        bits::describe_register(&self.name, raw, &self.fields)
    }
}

/// Registers of one chip family, by name.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    registers: BTreeMap<String, RegisterDescriptor>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    pub fn from_registers(
        registers: impl IntoIterator<Item = RegisterDescriptor>,
    ) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::new();
        for register in registers {
            catalog.insert(register)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, register: RegisterDescriptor) -> Result<(), CatalogError> {
        match self.registers.entry(register.name.clone()) {
            Entry::Occupied(_) => Err(CatalogError::DuplicateRegister(register.name)),
            Entry::Vacant(entry) => {
                entry.insert(register);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegisterDescriptor> {
        self.registers.get(name)
    }

    /// Registers ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &RegisterDescriptor> {
        self.registers.values()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

/// Address and size of a firmware symbol.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Symbol {
    pub address: Address,
    /// Size in bytes as recorded in the debug information.
    pub size: usize,
}

/// Firmware symbols by name, as extracted from the debug information of an image.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Adds or replaces a symbol.
    pub fn insert(&mut self, name: impl Into<String>, address: Address, size: usize) {
        self.symbols.insert(name.into(), Symbol { address, size });
    }

    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Address, usize)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (S, Address, usize)>>(iter: I) -> Self {
        let mut table = SymbolTable::new();
        for (name, address, size) in iter {
            table.insert(name, address, size);
        }
        table
    }
}
