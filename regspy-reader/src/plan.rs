//! Turns read requests into the smallest set of physical reads
//!
//! Every request is resolved against the [`Catalog`] and the [`SymbolTable`]
//! into a [`Resolution`]. The locations behind all resolutions are collected
//! in a [`ReadPlan`], which holds each address and each core register selector
//! exactly once. The number of physical reads is therefore bounded by the number
//! of distinct locations, not by the number of requests.
use std::collections::{BTreeMap, btree_map::Entry};

use regspy_protocol::{Address, Width};

use crate::{
    bits::BitField,
    catalog::{Catalog, Location, RegisterDescriptor, SymbolTable},
    error::{ReaderError, RegisterKind},
    request::ReadRequest,
};

/// Distinct locations to read, with the width to read at each.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReadPlan {
    by_address: BTreeMap<Address, Width>,
    by_core_selector: BTreeMap<String, Width>,
}

impl ReadPlan {
    pub fn new() -> ReadPlan {
        ReadPlan::default()
    }

    /// Records a memory read. An address that is already planned keeps the
    /// larger of both widths.
    pub fn add_address(&mut self, address: Address, width: Width) {
        match self.by_address.entry(address) {
            Entry::Vacant(entry) => {
                entry.insert(width);
            }
            Entry::Occupied(mut entry) => {
                let planned = *entry.get();
                if planned != width {
                    log::warn!(
                        "Requests at 0x{:08x} differ in width ({} and {}), reading {}",
                        address,
                        planned,
                        width,
                        planned.max(width)
                    );
                    entry.insert(planned.max(width));
                }
            }
        }
    }

    /// Records a core register read. Core registers are always read whole.
    pub fn add_core(&mut self, selector: &str) {
        self.by_core_selector
            .entry(selector.to_string())
            .or_insert(Width::Word);
    }

    pub fn by_address(&self) -> &BTreeMap<Address, Width> {
        &self.by_address
    }

    pub fn by_core_selector(&self) -> &BTreeMap<String, Width> {
        &self.by_core_selector
    }

    /// Number of round trips needed to execute the plan.
    pub fn physical_reads(&self) -> usize {
        self.by_address.len() + self.by_core_selector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.physical_reads() == 0
    }
}

/// What a request refers to, once resolved.
#[derive(Clone, Debug)]
pub enum Resolution<'a> {
    /// A whole register, of which the first `width` bytes are reported.
    Register {
        register: &'a RegisterDescriptor,
        width: Width,
    },
    Field {
        register: &'a RegisterDescriptor,
        field: &'a BitField,
    },
    /// A raw memory cell or a symbol.
    Memory { address: Address, width: Width },
}

impl Resolution<'_> {
    /// Where the bytes for this resolution are read from.
    pub fn location(&self) -> Location {
        match self {
            Resolution::Register { register, .. } | Resolution::Field { register, .. } => {
                register.location().clone()
            }
            Resolution::Memory { address, .. } => Location::Address(*address),
        }
    }
}

/// A request together with its resolution.
#[derive(Clone, Debug)]
pub struct PlannedRequest<'a> {
    pub request: &'a ReadRequest,
    pub resolution: Resolution<'a>,
}

/// The outcome of planning one batch.
#[derive(Clone, Debug)]
pub struct Plan<'a> {
    pub reads: ReadPlan,
    /// In the order the requests were given.
    pub requests: Vec<PlannedRequest<'a>>,
}

/// Resolves requests against a catalog and a symbol table.
pub struct Planner<'a> {
    catalog: &'a Catalog,
    symbols: &'a SymbolTable,
    halt_if_running: bool,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a Catalog, symbols: &'a SymbolTable) -> Planner<'a> {
        Planner {
            catalog,
            symbols,
            halt_if_running: false,
        }
    }

    /// Whether the session that executes the plan halts a running target.
    /// Core registers can only be planned if it does.
    pub fn halt_if_running(mut self, halt: bool) -> Self {
        self.halt_if_running = halt;
        self
    }

    /// Resolves all requests. Fails on the first request that cannot be resolved;
    /// nothing is read in that case.
    pub fn plan(&self, requests: &'a [ReadRequest]) -> Result<Plan<'a>, ReaderError> {
        if !self.halt_if_running && requests.iter().any(ReadRequest::is_core) {
            return Err(ReaderError::HaltRequired);
        }

        let mut reads = ReadPlan::new();
        let mut planned = Vec::with_capacity(requests.len());
        for request in requests {
            let resolution = self.resolve(request)?;
            match &resolution {
                Resolution::Register { register, .. } | Resolution::Field { register, .. } => {
                    match register.location() {
                        Location::Address(address) => reads.add_address(*address, Width::Word),
                        Location::Core(selector) => reads.add_core(selector),
                    }
                }
                Resolution::Memory { address, width } => reads.add_address(*address, *width),
            }
            planned.push(PlannedRequest {
                request,
                resolution,
            });
        }

        log::info!(
            "{} requests -> {} physical reads",
            requests.len(),
            reads.physical_reads()
        );
        Ok(Plan {
            reads,
            requests: planned,
        })
    }

    fn resolve(&self, request: &ReadRequest) -> Result<Resolution<'a>, ReaderError> {
        match request {
            ReadRequest::CoreRegister { name, width } => Ok(Resolution::Register {
                register: self.register(name, RegisterKind::Core)?,
                width: register_width(*width)?,
            }),
            ReadRequest::MmapRegister { name, width } => Ok(Resolution::Register {
                register: self.register(name, RegisterKind::MemoryMapped)?,
                width: register_width(*width)?,
            }),
            ReadRequest::CoreRegisterBits { register, field } => {
                self.field(register, field, RegisterKind::Core)
            }
            ReadRequest::MmapRegisterBits { register, field } => {
                self.field(register, field, RegisterKind::MemoryMapped)
            }
            ReadRequest::MemoryCell { address, width } => Ok(Resolution::Memory {
                address: *address,
                width: memory_width(*width)?,
            }),
            ReadRequest::Symbol { name, width } => {
                let symbol = self
                    .symbols
                    .get(name)
                    .ok_or_else(|| ReaderError::UnknownSymbol(name.clone()))?;
                if symbol.size != *width {
                    return Err(ReaderError::SizeMismatch {
                        symbol: name.clone(),
                        size: symbol.size,
                        requested: *width,
                    });
                }
                Ok(Resolution::Memory {
                    address: symbol.address,
                    width: memory_width(*width)?,
                })
            }
        }
    }

    fn register(
        &self,
        name: &str,
        expected: RegisterKind,
    ) -> Result<&'a RegisterDescriptor, ReaderError> {
        let register = self
            .catalog
            .get(name)
            .ok_or_else(|| ReaderError::UnknownRegister(name.to_string()))?;
        if register.location().kind() != expected {
            return Err(ReaderError::WrongRegisterKind {
                register: name.to_string(),
                expected,
            });
        }
        Ok(register)
    }

    fn field(
        &self,
        register: &str,
        field: &str,
        expected: RegisterKind,
    ) -> Result<Resolution<'a>, ReaderError> {
        let register = self.register(register, expected)?;
        let field = register
            .field(field)
            .ok_or_else(|| ReaderError::UnknownBitField {
                register: register.name().to_string(),
                field: field.to_string(),
            })?;
        Ok(Resolution::Field { register, field })
    }
}

/// Memory cells and symbols can be 1, 2, 4 or 8 bytes wide.
fn memory_width(width: usize) -> Result<Width, ReaderError> {
    Width::from_bytes(width).ok_or(ReaderError::UnsupportedWidth(width))
}

/// Registers are 32 bit; a narrower width reports the low bytes.
fn register_width(width: usize) -> Result<Width, ReaderError> {
    match Width::from_bytes(width) {
        Some(Width::DoubleWord) | None => Err(ReaderError::UnsupportedWidth(width)),
        Some(width) => Ok(width),
    }
}
