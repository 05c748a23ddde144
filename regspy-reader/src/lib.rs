//! # Register Reader
//!
//! Reads core registers, bit-fields of memory-mapped peripheral registers, raw
//! memory and firmware symbols from a running microcontroller, using as few
//! round trips to the debug server as possible.
//!
//! ## Pipeline
//!
//! 1. **Plan**: every [`ReadRequest`] is resolved against a [`Catalog`] of registers
//!    and a [`SymbolTable`]. All locations end up in a [`ReadPlan`] that holds each
//!    address and each core register once, with the largest width requested for it.
//!    Configuration errors such as unknown names are reported here, before the
//!    target is contacted.
//! 2. **Execute**: one session is opened and every planned location is read
//!    exactly once.
//! 3. **Decode**: each request is decoded from the samples of its location, with
//!    support for non-contiguous bit-fields.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use regspy_client::{Builder, Connector};
//! use regspy_reader::{ReadRequest, Reader, catalog::armv7m};
//!
//! let config = Builder::new().halt_if_running(true).build();
//! let reader = Reader::new(Connector::new("localhost", 4444, config), armv7m::catalog()?);
//!
//! let results = reader.read(&[
//!     ReadRequest::core("PC"),
//!     ReadRequest::mmap_bits("SYST_CSR", "ENABLE"),
//!     ReadRequest::mmap_bits("SYST_CSR", "TICKINT"),
//! ])?;
//! // two physical reads: `reg pc` and `mdw 0xe000e010 1`
//! for outcome in results.iter() {
//!     match &outcome.result {
//!         Ok(decoded) => println!("{}", decoded.description),
//!         Err(unreadable) => println!("{}: {}", outcome.request, unreadable),
//!     }
//! }
//! ```
//!
//! ## Errors
//!
//! A batch either fails as a whole with a [`ReaderError`] (unknown names, size
//! mismatches, protocol errors) or succeeds with one result per request. A core
//! register that the server could not read, typically because the target is
//! running, is reported as [`Unreadable`] for that request only.
pub mod bits;
pub mod catalog;
mod decode;
mod error;
pub mod executor;
pub mod plan;
mod reader;
mod request;

#[cfg(test)]
mod fake;

pub use catalog::{Catalog, Location, RegisterDescriptor, Symbol, SymbolTable};
pub use decode::{DecodedResult, Unreadable, decode};
pub use error::{BitFieldError, CatalogError, ReaderError, RegisterKind};
pub use executor::{Connect, Executor, RawSamples, TargetAccess};
pub use plan::{Plan, Planner, ReadPlan};
pub use reader::{ReadOutcome, ReadResults, Reader};
pub use request::ReadRequest;
