//! Executes a [`ReadPlan`] over one debug server session
use std::collections::BTreeMap;

use regspy_client::{Connector, Session, SessionError, Transport};
use regspy_protocol::{Address, Unit, Width};

use crate::plan::ReadPlan;

/// The read and write primitives the executor needs from a session.
pub trait TargetAccess {
    fn read_memory(&mut self, address: Address, width: Width) -> Result<Vec<u8>, SessionError>;

    /// `None` if the register cannot be read right now.
    fn read_core_register(&mut self, selector: &str) -> Result<Option<[u8; 4]>, SessionError>;

    fn write_memory(
        &mut self,
        address: Address,
        unit: Unit,
        value: u32,
    ) -> Result<(), SessionError>;
}

impl<T: Transport> TargetAccess for Session<T> {
    fn read_memory(&mut self, address: Address, width: Width) -> Result<Vec<u8>, SessionError> {
        Session::read_memory(self, address, width)
    }

    fn read_core_register(&mut self, selector: &str) -> Result<Option<[u8; 4]>, SessionError> {
        Session::read_core_register(self, selector)
    }

    fn write_memory(
        &mut self,
        address: Address,
        unit: Unit,
        value: u32,
    ) -> Result<(), SessionError> {
        Session::write_memory(self, address, unit, value)
    }
}

/// Opens a fresh session for every batch. The session is released when the
/// returned value is dropped.
pub trait Connect {
    type Access: TargetAccess;

    fn connect(&self) -> Result<Self::Access, SessionError>;

    /// Whether sessions halt a running target before they are handed out.
    fn halt_if_running(&self) -> bool;
}

impl Connect for Connector {
    type Access = Session;

    fn connect(&self) -> Result<Session, SessionError> {
        Connector::connect(self)
    }

    fn halt_if_running(&self) -> bool {
        self.config().halt_if_running
    }
}

/// Bytes read for one plan.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawSamples {
    memory: BTreeMap<Address, Vec<u8>>,
    core: BTreeMap<String, Option<[u8; 4]>>,
}

impl RawSamples {
    pub fn memory(&self, address: Address) -> Option<&[u8]> {
        self.memory.get(&address).map(Vec::as_slice)
    }

    /// `None` both for registers that could not be read and for registers
    /// that were not part of the plan.
    pub fn core(&self, selector: &str) -> Option<[u8; 4]> {
        self.core.get(selector).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.memory.len() + self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Performs every read of `plan` exactly once over `access`.
///
/// The first session error aborts the whole plan.
pub fn fetch(access: &mut impl TargetAccess, plan: &ReadPlan) -> Result<RawSamples, SessionError> {
    let mut samples = RawSamples::default();
    for (address, width) in plan.by_address() {
        let bytes = access.read_memory(*address, *width)?;
        log::debug!("0x{:08x}: {:02x?}", address, bytes);
        samples.memory.insert(*address, bytes);
    }
    for selector in plan.by_core_selector().keys() {
        let value = access.read_core_register(selector)?;
        log::debug!("{}: {:02x?}", selector, value);
        samples.core.insert(selector.clone(), value);
    }
    Ok(samples)
}

/// Executes plans, each one in its own session.
pub struct Executor<'c, C: Connect> {
    connector: &'c C,
}

impl<'c, C: Connect> Executor<'c, C> {
    pub fn new(connector: &'c C) -> Executor<'c, C> {
        Executor { connector }
    }

    /// Opens a session, performs all reads and closes the session again,
    /// also when a read fails. An empty plan does not connect at all.
    pub fn execute(&self, plan: &ReadPlan) -> Result<RawSamples, SessionError> {
        if plan.is_empty() {
            return Ok(RawSamples::default());
        }
        let mut access = self.connector.connect()?;
        fetch(&mut access, plan)
    }
}
