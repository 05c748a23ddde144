//! In-memory stand-in for a debug server session
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use regspy_client::SessionError;
use regspy_protocol::{Address, Unit, Width, error::ProtocolError};

use crate::executor::{Connect, TargetAccess};

#[derive(Default)]
struct State {
    memory: BTreeMap<Address, u8>,
    core: HashMap<String, u32>,
    halted: bool,
    fail_at: Option<Address>,
    reads: usize,
    sessions: usize,
    open: usize,
    writes: Vec<(Address, Unit, u32)>,
}

/// Counts sessions and physical reads.
#[derive(Clone)]
pub struct FakeConnector {
    state: Rc<RefCell<State>>,
    halt_if_running: bool,
}

impl FakeConnector {
    /// Halt policy on, core registers readable.
    pub fn halted() -> FakeConnector {
        FakeConnector::new(true)
    }

    /// Halt policy off, core registers unreadable.
    pub fn running() -> FakeConnector {
        FakeConnector::new(false)
    }

    fn new(halt: bool) -> FakeConnector {
        FakeConnector {
            state: Rc::new(RefCell::new(State {
                halted: halt,
                ..State::default()
            })),
            halt_if_running: halt,
        }
    }

    /// Makes core registers unreadable while keeping the halt policy.
    pub fn resume(&self) {
        self.state.borrow_mut().halted = false;
    }

    pub fn write_word(&self, address: Address, value: u32) {
        let mut state = self.state.borrow_mut();
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            state.memory.insert(address + i as Address, byte);
        }
    }

    pub fn read_word(&self, address: Address) -> u32 {
        let state = self.state.borrow();
        let bytes: Vec<u8> = (0..4)
            .map(|i| state.memory.get(&(address + i)).copied().unwrap_or(0))
            .collect();
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn set_core(&self, selector: &str, value: u32) {
        self.state
            .borrow_mut()
            .core
            .insert(selector.to_string(), value);
    }

    /// Reads at `address` fail like a broken connection.
    pub fn fail_at(&self, address: Address) {
        self.state.borrow_mut().fail_at = Some(address);
    }

    pub fn physical_reads(&self) -> usize {
        self.state.borrow().reads
    }

    pub fn sessions(&self) -> usize {
        self.state.borrow().sessions
    }

    pub fn open_sessions(&self) -> usize {
        self.state.borrow().open
    }

    pub fn writes(&self) -> Vec<(Address, Unit, u32)> {
        self.state.borrow().writes.clone()
    }
}

pub struct FakeAccess {
    state: Rc<RefCell<State>>,
}

impl Drop for FakeAccess {
    fn drop(&mut self) {
        self.state.borrow_mut().open -= 1;
    }
}

impl TargetAccess for FakeAccess {
    fn read_memory(&mut self, address: Address, width: Width) -> Result<Vec<u8>, SessionError> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        if state.fail_at == Some(address) {
            return Err(ProtocolError::UnexpectedEof.into());
        }
        Ok((0..width.bytes() as Address)
            .map(|i| state.memory.get(&(address + i)).copied().unwrap_or(0))
            .collect())
    }

    fn read_core_register(&mut self, selector: &str) -> Result<Option<[u8; 4]>, SessionError> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        if !state.halted {
            return Ok(None);
        }
        Ok(Some(
            state
                .core
                .get(selector)
                .copied()
                .unwrap_or(0)
                .to_le_bytes(),
        ))
    }

    fn write_memory(
        &mut self,
        address: Address,
        unit: Unit,
        value: u32,
    ) -> Result<(), SessionError> {
        let mut state = self.state.borrow_mut();
        state.writes.push((address, unit, value));
        for (i, byte) in value.to_le_bytes()[..unit.size()].iter().enumerate() {
            state.memory.insert(address + i as Address, *byte);
        }
        Ok(())
    }
}

impl Connect for FakeConnector {
    type Access = FakeAccess;

    fn connect(&self) -> Result<FakeAccess, SessionError> {
        let mut state = self.state.borrow_mut();
        state.sessions += 1;
        state.open += 1;
        Ok(FakeAccess {
            state: self.state.clone(),
        })
    }

    fn halt_if_running(&self) -> bool {
        self.halt_if_running
    }
}
