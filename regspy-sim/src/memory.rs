use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use regspy_protocol::{Address, TargetState, Unit};

use crate::DebugTarget;

#[derive(Debug)]
struct Inner {
    state: TargetState,
    memory: BTreeMap<Address, u8>,
    registers: HashMap<String, u32>,
}

/// A target with sparse little-endian memory and a register file.
/// Memory that was never written reads as zero.
#[derive(Debug)]
pub struct MemoryTarget {
    name: String,
    inner: Mutex<Inner>,
}

impl MemoryTarget {
    pub fn new(name: impl Into<String>, state: TargetState) -> MemoryTarget {
        MemoryTarget {
            name: name.into(),
            inner: Mutex::new(Inner {
                state,
                memory: BTreeMap::new(),
                registers: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_state(&self, state: TargetState) {
        self.lock().state = state;
    }

    pub fn write_word(&self, address: Address, value: u32) {
        self.write_memory(address, Unit::Word, value);
    }

    pub fn word(&self, address: Address) -> u32 {
        self.read_memory(address, Unit::Word)
    }

    pub fn set_register(&self, selector: impl Into<String>, value: u32) {
        self.lock().registers.insert(selector.into(), value);
    }
}

impl DebugTarget for MemoryTarget {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn state(&self) -> TargetState {
        self.lock().state
    }

    fn halt(&self) {
        let mut inner = self.lock();
        if inner.state.is_running() {
            inner.state = TargetState::Halted;
        }
    }

    fn reset_run(&self) {
        self.lock().state = TargetState::Running;
    }

    fn read_memory(&self, address: Address, unit: Unit) -> u32 {
        let inner = self.lock();
        (0..unit.size()).fold(0, |value, i| {
            let byte = inner
                .memory
                .get(&(address + i as Address))
                .copied()
                .unwrap_or(0);
            value | (u32::from(byte) << (8 * i))
        })
    }

    fn write_memory(&self, address: Address, unit: Unit, value: u32) {
        let mut inner = self.lock();
        for (i, byte) in value.to_le_bytes()[..unit.size()].iter().enumerate() {
            inner.memory.insert(address + i as Address, *byte);
        }
    }

    fn read_register(&self, selector: &str) -> Option<u32> {
        self.lock().registers.get(selector).copied()
    }
}
