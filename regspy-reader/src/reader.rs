use regspy_client::Connector;
use regspy_protocol::{Unit, Width};

use crate::{
    bits,
    catalog::{Catalog, Location, SymbolTable},
    decode::{DecodedResult, Unreadable, decode},
    error::{ReaderError, RegisterKind},
    executor::{Connect, Executor, TargetAccess},
    plan::{Plan, Planner},
    request::ReadRequest,
};

/// The result for one request of a batch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadOutcome {
    pub request: ReadRequest,
    pub result: Result<DecodedResult, Unreadable>,
}

/// Results of one batch, in request order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReadResults {
    outcomes: Vec<ReadOutcome>,
}

impl ReadResults {
    pub fn get(&self, index: usize) -> Option<&ReadOutcome> {
        self.outcomes.get(index)
    }

    /// The first outcome whose request has the given [key](ReadRequest::key).
    pub fn find(&self, key: &str) -> Option<&ReadOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.request.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReadOutcome> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl IntoIterator for ReadResults {
    type Item = ReadOutcome;
    type IntoIter = std::vec::IntoIter<ReadOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

/// Reads batches of requests from one target.
///
/// Every call plans the whole batch first and only then opens a session, so a
/// batch with an unknown name never touches the target. Nothing is cached
/// between calls.
pub struct Reader<C: Connect = Connector> {
    connector: C,
    catalog: Catalog,
    symbols: SymbolTable,
}

impl<C: Connect> Reader<C> {
    pub fn new(connector: C, catalog: Catalog) -> Reader<C> {
        Reader {
            connector,
            catalog,
            symbols: SymbolTable::new(),
        }
    }

    pub fn with_symbols(mut self, symbols: SymbolTable) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Resolves `requests` without reading anything.
    pub fn plan<'a>(&'a self, requests: &'a [ReadRequest]) -> Result<Plan<'a>, ReaderError> {
        Planner::new(&self.catalog, &self.symbols)
            .halt_if_running(self.connector.halt_if_running())
            .plan(requests)
    }

    /// Reads all requests in one session.
    ///
    /// Fails as a whole on planning and session errors. Locations that could not
    /// be read are reported per request.
    pub fn read(&self, requests: &[ReadRequest]) -> Result<ReadResults, ReaderError> {
        let plan = self.plan(requests)?;
        let samples = Executor::new(&self.connector).execute(&plan.reads)?;
        let outcomes = plan
            .requests
            .iter()
            .map(|planned| ReadOutcome {
                request: planned.request.clone(),
                result: decode(planned, &samples),
            })
            .collect();
        Ok(ReadResults { outcomes })
    }

    /// Sets a bit-field of a memory-mapped register, keeping all other bits.
    ///
    /// The register is read, modified and written back in one session.
    /// Returns the value written.
    pub fn write_field(&self, register: &str, field: &str, value: u32) -> Result<u32, ReaderError> {
        let descriptor = self
            .catalog
            .get(register)
            .ok_or_else(|| ReaderError::UnknownRegister(register.to_string()))?;
        let bit_field = descriptor
            .field(field)
            .ok_or_else(|| ReaderError::UnknownBitField {
                register: register.to_string(),
                field: field.to_string(),
            })?;
        let address = match descriptor.location() {
            Location::Address(address) => *address,
            Location::Core(_) => {
                return Err(ReaderError::WrongRegisterKind {
                    register: register.to_string(),
                    expected: RegisterKind::MemoryMapped,
                });
            }
        };
        if !bits::fits(value, bit_field.bits()) {
            return Err(ReaderError::FieldValueOverflow {
                field: format!("{}.{}", register, field),
                value,
                bits: bit_field.bits(),
            });
        }

        let mut access = self.connector.connect()?;
        let old = bits::container(&access.read_memory(address, Width::Word)?);
        let new = bits::encode_field(old, bit_field.positions(), value);
        log::info!(
            "{}.{} = {:#x}: 0x{:08x} -> 0x{:08x}",
            register,
            field,
            value,
            old,
            new
        );
        access.write_memory(address, Unit::Word, new)?;
        Ok(new)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{catalog::armv7m, fake::FakeConnector};

    fn reader(connector: &FakeConnector) -> Reader<FakeConnector> {
        let symbols = [("gCounter", 0x2000_0000, 4), ("gFlags", 0x2000_0010, 2)]
            .into_iter()
            .collect();
        Reader::new(connector.clone(), armv7m::catalog().unwrap()).with_symbols(symbols)
    }

    #[test]
    fn core_register_and_two_fields() {
        let connector = FakeConnector::halted();
        connector.set_core("pc", 0x0800_01C4);
        connector.write_word(0xE000_E010, 0x0000_0003);
        let results = reader(&connector)
            .read(&[
                ReadRequest::core("PC"),
                ReadRequest::mmap_bits("SYST_CSR", "ENABLE"),
                ReadRequest::mmap_bits("SYST_CSR", "TICKINT"),
            ])
            .unwrap();
        assert_eq!(connector.physical_reads(), 2);
        assert_eq!(connector.sessions(), 1);
        assert_eq!(connector.open_sessions(), 0);
        assert_eq!(results.len(), 3);

        let pc = results.find("PC").unwrap().result.as_ref().unwrap();
        assert_eq!(pc.value, 0x0800_01C4);
        assert_eq!(pc.raw, vec![0xC4, 0x01, 0x00, 0x08]);
        let tickint = results.find("SYST_CSR.TICKINT").unwrap();
        assert_eq!(tickint.result.as_ref().unwrap().value, 1);
    }

    #[test]
    fn size_mismatch_reads_nothing() {
        let connector = FakeConnector::halted();
        let result = reader(&connector).read(&[
            ReadRequest::mmap("SYST_CSR"),
            ReadRequest::symbol("gFlags", 4),
        ]);
        assert!(matches!(result, Err(ReaderError::SizeMismatch { .. })));
        assert_eq!(connector.sessions(), 0);
        assert_eq!(connector.physical_reads(), 0);
    }

    #[test]
    fn halt_policy_off() {
        let connector = FakeConnector::running();
        let result = reader(&connector).read(&[ReadRequest::core("LR")]);
        assert!(matches!(result, Err(ReaderError::HaltRequired)));
        assert_eq!(connector.sessions(), 0);
    }

    #[test]
    fn absent_register_keeps_the_batch() {
        let connector = FakeConnector::halted();
        connector.resume();
        connector.write_word(0x2000_0000, 42);
        let results = reader(&connector)
            .read(&[ReadRequest::core("LR"), ReadRequest::symbol("gCounter", 4)])
            .unwrap();
        assert!(results.get(0).unwrap().result.is_err());
        assert_eq!(
            results.get(1).unwrap().result.as_ref().unwrap().value,
            42
        );
    }

    #[test]
    fn session_error_fails_batch() {
        let connector = FakeConnector::halted();
        connector.fail_at(0x2000_0000);
        let result = reader(&connector).read(&[ReadRequest::symbol("gCounter", 4)]);
        assert!(matches!(result, Err(ReaderError::Session(_))));
        assert_eq!(connector.open_sessions(), 0);
    }

    #[test]
    fn write_field_keeps_other_bits() {
        let connector = FakeConnector::halted();
        connector.write_word(0xE000_E010, 0x0001_0007);
        let written = reader(&connector)
            .write_field("SYST_CSR", "TICKINT", 0)
            .unwrap();
        assert_eq!(written, 0x0001_0005);
        assert_eq!(connector.read_word(0xE000_E010), 0x0001_0005);
        assert_eq!(connector.writes(), vec![(0xE000_E010, Unit::Word, 0x0001_0005)]);
        assert_eq!(connector.sessions(), 1);
    }

    #[test]
    fn write_field_errors() {
        let connector = FakeConnector::halted();
        let reader = reader(&connector);
        assert!(matches!(
            reader.write_field("SYST_RVR", "RELOAD", 1 << 24),
            Err(ReaderError::FieldValueOverflow { bits: 24, .. })
        ));
        assert!(matches!(
            reader.write_field("CONTROL", "SPSEL", 1),
            Err(ReaderError::WrongRegisterKind { .. })
        ));
        assert!(matches!(
            reader.write_field("SYST_CSR", "RELOAD", 1),
            Err(ReaderError::UnknownBitField { .. })
        ));
        assert_eq!(connector.sessions(), 0);
    }
}
