use regspy_protocol::{Command, TargetState};
use regspy_reader::{
    Location, ReadRequest, Reader, ReaderError, SymbolTable, Unreadable, catalog::armv7m,
};
use regspy_tests::Simulation;

fn symbols() -> SymbolTable {
    [("gCounter", 0x2000_0000, 4), ("gFlags", 0x2000_0010, 2)]
        .into_iter()
        .collect()
}

#[test]
fn three_requests_two_reads() {
    let sim = Simulation::start(TargetState::Running);
    sim.target.set_register("pc", 0x0800_01C4);
    sim.target.write_word(0xE000_E010, 0x0000_0007);

    let reader = Reader::new(
        sim.connector(sim.config().halt_if_running(true)),
        armv7m::catalog().unwrap(),
    );
    let results = reader
        .read(&[
            ReadRequest::core("PC"),
            ReadRequest::mmap_bits("SYST_CSR", "ENABLE"),
            ReadRequest::mmap_bits("SYST_CSR", "TICKINT"),
        ])
        .unwrap();

    assert_eq!(sim.log.memory_reads(), 1);
    assert_eq!(sim.log.register_reads(), 1);
    assert!(sim.log.lines().contains(&"halt".to_string()));

    let pc = results.find("PC").unwrap().result.as_ref().unwrap();
    assert_eq!(pc.value, 0x0800_01C4);
    let enable = results.find("SYST_CSR.ENABLE").unwrap().result.as_ref().unwrap();
    assert_eq!(enable.value, 1);
    assert_eq!(
        enable.description,
        "SYST_CSR.ENABLE = 0x1 = 0b1 = 1u (Counter enabled)"
    );
    let tickint = results.find("SYST_CSR.TICKINT").unwrap().result.as_ref().unwrap();
    assert_eq!(tickint.value, 1);
}

#[test]
fn size_mismatch_never_connects() {
    let sim = Simulation::start(TargetState::Halted);
    let reader = Reader::new(sim.connector(sim.config()), armv7m::catalog().unwrap())
        .with_symbols(symbols());
    let result = reader.read(&[ReadRequest::symbol("gFlags", 4)]);
    assert!(matches!(
        result,
        Err(ReaderError::SizeMismatch { size: 2, requested: 4, .. })
    ));
    assert!(sim.log.lines().is_empty());
}

#[test]
fn unreadable_core_register() {
    // halt only stops a running target, a target held in reset stays there
    let sim = Simulation::start(TargetState::Reset);
    sim.target.write_word(0x2000_0000, 41);
    let reader = Reader::new(
        sim.connector(sim.config().halt_if_running(true)),
        armv7m::catalog().unwrap(),
    )
    .with_symbols(symbols());

    let results = reader
        .read(&[ReadRequest::core("LR"), ReadRequest::symbol("gCounter", 4)])
        .unwrap();
    assert_eq!(
        results.get(0).unwrap().result,
        Err(Unreadable {
            location: Location::Core("lr".into())
        })
    );
    assert_eq!(results.get(1).unwrap().result.as_ref().unwrap().value, 41);
}

#[test]
fn memory_widths_share_one_read() {
    let sim = Simulation::start(TargetState::Halted);
    sim.target.write_word(0x2000_0000, 0xDEAD_BEEF);
    sim.target.write_word(0x2000_0004, 0x0000_0002);
    let reader = Reader::new(sim.connector(sim.config()), armv7m::catalog().unwrap());

    let results = reader
        .read(&[
            ReadRequest::memory(0x2000_0000, 1),
            ReadRequest::memory(0x2000_0000, 8),
            ReadRequest::memory(0x2000_0004, 2),
        ])
        .unwrap();
    assert_eq!(sim.log.memory_reads(), 2);
    assert_eq!(
        sim.log.count(|command| matches!(
            command,
            Command::ReadMemory {
                address: 0x2000_0000,
                count: 2,
                ..
            }
        )),
        1
    );
    let values: Vec<u64> = results
        .iter()
        .map(|outcome| outcome.result.as_ref().unwrap().value)
        .collect();
    assert_eq!(values, vec![0xEF, 0x2_DEAD_BEEF, 0x2]);
}

#[test]
fn every_read_opens_a_fresh_session() {
    let sim = Simulation::start(TargetState::Halted);
    let reader = Reader::new(sim.connector(sim.config()), armv7m::catalog().unwrap());
    let requests = [ReadRequest::mmap("CPUID")];
    sim.target.write_word(0xE000_ED00, 0x410F_C241);
    let first = reader.read(&requests).unwrap();
    sim.target.write_word(0xE000_ED00, 0x411F_C271);
    let second = reader.read(&requests).unwrap();

    assert_eq!(first.get(0).unwrap().result.as_ref().unwrap().value, 0x410F_C241);
    assert_eq!(second.get(0).unwrap().result.as_ref().unwrap().value, 0x411F_C271);
    assert_eq!(sim.log.memory_reads(), 2);
    let connects = sim
        .log
        .count(|command| matches!(command, Command::TargetCurrent));
    assert_eq!(connects, 2);
}

#[test]
fn write_field_over_tcp() {
    let sim = Simulation::start(TargetState::Halted);
    sim.target.write_word(0xE000_E010, 0x0001_0007);
    let reader = Reader::new(sim.connector(sim.config()), armv7m::catalog().unwrap());

    assert_eq!(reader.write_field("SYST_CSR", "CLKSOURCE", 0).unwrap(), 0x0001_0003);
    assert_eq!(sim.target.word(0xE000_E010), 0x0001_0003);
    assert!(
        sim.log
            .lines()
            .contains(&"mww 0xe000e010 0x10003".to_string())
    );
}
