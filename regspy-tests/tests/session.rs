use std::{thread, time::Duration};

use regspy_client::{Session, SessionError, SessionState};
use regspy_protocol::{TargetState, Unit, Width};
use regspy_tests::Simulation;

#[test]
fn restart_then_halt() {
    let sim = Simulation::start(TargetState::Reset);
    let config = sim
        .config()
        .target("cpu0")
        .restart_if_not_running(true)
        .halt_if_running(true)
        .build();
    let session = Session::connect(sim.addr, config).unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.target().unwrap().state, TargetState::Halted);

    let lines = sim.log.lines();
    let position = |line: &str| lines.iter().position(|l| l == line).unwrap();
    assert!(position("targets cpu0") < position("reset run"));
    assert!(position("reset run") < position("halt"));
    session.close();
}

#[test]
fn unknown_target() {
    let sim = Simulation::start(TargetState::Halted);
    let config = sim.config().target("cpu1").build();
    match Session::connect(sim.addr, config) {
        Err(SessionError::UnknownTarget { name, available }) => {
            assert_eq!(name, "cpu1");
            assert_eq!(available, vec!["cpu0".to_string()]);
        }
        Err(other) => panic!("expected UnknownTarget, got {}", other),
        Ok(_) => panic!("expected UnknownTarget"),
    }
}

#[test]
fn slow_response_degrades() {
    let sim = Simulation::start(TargetState::Halted);
    let config = sim
        .config()
        .response_timeout(Duration::from_millis(100))
        .build();
    let mut session = Session::connect(sim.addr, config).unwrap();

    let response = session.request("sleep 400").unwrap();
    assert!(!response.complete);
    assert!(response.lines.is_empty());
    assert_eq!(session.state(), SessionState::Ready);

    // the late response is discarded before the next command
    thread::sleep(Duration::from_millis(600));
    let response = session.request("version").unwrap();
    assert!(response.complete);
    assert!(response.lines[0].starts_with("regspy-sim "));
}

#[test]
fn memory_and_registers() {
    let sim = Simulation::start(TargetState::Halted);
    sim.target.set_register("xPSR", 0x0100_0000);
    let mut session = Session::connect(sim.addr, sim.config().build()).unwrap();

    session.write_memory(0x2000_0000, Unit::HalfWord, 0xBEEF).unwrap();
    assert_eq!(
        session.read_memory(0x2000_0000, Width::Word).unwrap(),
        vec![0xEF, 0xBE, 0x00, 0x00]
    );
    assert_eq!(
        session.read_core_register("xPSR").unwrap(),
        Some([0x00, 0x00, 0x00, 0x01])
    );

    sim.target.set_state(TargetState::Running);
    assert_eq!(session.read_core_register("xPSR").unwrap(), None);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn unknown_register_closes_session() {
    let sim = Simulation::start(TargetState::Halted);
    let mut session = Session::connect(sim.addr, sim.config().build()).unwrap();
    assert!(matches!(
        session.read_core_register("r99"),
        Err(SessionError::Protocol(_))
    ));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(
        session.read_memory(0x0, Width::Byte),
        Err(SessionError::Closed)
    ));
}

#[test]
fn target_listing() {
    let sim = Simulation::start(TargetState::Running);
    let mut session = Session::connect(sim.addr, sim.config().build()).unwrap();
    let targets = session.targets().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "cpu0");
    assert!(targets[0].current);
    assert_eq!(
        session.current_target_state().unwrap(),
        ("cpu0".to_string(), TargetState::Running)
    );
}
