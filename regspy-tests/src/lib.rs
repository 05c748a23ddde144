//! Helpers for running the reader against a simulated debug server over TCP.
use std::{
    net::{SocketAddr, TcpListener},
    sync::Arc,
    thread,
    time::Duration,
};

use regspy_client::{Builder, Connector};
use regspy_protocol::TargetState;
use regspy_sim::{MemoryTarget, server::CommandLog};

/// A simulated server running in a background thread.
pub struct Simulation {
    pub addr: SocketAddr,
    pub target: Arc<MemoryTarget>,
    pub log: CommandLog,
}

impl Simulation {
    /// Starts a server for a target named `cpu0` on an ephemeral port.
    pub fn start(state: TargetState) -> Simulation {
        let target = Arc::new(MemoryTarget::new("cpu0", state));
        let server = regspy_sim::server::Builder::new()
            .rw_timeout(Duration::from_secs(5))
            .build(target.clone());
        let log = server.log();
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind simulated server");
        let addr = listener.local_addr().expect("local address");
        thread::spawn(move || server.serve(listener));
        Simulation { addr, target, log }
    }

    /// Client configuration with short timeouts.
    pub fn config(&self) -> Builder {
        Builder::new()
            .response_timeout(Duration::from_millis(500))
            .banner_timeout(Duration::from_millis(500))
    }

    pub fn connector(&self, config: Builder) -> Connector {
        Connector::new(self.addr.ip().to_string(), self.addr.port(), config.build())
    }
}
