use std::time::Duration;

use regspy_protocol::DEFAULT_PROMPT;

#[derive(Debug, Clone)]
pub struct Config {
    /// Byte that terminates every response.
    pub prompt: u8,
    /// How long to wait for the prompt after sending a command.
    pub response_timeout: Duration,
    /// How long to wait for the prompt after connecting.
    pub banner_timeout: Duration,
    /// Target to select. The server's current target is used if empty.
    pub target_name: Option<String>,
    /// Issue `reset run` if the target is not running.
    pub restart_if_not_running: bool,
    /// Issue `halt` if the target is running. Applied after the restart policy.
    pub halt_if_running: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT,
            response_timeout: Duration::from_secs(2),
            banner_timeout: Duration::from_secs(2),
            target_name: None,
            restart_if_not_running: false,
            halt_if_running: false,
        }
    }
}

/// Builder to create a [Config] instance
///
/// # Example
///
/// ```
/// use regspy_client::Builder;
/// use std::time::Duration;
///
/// let config = Builder::new()
///     .response_timeout(Duration::from_millis(500))
///     .target("master.cpu0")
///     .halt_if_running(true)
///     .build();
/// assert!(config.halt_if_running);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the prompt byte of the server.
    pub fn prompt(mut self, prompt: u8) -> Self {
        self.config.prompt = prompt;
        self
    }

    /// Set how long a command may take before its response is treated as truncated.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// Set how long to wait for the connection banner.
    pub fn banner_timeout(mut self, timeout: Duration) -> Self {
        self.config.banner_timeout = timeout;
        self
    }

    /// Select a target by name after connecting.
    pub fn target(mut self, name: impl Into<String>) -> Self {
        self.config.target_name = Some(name.into());
        self
    }

    pub fn restart_if_not_running(mut self, restart: bool) -> Self {
        self.config.restart_if_not_running = restart;
        self
    }

    pub fn halt_if_running(mut self, halt: bool) -> Self {
        self.config.halt_if_running = halt;
        self
    }

    /// Build and return the configuration
    pub fn build(self) -> Config {
        self.config
    }
}
