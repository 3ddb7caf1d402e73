use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: 127.0.0.1:3000).
    pub bind: SocketAddr,
    /// Delay between run status fetches.
    pub poll_interval: Duration,
    /// Give up on a run after this long. `None` polls until the run ends.
    pub run_timeout: Option<Duration>,
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            poll_interval: Duration::from_secs(1),
            run_timeout: Some(Duration::from_secs(30)),
            allowed_origins: Vec::new(),
        }
    }
}
