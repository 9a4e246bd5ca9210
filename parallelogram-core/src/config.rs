use std::time::Duration;

/// Reference configuration knobs from the distilled spec's §6, threaded
/// through a `Config`-style struct the way `mdns::config::Config` and
/// `api::setting_engine::SettingEngine` do, rather than as bare module
/// constants (the original's `parallelogram/config.py` /
/// `parallelogram/helpers.py`).
///
/// `p_map`/`p_filter`/`p_reduce` take `port` and `timeout` directly as the
/// spec's signature requires; everything else defaults from here, with a
/// `with_*` builder for callers that need non-default knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Base TCP port workers accept requests on. Responses go to `port + 1`.
    pub port: u16,

    /// Multicast group address discovery probes/replies are sent to.
    pub multicast_group_ip: [u8; 4],

    /// UDP port the multicast group listens on.
    pub multicast_port: u16,

    /// Socket default: how long a per-chunk send+receive waits before the
    /// round loop gives up on it. Doubled after every round.
    pub default_timeout: Duration,

    /// TCP listen backlog for the worker's acceptor.
    pub max_connect_requests: u32,

    /// Max single read size when draining a socket until EOF.
    pub network_chunk_size: usize,

    /// Work unit size for chunking. Also bounds the residual size at which
    /// recursive reduce finalizes locally instead of recursing again.
    pub chunk_size: usize,

    /// How long the client's discovery probe waits for replies with no new
    /// arrival before considering the window closed.
    pub discovery_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            port: 1001,
            multicast_group_ip: [224, 3, 29, 71],
            multicast_port: 10000,
            default_timeout: Duration::from_secs(5),
            max_connect_requests: 5,
            network_chunk_size: 8192,
            chunk_size: 6,
            discovery_window: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_multicast_group(mut self, ip: [u8; 4], port: u16) -> Self {
        self.multicast_group_ip = ip;
        self.multicast_port = port;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_discovery_window(mut self, window: Duration) -> Self {
        self.discovery_window = window;
        self
    }

    pub fn multicast_addr(&self) -> std::net::SocketAddrV4 {
        std::net::SocketAddrV4::new(self.multicast_group_ip.into(), self.multicast_port)
    }
}
