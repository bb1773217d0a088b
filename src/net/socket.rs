//! Socket options applied to accepted and dialed connections.

use std::io;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

use crate::config::ConnectionConfig;

/// Per-connection socket policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketPolicy {
    pub keepalive_idle: Duration,
    pub keepalive_interval: Duration,
    pub keepalive_count: u32,
    pub idle_timeout: Duration,
}

impl SocketPolicy {
    /// Apply linger and keep-alive to `stream`.
    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        set_linger_zero(stream)?;

        let keepalive = TcpKeepalive::new().with_time(self.keepalive_idle);
        #[cfg(any(
            target_os = "linux",
            target_os = "android",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd"
        ))]
        let keepalive = keepalive
            .with_interval(self.keepalive_interval)
            .with_retries(self.keepalive_count);

        SockRef::from(stream).set_tcp_keepalive(&keepalive)
    }
}

impl From<&ConnectionConfig> for SocketPolicy {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            keepalive_idle: Duration::from_secs(config.keepalive_idle_secs),
            keepalive_interval: Duration::from_secs(config.keepalive_interval_secs),
            keepalive_count: config.keepalive_count,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

impl Default for SocketPolicy {
    fn default() -> Self {
        Self::from(&ConnectionConfig::default())
    }
}

/// Close with RST instead of lingering in TIME_WAIT.
pub fn set_linger_zero(stream: &TcpStream) -> io::Result<()> {
    SockRef::from(stream).set_linger(Some(Duration::ZERO))
}
