//! Connection configuration
//!
//! [`LinkConfig`] is an explicit, caller-owned value: every [`Link`] carries
//! its own copy, so two links never share timeouts or ports.
//!
//! [`Link`]: crate::link::Link

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default RoboDK API port
pub const DEFAULT_PORT: u16 = 20500;

/// Default RoboDK install location
pub const DEFAULT_APPLICATION_PATH: &str = "C:/RoboDK/bin/RoboDK.exe";

/// Busy-flag polling strategy
///
/// Used by waits that have no dedicated blocking command (program
/// completion, driver connection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Sleep between two polls
    pub interval: Duration,
    /// Give up after this long (None = wait forever)
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(50),
            timeout: None,
        }
    }
}

impl PollConfig {
    /// Poll at `interval` until `timeout` expires
    ///
    /// # Examples
    ///
    /// ```
    /// use robolink_rust::io::config::PollConfig;
    /// use std::time::Duration;
    ///
    /// let poll = PollConfig::bounded(Duration::from_millis(10), Duration::from_secs(2));
    /// assert_eq!(poll.timeout, Some(Duration::from_secs(2)));
    /// ```
    pub fn bounded(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout: Some(timeout),
        }
    }
}

/// Connection and session settings
///
/// # Examples
///
/// ```
/// use robolink_rust::io::config::LinkConfig;
/// use std::time::Duration;
///
/// let config = LinkConfig::remote("192.168.0.10")
///     .with_ports(20500, 20502)
///     .with_timeout(Duration::from_secs(5));
/// assert!(!config.is_local());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Host running RoboDK
    pub host: String,
    /// First port of the scan range
    pub port_start: u16,
    /// Last port of the scan range (inclusive)
    pub port_end: u16,
    /// Default read/write timeout of every call
    pub timeout: Duration,
    /// Timeout while the server waits on the user (pick dialogs, popups)
    pub interactive_timeout: Duration,
    /// Connect timeout of each port probe
    pub probe_timeout: Duration,
    /// Number of port scan passes before giving up
    pub connect_passes: u32,
    /// Application started when a local host has no live port
    pub application_path: String,
    /// Wait after starting the application before scanning again
    pub settle_delay: Duration,
    /// Handshake flag: the server validates item ids
    pub safe_mode: bool,
    /// Handshake flag: the server renders after every call
    pub auto_update: bool,
    /// Timeout of the completion ack of a wait-move
    pub wait_move_timeout: Duration,
    /// Polling used by busy-flag waits
    pub busy_poll: PollConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port_start: DEFAULT_PORT,
            port_end: DEFAULT_PORT,
            timeout: Duration::from_secs(10),
            interactive_timeout: Duration::from_secs(3600),
            probe_timeout: Duration::from_secs(1),
            connect_passes: 2,
            application_path: DEFAULT_APPLICATION_PATH.to_string(),
            settle_delay: Duration::from_secs(5),
            safe_mode: true,
            auto_update: false,
            wait_move_timeout: Duration::from_secs(300),
            busy_poll: PollConfig::default(),
        }
    }
}

impl LinkConfig {
    /// Config for RoboDK running on another machine
    pub fn remote(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Scan `start..=end` instead of the default port
    pub fn with_ports(mut self, start: u16, end: u16) -> Self {
        self.port_start = start;
        self.port_end = end;
        self
    }

    /// Change the default call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True for `localhost` and loopback IP literals
    ///
    /// Only local hosts get the application started on demand.
    pub fn is_local(&self) -> bool {
        self.host.eq_ignore_ascii_case("localhost")
            || self
                .host
                .parse::<IpAddr>()
                .map(|ip| ip.is_loopback())
                .unwrap_or(false)
    }

    /// Ports of the scan range, in scan order
    pub fn ports(&self) -> std::ops::RangeInclusive<u16> {
        self.port_start..=self.port_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.ports(), 20500..=20500);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.interactive_timeout, Duration::from_secs(3600));
        assert_eq!(config.connect_passes, 2);
        assert!(config.safe_mode);
        assert!(!config.auto_update);
        assert_eq!(config.busy_poll.interval, Duration::from_millis(50));
        assert_eq!(config.busy_poll.timeout, None);
    }

    #[test]
    fn test_local_host_detection() {
        assert!(LinkConfig::default().is_local());
        assert!(LinkConfig::remote("LOCALHOST").is_local());
        assert!(LinkConfig::remote("127.0.0.1").is_local());
        assert!(LinkConfig::remote("127.4.5.6").is_local());
        assert!(LinkConfig::remote("::1").is_local());
        assert!(!LinkConfig::remote("192.0.2.1").is_local());
        assert!(!LinkConfig::remote("robot-cell.local").is_local());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: LinkConfig =
            serde_json::from_str(r#"{"host": "10.0.0.5", "port_end": 20510}"#).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.ports(), 20500..=20510);
        assert_eq!(config.settle_delay, Duration::from_secs(5));
    }
}
