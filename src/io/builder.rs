//! Type-state builder for RoboDK links
//!
//! Mode selection happens at compile time: a builder in [`SyncMode`] builds a
//! blocking [`Link`], one in [`AsyncMode`] builds an [`AsyncLink`]. Settings
//! shared by both modes are available in every state.
//!
//! # Examples
//!
//! ```no_run
//! use robolink_rust::io::builder::LinkBuilder;
//! use std::time::Duration;
//!
//! // Blocking link, connected right away
//! let link = LinkBuilder::new()
//!     .address("192.168.0.10:20500")?
//!     .timeout(Duration::from_secs(5))
//!     .sync()
//!     .connect()?;
//!
//! // Async link, connected on the first call
//! let link = LinkBuilder::new().async_mode().build();
//! # Ok::<(), robolink_rust::RobolinkError>(())
//! ```

use std::marker::PhantomData;
use std::time::Duration;

use crate::error::{Result, RobolinkError};
use crate::io::async_link::AsyncLink;
use crate::io::config::LinkConfig;
use crate::io::launcher::Launcher;
use crate::link::Link;

// ============================================================================
// State Marker Types
// ============================================================================

/// Mode not chosen yet
pub struct Unspecified;

/// Blocking mode
pub struct SyncMode;

/// Tokio mode
pub struct AsyncMode;

// ============================================================================
// LinkBuilder
// ============================================================================

/// Type-state builder for [`Link`] and [`AsyncLink`]
///
/// # Type Parameters
/// * `Mode` - Mode state (Unspecified, SyncMode, AsyncMode)
pub struct LinkBuilder<Mode = Unspecified> {
    config: LinkConfig,
    launcher: Option<Box<dyn Launcher>>,
    mode: PhantomData<Mode>,
}

impl LinkBuilder<Unspecified> {
    /// Start from the default configuration (local RoboDK, port 20500)
    pub fn new() -> Self {
        Self::from_config(LinkConfig::default())
    }

    /// Start from an existing configuration
    pub fn from_config(config: LinkConfig) -> Self {
        LinkBuilder {
            config,
            launcher: None,
            mode: PhantomData,
        }
    }

    /// Select blocking mode
    pub fn sync(self) -> LinkBuilder<SyncMode> {
        self.into_mode()
    }

    /// Select tokio mode
    pub fn async_mode(self) -> LinkBuilder<AsyncMode> {
        self.into_mode()
    }
}

impl Default for LinkBuilder<Unspecified> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Build
// ============================================================================

impl LinkBuilder<SyncMode> {
    /// Build a link that connects on its first command
    pub fn build(self) -> Link {
        match self.launcher {
            Some(launcher) => Link::with_launcher(self.config, launcher),
            None => Link::new(self.config),
        }
    }

    /// Build a link and connect it now
    ///
    /// # Errors
    ///
    /// Returns the connection error; no link is returned in that case.
    pub fn connect(self) -> Result<Link> {
        let mut link = self.build();
        link.reconnect()?;
        Ok(link)
    }
}

impl LinkBuilder<AsyncMode> {
    /// Build an async link that connects on its first call
    pub fn build(self) -> AsyncLink {
        let sync: LinkBuilder<SyncMode> = self.into_mode();
        AsyncLink::new(sync.build())
    }

    /// Build an async link and connect it on the blocking pool
    pub async fn connect(self) -> Result<AsyncLink> {
        let link = self.build();
        link.call(|l| l.reconnect()).await?;
        Ok(link)
    }
}

// ============================================================================
// Common Configuration Methods
// ============================================================================

impl<Mode> LinkBuilder<Mode> {
    fn into_mode<Next>(self) -> LinkBuilder<Next> {
        LinkBuilder {
            config: self.config,
            launcher: self.launcher,
            mode: PhantomData,
        }
    }

    /// Host running RoboDK
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Host and single port as `"host:port"`
    pub fn address(mut self, addr: &str) -> Result<Self> {
        let (host, port) = parse_addr(addr)?;
        self.config.host = host;
        self.config.port_start = port;
        self.config.port_end = port;
        Ok(self)
    }

    /// Inclusive port range to scan
    pub fn ports(mut self, start: u16, end: u16) -> Self {
        self.config = self.config.with_ports(start, end);
        self
    }

    /// Default timeout of every call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Number of port scan passes
    pub fn connect_passes(mut self, passes: u32) -> Self {
        self.config.connect_passes = passes;
        self
    }

    /// Application started when a local host has no live port
    pub fn application_path(mut self, path: impl Into<String>) -> Self {
        self.config.application_path = path.into();
        self
    }

    /// Wait after starting the application before scanning again
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    /// Let the server validate item ids (default: true)
    pub fn safe_mode(mut self, enabled: bool) -> Self {
        self.config.safe_mode = enabled;
        self
    }

    /// Let the server render after every call (default: false)
    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.config.auto_update = enabled;
        self
    }

    /// Replace the way RoboDK is started
    pub fn launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    /// Configuration the link will be built with
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Split `"host:port"` into its parts
fn parse_addr(addr: &str) -> Result<(String, u16)> {
    let invalid = |reason: String| RobolinkError::InvalidArgument(reason);
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| invalid(format!("Invalid address format: {}", addr)))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| invalid(format!("Invalid port number: {}", e)))?;
    if host.is_empty() {
        return Err(invalid("Hostname cannot be empty".to_string()));
    }
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::connection::LinkState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_phantom_data_is_zero_size() {
        use std::mem::size_of;

        assert_eq!(size_of::<PhantomData<SyncMode>>(), 0);
        assert_eq!(
            size_of::<LinkBuilder<Unspecified>>(),
            size_of::<LinkBuilder<SyncMode>>()
        );
        assert_eq!(
            size_of::<LinkBuilder<SyncMode>>(),
            size_of::<LinkBuilder<AsyncMode>>()
        );
    }

    #[test]
    fn test_parse_addr() {
        assert_eq!(
            parse_addr("localhost:20500").unwrap(),
            ("localhost".to_string(), 20500)
        );
        assert_eq!(
            parse_addr("192.168.0.10:20501").unwrap(),
            ("192.168.0.10".to_string(), 20501)
        );

        assert!(parse_addr("invalid").is_err());
        assert!(parse_addr("localhost:").is_err());
        assert!(parse_addr(":20500").is_err());
        assert!(parse_addr("localhost:abc").is_err());
    }

    #[test]
    fn test_builder_options() {
        let builder = LinkBuilder::new()
            .address("10.0.0.5:20502")
            .unwrap()
            .timeout(Duration::from_secs(3))
            .safe_mode(false)
            .auto_update(true)
            .sync();
        let config = builder.config();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!((config.port_start, config.port_end), (20502, 20502));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(!config.safe_mode);
        assert!(config.auto_update);
    }

    #[test]
    fn test_build_is_lazy() {
        let link = LinkBuilder::new().sync().build();
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_custom_launcher_is_used() {
        let spawns = Arc::new(AtomicUsize::new(0));
        let counter = spawns.clone();
        let result = LinkBuilder::new()
            .host("127.0.0.1")
            .ports(1, 1)
            .connect_passes(2)
            .settle_delay(Duration::ZERO)
            .launcher(move |_path: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), RobolinkError>(())
            })
            .sync()
            .connect();
        assert!(matches!(
            result,
            Err(RobolinkError::ConnectionFailed { .. })
        ));
        assert_eq!(spawns.load(Ordering::SeqCst), 1);
    }
}
