//! Connection manager
//!
//! Owns the single TCP socket of a session. Establishing it follows a fixed
//! algorithm:
//!
//! 1. Scan every port of the configured range, probing each with a short
//!    connect timeout.
//! 2. If no port answers and the host is remote, fail.
//! 3. If the host is local, start the application (between passes only),
//!    wait for it to settle, then scan again.
//! 4. On the first live port, run the handshake: `CMD_START`, then the
//!    `safe_mode auto_update` flags, then expect `READY`.
//!
//! Lifecycle: `Disconnected → Connecting → Handshaking → Ready`, with
//! `Failed` reachable from every non-Ready state and from `Ready` when a
//! transport error leaves the stream position unknown.

use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, info, warn};

use crate::error::{Result, RobolinkError};
use crate::io::config::LinkConfig;
use crate::io::launcher::{BoxedLauncher, Launcher, ProcessLauncher};
use crate::protocol::codec::{put_line, read_line};
use crate::protocol::Command;

/// Token the server answers the handshake with
pub const READY_TOKEN: &str = "READY";

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No socket
    Disconnected,
    /// Scanning ports
    Connecting,
    /// Socket open, waiting for `READY`
    Handshaking,
    /// Commands can be sent
    Ready,
    /// Connection could not be established or was lost mid-command
    Failed,
}

struct Socket {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

/// The one TCP connection of a [`Link`](crate::link::Link)
#[derive(Debug)]
pub struct Connection {
    config: LinkConfig,
    launcher: BoxedLauncher,
    socket: Option<Socket>,
    state: LinkState,
    port: Option<u16>,
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.writer.peer_addr() {
            Ok(addr) => write!(f, "Socket({})", addr),
            Err(_) => f.write_str("Socket(closed)"),
        }
    }
}

impl Connection {
    /// Create a disconnected connection that starts RoboDK as a child process
    pub fn new(config: LinkConfig) -> Self {
        Self::with_launcher(config, Box::new(ProcessLauncher))
    }

    /// Create a disconnected connection with a custom launcher
    pub fn with_launcher(config: LinkConfig, launcher: Box<dyn Launcher>) -> Self {
        Connection {
            config,
            launcher: BoxedLauncher(launcher),
            socket: None,
            state: LinkState::Disconnected,
            port: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Port of the live session, once connected
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Session configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Nominal liveness: Ready with a socket present
    ///
    /// This does not probe the peer; a dead peer surfaces as an I/O error on
    /// the next call.
    pub fn is_ready(&self) -> bool {
        self.state == LinkState::Ready && self.socket.is_some()
    }

    /// Connect if the session is not Ready
    pub fn ensure_ready(&mut self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }
        self.connect()
    }

    /// Drop any existing socket and establish a new session
    pub fn connect(&mut self) -> Result<()> {
        self.socket = None;
        self.port = None;
        self.state = LinkState::Connecting;

        let passes = self.config.connect_passes.max(1);
        let mut found = None;
        for pass in 0..passes {
            found = self.scan();
            if found.is_some() {
                break;
            }
            if !self.config.is_local() {
                debug!(host = %self.config.host, "No live port on remote host");
                break;
            }
            if pass + 1 < passes {
                if let Err(e) = self.launcher.0.launch(&self.config.application_path) {
                    self.state = LinkState::Failed;
                    return Err(e);
                }
                std::thread::sleep(self.config.settle_delay);
            }
        }

        let (stream, port) = match found {
            Some(found) => found,
            None => {
                self.state = LinkState::Failed;
                warn!(
                    host = %self.config.host,
                    port_start = self.config.port_start,
                    port_end = self.config.port_end,
                    "Unable to connect to RoboDK"
                );
                return Err(RobolinkError::ConnectionFailed {
                    host: self.config.host.clone(),
                    port_start: self.config.port_start,
                    port_end: self.config.port_end,
                });
            }
        };

        if let Err(e) = self.open(stream, port) {
            self.socket = None;
            self.state = LinkState::Failed;
            return Err(e);
        }
        info!(host = %self.config.host, port, "Connected to RoboDK");
        Ok(())
    }

    /// Close the socket
    pub fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            debug!(host = %self.config.host, "Disconnected");
        }
        self.state = LinkState::Disconnected;
    }

    /// Drop the socket after a transport failure
    ///
    /// The next call reconnects from scratch.
    pub fn mark_failed(&mut self) {
        self.socket = None;
        self.state = LinkState::Failed;
    }

    fn scan(&self) -> Option<(TcpStream, u16)> {
        for port in self.config.ports() {
            match self.probe(port) {
                Ok(stream) => return Some((stream, port)),
                Err(e) => {
                    debug!(host = %self.config.host, port, error = %e, "Port probe failed");
                }
            }
        }
        None
    }

    fn probe(&self, port: u16) -> std::io::Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (self.config.host.as_str(), port)
            .to_socket_addrs()?
            .collect();
        let mut last_err = std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "host resolved to no address",
        );
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.probe_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn open(&mut self, stream: TcpStream, port: u16) -> Result<()> {
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;
        self.socket = Some(Socket {
            reader: BufReader::new(stream),
            writer,
        });
        self.port = Some(port);
        self.set_timeout(self.config.timeout)?;
        self.handshake()
    }

    fn handshake(&mut self) -> Result<()> {
        self.state = LinkState::Handshaking;
        let mut buf = BytesMut::new();
        put_line(&mut buf, Command::Start.as_str());
        put_line(
            &mut buf,
            &format!(
                "{} {}",
                self.config.safe_mode as i32, self.config.auto_update as i32
            ),
        );
        self.send(&buf)?;

        let response = read_line(self.reader()?)?;
        if response != READY_TOKEN {
            warn!(response = %response, "Handshake rejected");
            return Err(RobolinkError::HandshakeRejected { response });
        }
        self.state = LinkState::Ready;
        debug!(
            safe_mode = self.config.safe_mode,
            auto_update = self.config.auto_update,
            "Handshake complete"
        );
        Ok(())
    }

    fn socket(&mut self) -> Result<&mut Socket> {
        self.socket.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotConnected, "not connected").into()
        })
    }

    /// Write a complete request and flush it
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let socket = self.socket()?;
        socket.writer.write_all(bytes)?;
        socket.writer.flush()?;
        Ok(())
    }

    /// Reader over the response stream
    pub fn reader(&mut self) -> Result<&mut impl Read> {
        Ok(&mut self.socket()?.reader)
    }

    /// Set the read and write timeout of the socket
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let socket = self.socket()?;
        socket.writer.set_read_timeout(Some(timeout))?;
        socket.writer.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// Run `f` under `timeout`, then restore the configured call timeout
    ///
    /// The default is restored even when `f` fails.
    pub fn with_timeout<T>(
        &mut self,
        timeout: Duration,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.set_timeout(timeout)?;
        let result = f(self);
        let default = self.config.timeout;
        if self.socket.is_some() {
            let restored = self.set_timeout(default);
            if result.is_ok() {
                restored?;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn serve_handshake(reply: &'static str) -> (u16, std::thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = std::io::BufReader::new(stream.try_clone().unwrap());
            let mut lines = Vec::new();
            for _ in 0..2 {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                lines.push(line);
            }
            let mut writer = stream;
            writer.write_all(reply.as_bytes()).unwrap();
            writer.flush().unwrap();
            lines
        });
        (port, handle)
    }

    fn local_config(port: u16) -> LinkConfig {
        LinkConfig {
            host: "127.0.0.1".to_string(),
            probe_timeout: Duration::from_millis(200),
            settle_delay: Duration::from_millis(1),
            ..Default::default()
        }
        .with_ports(port, port)
    }

    fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_handshake_sends_flags() {
        let (port, server) = serve_handshake("READY\n");
        let mut conn = Connection::new(local_config(port));
        assert_eq!(conn.state(), LinkState::Disconnected);
        conn.connect().unwrap();
        assert_eq!(conn.state(), LinkState::Ready);
        assert_eq!(conn.port(), Some(port));
        assert!(conn.is_ready());
        assert_eq!(server.join().unwrap(), vec!["CMD_START\n", "1 0\n"]);
    }

    #[test]
    fn test_handshake_rejected() {
        let (port, server) = serve_handshake("BUSY\n");
        let mut conn = Connection::new(local_config(port));
        match conn.connect() {
            Err(RobolinkError::HandshakeRejected { response }) => assert_eq!(response, "BUSY"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(conn.state(), LinkState::Failed);
        assert!(!conn.is_ready());
        server.join().unwrap();
    }

    #[test]
    fn test_local_failure_spawns_once() {
        let spawns = Arc::new(AtomicUsize::new(0));
        let counter = spawns.clone();
        let launcher = move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), RobolinkError>(())
        };
        let mut conn = Connection::with_launcher(local_config(free_port()), Box::new(launcher));
        assert!(matches!(
            conn.connect(),
            Err(RobolinkError::ConnectionFailed { .. })
        ));
        assert_eq!(spawns.load(Ordering::SeqCst), 1);
        assert_eq!(conn.state(), LinkState::Failed);
    }

    #[test]
    fn test_launch_error_is_surfaced() {
        let mut config = local_config(free_port());
        config.application_path = "/nonexistent/RoboDK".to_string();
        let mut conn = Connection::new(config);
        assert!(matches!(
            conn.connect(),
            Err(RobolinkError::LaunchFailed { .. })
        ));
        assert_eq!(conn.state(), LinkState::Failed);
    }

    #[test]
    fn test_send_without_socket_is_io_error() {
        let mut conn = Connection::new(LinkConfig::default());
        let err = conn.send(b"G_Name\n").unwrap_err();
        assert!(err.is_transport());
    }
}
