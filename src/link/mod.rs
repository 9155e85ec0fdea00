//! Command dispatcher and session
//!
//! Every remote operation follows one pattern:
//!
//! 1. write the command line,
//! 2. write its arguments in their fixed order,
//! 3. read its results in their fixed order,
//! 4. read and classify the status trailer.
//!
//! The request is fully encoded before the first byte is written, so local
//! validation errors never leave a partial command on the socket. `&mut self`
//! on every operation guarantees a single command in flight per connection.
//!
//! High-level operations live in the submodules and are all methods of
//! [`Link`]:
//!
//! - `station` - tree queries, authoring, simulation and camera control
//! - `item` - per-item properties, kinematics and robot driver
//! - `motion` - moves, [`MoveTarget`] encoding and waits
//! - `program` - program generation, execution and instruction access

mod item;
mod motion;
mod program;
mod station;

pub use motion::MoveTarget;
pub use item::{JointLimits, RobotConnection, DEFAULT_RECOLOR_TOLERANCE};
pub use program::{Instruction, MoveInstruction, ProgramJoints};
pub use station::{LineCollision, ParamValue, TcpCalibration};

use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::error::{Result, RobolinkError};
use crate::io::config::LinkConfig;
use crate::io::connection::{Connection, LinkState};
use crate::io::launcher::Launcher;
use crate::protocol::codec;
use crate::protocol::item::Item;
use crate::protocol::status::{Ack, StatusPolicy};
use crate::protocol::types::{Mat, Pose};
use crate::protocol::Command;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Client session with a running RoboDK instance
///
/// A `Link` owns one [`Connection`] and dispatches commands over it. Items it
/// returns are bound to it: passing them to another `Link` is rejected before
/// anything is sent.
///
/// # Examples
///
/// ```no_run
/// use robolink_rust::{Link, LinkConfig, MoveTarget};
///
/// let mut link = Link::connect(LinkConfig::default())?;
/// let robot = link.item("UR10")?;
/// let home = link.joints(&robot)?;
/// link.move_j(&robot, MoveTarget::Joints(home), true)?;
/// # Ok::<(), robolink_rust::RobolinkError>(())
/// ```
#[derive(Debug)]
pub struct Link {
    conn: Connection,
    session: u64,
    last_warning: Option<String>,
}

impl Link {
    /// Create a link without connecting
    ///
    /// The connection is established on the first command.
    pub fn new(config: LinkConfig) -> Self {
        Self::from_connection(Connection::new(config))
    }

    /// Create a link and connect immediately
    pub fn connect(config: LinkConfig) -> Result<Self> {
        let mut link = Self::new(config);
        link.conn.connect()?;
        Ok(link)
    }

    /// Create a link with a custom application launcher, without connecting
    pub fn with_launcher(config: LinkConfig, launcher: Box<dyn Launcher>) -> Self {
        Self::from_connection(Connection::with_launcher(config, launcher))
    }

    fn from_connection(conn: Connection) -> Self {
        Link {
            conn,
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            last_warning: None,
        }
    }

    /// Drop the current socket and connect again
    pub fn reconnect(&mut self) -> Result<()> {
        self.conn.connect()
    }

    /// Close the connection; the next command reconnects
    pub fn disconnect(&mut self) {
        self.conn.disconnect();
    }

    /// Connection lifecycle state
    pub fn state(&self) -> LinkState {
        self.conn.state()
    }

    /// Port of the live session
    pub fn port(&self) -> Option<u16> {
        self.conn.port()
    }

    /// Session configuration
    pub fn config(&self) -> &LinkConfig {
        self.conn.config()
    }

    /// Message of the most recent status-2 warning
    pub fn last_warning(&self) -> Option<&str> {
        self.last_warning.as_deref()
    }

    /// Whether `item` was produced by this link (the null item always is)
    pub fn owns(&self, item: &Item) -> bool {
        !item.is_valid() || item.session() == self.session
    }

    /// Dispatch one command with strict status handling
    pub(crate) fn call<T>(
        &mut self,
        command: Command,
        write: impl FnOnce(&mut Request) -> &mut Request,
        read: impl FnOnce(&mut Response<'_>) -> Result<T>,
    ) -> Result<T> {
        self.dispatch(command, None, write, read)
    }

    /// Dispatch one command with no results besides the status
    pub(crate) fn call_unit(
        &mut self,
        command: Command,
        write: impl FnOnce(&mut Request) -> &mut Request,
    ) -> Result<()> {
        self.call(command, write, |_| Ok(()))
    }

    /// Dispatch one command under a temporary timeout
    pub(crate) fn call_with_timeout<T>(
        &mut self,
        command: Command,
        timeout: Duration,
        write: impl FnOnce(&mut Request) -> &mut Request,
        read: impl FnOnce(&mut Response<'_>) -> Result<T>,
    ) -> Result<T> {
        self.dispatch(command, Some(timeout), write, read)
    }

    fn dispatch<T>(
        &mut self,
        command: Command,
        timeout: Option<Duration>,
        write: impl FnOnce(&mut Request) -> &mut Request,
        read: impl FnOnce(&mut Response<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut request = Request::new(command, self.session);
        write(&mut request);
        let bytes = request.finish()?;

        self.conn.ensure_ready()?;
        debug!(command = %command, bytes = bytes.len(), "Dispatching");

        let session = self.session;
        let exchange = |conn: &mut Connection| -> Result<(T, Ack)> {
            conn.send(&bytes)?;
            let reader = conn.reader()?;
            let mut response = Response { reader, session };
            let value = read(&mut response)?;
            let ack = Ack::read(&mut response.reader, StatusPolicy::Strict)?;
            Ok((value, ack))
        };
        let outcome = match timeout {
            Some(timeout) => self.conn.with_timeout(timeout, exchange),
            None => exchange(&mut self.conn),
        };

        let (value, ack) = self.settle(command, outcome)?;
        self.accept(command, ack)?;
        Ok(value)
    }

    /// Read one more status trailer of `command` under `timeout`
    ///
    /// Used by commands that acknowledge twice, once on receipt and once on
    /// completion.
    pub(crate) fn await_status(&mut self, command: Command, timeout: Duration) -> Result<()> {
        let outcome = self.conn.with_timeout(timeout, |conn| {
            Ack::read(conn.reader()?, StatusPolicy::Strict)
        });
        let ack = self.settle(command, outcome)?;
        self.accept(command, ack)
    }

    /// Drop the socket when the exchange broke the stream
    fn settle<T>(&mut self, command: Command, outcome: Result<T>) -> Result<T> {
        if let Err(e) = &outcome {
            if e.is_transport() {
                warn!(command = %command, error = %e, "Connection lost mid-command");
                self.conn.mark_failed();
            }
        }
        outcome
    }

    fn accept(&mut self, command: Command, ack: Ack) -> Result<()> {
        if let Ack::Warning { message } = &ack {
            warn!(command = %command, "RoboDK warning: {}", message);
            self.last_warning = Some(message.clone());
        }
        ack.into_result().map(|_| ())
    }
}

/// Encoded arguments of one command
///
/// Argument writers chain; an invalid argument is recorded and reported when
/// the request is finished, before anything is sent.
#[derive(Debug)]
pub(crate) struct Request {
    buf: BytesMut,
    session: u64,
    error: Option<RobolinkError>,
}

impl Request {
    fn new(command: Command, session: u64) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        codec::put_line(&mut buf, command.as_str());
        Request {
            buf,
            session,
            error: None,
        }
    }

    fn finish(self) -> Result<BytesMut> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.buf),
        }
    }

    pub(crate) fn line(&mut self, text: &str) -> &mut Self {
        codec::put_line(&mut self.buf, text);
        self
    }

    pub(crate) fn int(&mut self, value: i32) -> &mut Self {
        codec::put_int(&mut self.buf, value);
        self
    }

    /// Real value in an int slot, rounded
    pub(crate) fn int_rounded(&mut self, value: f64) -> &mut Self {
        codec::put_int_rounded(&mut self.buf, value);
        self
    }

    pub(crate) fn flag(&mut self, value: bool) -> &mut Self {
        self.int(value as i32)
    }

    pub(crate) fn array(&mut self, values: &[f64]) -> &mut Self {
        codec::put_array(&mut self.buf, values);
        self
    }

    pub(crate) fn matrix(&mut self, mat: &Mat) -> &mut Self {
        codec::put_matrix(&mut self.buf, mat);
        self
    }

    pub(crate) fn pose(&mut self, pose: &Pose) -> &mut Self {
        codec::put_pose(&mut self.buf, pose);
        self
    }

    pub(crate) fn xyz(&mut self, xyz: &[f64; 3]) -> &mut Self {
        codec::put_xyz(&mut self.buf, xyz);
        self
    }

    pub(crate) fn ptr(&mut self, ptr: u64) -> &mut Self {
        codec::put_ptr(&mut self.buf, ptr);
        self
    }

    /// Item reference; items of another link are rejected
    pub(crate) fn item(&mut self, item: &Item) -> &mut Self {
        if item.is_valid() && item.session() != self.session {
            self.reject(format!("{:?} belongs to another link", item));
        }
        codec::put_item_id(&mut self.buf, item.id());
        self
    }

    pub(crate) fn reject(&mut self, reason: String) -> &mut Self {
        if self.error.is_none() {
            self.error = Some(RobolinkError::InvalidArgument(reason));
        }
        self
    }
}

/// Decoder over the results of one command
pub(crate) struct Response<'a> {
    reader: &'a mut dyn Read,
    session: u64,
}

impl Response<'_> {
    pub(crate) fn int(&mut self) -> Result<i32> {
        codec::read_int(&mut self.reader)
    }

    pub(crate) fn line(&mut self) -> Result<String> {
        codec::read_line(&mut self.reader)
    }

    pub(crate) fn array(&mut self) -> Result<Vec<f64>> {
        codec::read_array(&mut self.reader)
    }

    pub(crate) fn matrix(&mut self) -> Result<Mat> {
        codec::read_matrix(&mut self.reader)
    }

    pub(crate) fn pose(&mut self) -> Result<Pose> {
        codec::read_pose(&mut self.reader)
    }

    pub(crate) fn xyz(&mut self) -> Result<[f64; 3]> {
        codec::read_xyz(&mut self.reader)
    }

    pub(crate) fn ptr(&mut self) -> Result<u64> {
        codec::read_ptr(&mut self.reader)
    }

    pub(crate) fn item(&mut self) -> Result<Item> {
        let (id, item_type) = codec::read_item_raw(&mut self.reader)?;
        Ok(Item::new(id, item_type, self.session))
    }

    /// Count-prefixed list of items
    pub(crate) fn items(&mut self) -> Result<Vec<Item>> {
        let count = self.int()?;
        (0..count.max(0)).map(|_| self.item()).collect()
    }

    /// Count-prefixed list of lines
    pub(crate) fn lines(&mut self) -> Result<Vec<String>> {
        let count = self.int()?;
        (0..count.max(0)).map(|_| self.line()).collect()
    }
}
