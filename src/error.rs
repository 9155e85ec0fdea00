//! Error types for RoboDK remote API operations
//!
//! This module defines every error a [`Link`](crate::link::Link) can surface:
//! transport failures, connection establishment failures, the fatal outcomes of
//! the per-call status trailer, and local argument validation.

use thiserror::Error;

/// RoboDK remote API error types
///
/// All operations in this library return `Result<T, RobolinkError>`. Status-2
/// warnings are not errors: they are logged and the call returns normally.
#[derive(Error, Debug)]
pub enum RobolinkError {
    /// I/O error occurred during network communication
    ///
    /// This error wraps standard library I/O errors and occurs when:
    /// - The socket was closed by RoboDK
    /// - A read or write timed out (the configured call timeout expired)
    /// - The connection was reset mid-command
    ///
    /// After an I/O error inside a command the stream position is unknown, so
    /// the link drops the socket and reconnects on the next call.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A received line was not valid UTF-8
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// No port in the configured range accepted a connection
    ///
    /// Returned once every scan pass (and, for a local host, the spawn of the
    /// application between passes) has been exhausted.
    ///
    /// # Example
    /// ```no_run
    /// # use robolink_rust::error::RobolinkError;
    /// let err = RobolinkError::ConnectionFailed {
    ///     host: "localhost".to_string(),
    ///     port_start: 20500,
    ///     port_end: 20500,
    /// };
    /// ```
    #[error("Unable to connect to RoboDK at {host} (ports {port_start}-{port_end})")]
    ConnectionFailed {
        /// Target host
        host: String,
        /// First port scanned
        port_start: u16,
        /// Last port scanned
        port_end: u16,
    },

    /// The socket opened but the server did not answer the handshake with `READY`
    #[error("Handshake rejected: expected READY, got {response:?}")]
    HandshakeRejected {
        /// Line actually received
        response: String,
    },

    /// The RoboDK application could not be started
    #[error("Application path is not correct or could not start: {path}")]
    LaunchFailed {
        /// Configured application path
        path: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// Status 1: the item identifier provided is not valid or no longer exists
    #[error("Invalid item provided: The item identifier provided is not valid or it does not exist.")]
    InvalidItem,

    /// Status 3: RoboDK raised an error while running the command
    ///
    /// Carries the message sent by the server verbatim. Only the current call
    /// is aborted; the connection stays usable.
    #[error("{0}")]
    Remote(String),

    /// Status 9: the RoboDK license does not allow this operation
    #[error("Invalid license. Contact us at: www.robodk.com")]
    InvalidLicense,

    /// Any other status code the server sent
    #[error("Problems running function (status code {0})")]
    UnknownStatus(i32),

    /// Local argument validation failed before any byte was sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A bounded busy-poll wait expired
    #[error("Timed out: {0}")]
    Timeout(String),
}

impl RobolinkError {
    /// Whether the error left the connection in an unknown state
    ///
    /// Transport and decoding errors interrupt a command mid-stream; the
    /// response bytes still in flight can no longer be matched to a request.
    pub fn is_transport(&self) -> bool {
        matches!(self, RobolinkError::Io(_) | RobolinkError::Utf8(_))
    }
}

/// Result type alias for RoboDK remote API operations
pub type Result<T> = std::result::Result<T, RobolinkError>;
