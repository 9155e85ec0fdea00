//! Network I/O for RoboDK sessions
//!
//! Provides the connection manager, its configuration, the application
//! launcher, the link builder and the tokio front-end.

pub mod async_link;
pub mod builder;
pub mod config;
pub mod connection;
pub mod launcher;

pub use async_link::AsyncLink;
pub use builder::LinkBuilder;
pub use config::{LinkConfig, PollConfig};
pub use connection::{Connection, LinkState};
pub use launcher::{Launcher, ProcessLauncher};
