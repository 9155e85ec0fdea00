//! RoboDK Remote API Client in Rust
//!
//! This library drives a running RoboDK instance over its binary TCP
//! protocol: query and edit the station tree, move robots, solve kinematics,
//! generate and run programs.
//!
//! # Features
//!
//! - **Typed API** - Poses, matrices, items and enumerations are distinct Rust types
//! - **Fail-fast validation** - Bad arguments are rejected before a byte is sent
//! - **Self-healing connection** - A broken stream is dropped and re-established on the next call
//! - **Synchronous and asynchronous use** - Blocking [`Link`] plus a tokio
//!   [`AsyncLink`](io::AsyncLink)
//! - **Structured logging** - Connection and command events go through `tracing`
//!
//! # Quick Start
//!
//! ```no_run
//! use robolink_rust::{Link, LinkConfig, MoveTarget, Pose};
//!
//! let mut link = Link::connect(LinkConfig::default())?;
//!
//! // Look up the robot and read where it is
//! let robot = link.item("UR10")?;
//! let home = link.joints(&robot)?;
//!
//! // Move 100 mm down in the tool frame, then back home
//! let approach = link.pose(&robot)? * Pose::translation(0.0, 0.0, 100.0);
//! link.move_l(&robot, approach, true)?;
//! link.move_j(&robot, MoveTarget::Joints(home), true)?;
//! # Ok::<(), robolink_rust::RobolinkError>(())
//! ```
//!
//! # Architecture
//!
//! ## Module Structure
//!
//! - **`protocol`** - Wire format
//!   - `codec` - Encoders and decoders of every wire primitive
//!   - `status` - Classification of the status trailer every command ends with
//!   - `command` - The closed set of command tokens
//!   - `types` - [`Pose`] and [`Mat`]
//!
//! - **`io`** - Network I/O layer
//!   - `Connection` - Port scan, application launch and handshake
//!   - `LinkBuilder` - Type-state builder for sync and async links
//!   - `AsyncLink` - Tokio front-end
//!
//! - **`link`** - [`Link`], the command dispatcher, and every remote operation
//!
//! - **`error`** - Error handling
//!   - `RobolinkError` - Unified error type for all operations
//!   - `Result<T>` - Type alias for `Result<T, RobolinkError>`
//!
//! # Error Handling
//!
//! All operations return `Result<T, RobolinkError>`. A RoboDK error message
//! aborts only the current call; the connection stays usable:
//!
//! ```no_run
//! use robolink_rust::{Link, LinkConfig, Pose, RobolinkError};
//!
//! let mut link = Link::connect(LinkConfig::default())?;
//! let robot = link.item("UR10")?;
//! match link.move_l(&robot, Pose::translation(5000.0, 0.0, 0.0), true) {
//!     Ok(()) => println!("Moved"),
//!     Err(RobolinkError::Remote(message)) => eprintln!("RoboDK refused: {}", message),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), RobolinkError>(())
//! ```

pub mod error;
pub mod io;
pub mod link;
pub mod protocol;

// Re-export commonly used types
pub use error::{Result, RobolinkError};
pub use io::{AsyncLink, LinkBuilder, LinkConfig, LinkState};
pub use link::{Link, MoveTarget};
pub use protocol::{Item, ItemType, Mat, Pose};
