//! RoboDK remote API protocol implementation module
//!
//! This module contains the wire codec, the status trailer, the verb set and
//! the value types carried by commands.

pub mod codec;
pub mod command;
pub mod enums;
pub mod item;
pub mod status;
pub mod types;

// Re-export commonly used types
pub use command::Command;
pub use enums::{
    CalibrateTcp, EulerType, InstructionCall, InstructionType, ItemType, MoveType,
    ProgramRunType, Projection, RobotComStatus, RunMode, WindowState,
};
pub use item::Item;
pub use status::{Ack, FatalKind, StatusPolicy};
pub use types::{Mat, Pose};
