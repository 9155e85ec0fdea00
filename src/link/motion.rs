//! Robot motion
//!
//! A move names its target in one of three shapes. On the wire the shape is
//! announced by a tag, followed by an array and an item, so every target
//! occupies the same three slots:
//!
//! | Target  | Tag | Array                       | Item        |
//! |---------|-----|-----------------------------|-------------|
//! | Joints  | 1   | joint values                | null        |
//! | Pose    | 2   | 16 doubles, column-major    | null        |
//! | Item    | 3   | empty                       | the target  |

use std::time::Instant;

use tracing::debug;

use super::{Link, Request};
use crate::error::{Result, RobolinkError};
use crate::protocol::enums::MoveType;
use crate::protocol::item::Item;
use crate::protocol::types::Pose;
use crate::protocol::Command;

const TAG_JOINTS: i32 = 1;
const TAG_POSE: i32 = 2;
const TAG_ITEM: i32 = 3;

/// Destination of a move
#[derive(Debug, Clone, PartialEq)]
pub enum MoveTarget {
    /// A target item of the station
    Item(Item),
    /// Joint values
    Joints(Vec<f64>),
    /// Flange pose relative to the active reference frame
    Pose(Pose),
}

impl MoveTarget {
    /// Append tag, array and item slots
    pub(crate) fn encode<'r>(&self, r: &'r mut Request) -> &'r mut Request {
        let null = Item::null();
        match self {
            MoveTarget::Joints(joints) => r.int(TAG_JOINTS).array(joints).item(&null),
            MoveTarget::Pose(pose) => r
                .int(TAG_POSE)
                .array(&pose.to_column_major())
                .item(&null),
            MoveTarget::Item(item) => r.int(TAG_ITEM).array(&[]).item(item),
        }
    }
}

impl From<Item> for MoveTarget {
    fn from(item: Item) -> Self {
        MoveTarget::Item(item)
    }
}

impl From<&Item> for MoveTarget {
    fn from(item: &Item) -> Self {
        MoveTarget::Item(*item)
    }
}

impl From<Pose> for MoveTarget {
    fn from(pose: Pose) -> Self {
        MoveTarget::Pose(pose)
    }
}

impl From<Vec<f64>> for MoveTarget {
    fn from(joints: Vec<f64>) -> Self {
        MoveTarget::Joints(joints)
    }
}

impl From<&[f64]> for MoveTarget {
    fn from(joints: &[f64]) -> Self {
        MoveTarget::Joints(joints.to_vec())
    }
}

impl Link {
    /// Joint move; with `blocking` the call returns once the robot stops
    pub fn move_j(
        &mut self,
        robot: &Item,
        target: impl Into<MoveTarget>,
        blocking: bool,
    ) -> Result<()> {
        self.move_to(robot, MoveType::Joint, &target.into(), blocking)
    }

    /// Linear move; with `blocking` the call returns once the robot stops
    pub fn move_l(
        &mut self,
        robot: &Item,
        target: impl Into<MoveTarget>,
        blocking: bool,
    ) -> Result<()> {
        self.move_to(robot, MoveType::Linear, &target.into(), blocking)
    }

    /// Circular move through `via` to `end`
    pub fn move_c(
        &mut self,
        robot: &Item,
        via: impl Into<MoveTarget>,
        end: impl Into<MoveTarget>,
        blocking: bool,
    ) -> Result<()> {
        let (via, end) = (via.into(), end.into());
        self.call_unit(Command::MoveCircular, |r| {
            let r = r.int(MoveType::Circular.code());
            let r = via.encode(r);
            end.encode(r).item(robot)
        })?;
        if blocking {
            self.wait_move(robot)?;
        }
        Ok(())
    }

    fn move_to(
        &mut self,
        robot: &Item,
        move_type: MoveType,
        target: &MoveTarget,
        blocking: bool,
    ) -> Result<()> {
        debug!(robot = robot.id(), move_type = ?move_type, "Move");
        self.call_unit(Command::Move, |r| {
            let r = r.int(move_type.code());
            target.encode(r).item(robot)
        })?;
        if blocking {
            self.wait_move(robot)?;
        }
        Ok(())
    }

    /// Wait until a robot finishes its current move
    ///
    /// The server acknowledges receipt at once and completion later; the
    /// completion ack is read under the configured wait-move timeout.
    pub fn wait_move(&mut self, robot: &Item) -> Result<()> {
        self.call_unit(Command::WaitMove, |r| r.item(robot))?;
        let timeout = self.config().wait_move_timeout;
        self.await_status(Command::WaitMove, timeout)
    }

    /// Poll the busy flag until the item is idle
    ///
    /// Polling follows the configured busy poll; an expired poll timeout is
    /// reported as [`RobolinkError::Timeout`].
    pub fn wait_finished(&mut self, item: &Item) -> Result<()> {
        let poll = self.config().busy_poll.clone();
        let started = Instant::now();
        while self.busy(item)? {
            if let Some(timeout) = poll.timeout {
                if started.elapsed() >= timeout {
                    return Err(RobolinkError::Timeout(format!(
                        "{:?} still busy after {:?}",
                        item, timeout
                    )));
                }
            }
            std::thread::sleep(poll.interval);
        }
        Ok(())
    }

    /// Whether a robot or program is running
    pub fn busy(&mut self, item: &Item) -> Result<bool> {
        self.call(Command::IsBusy, |r| r.item(item), |r| Ok(r.int()? > 0))
    }

    /// Stop a robot or program
    pub fn stop(&mut self, item: &Item) -> Result<()> {
        self.call_unit(Command::Stop, |r| r.item(item))
    }

    /// Check a joint move for collisions
    ///
    /// Returns the number of collision pairs found (0 = free path).
    pub fn collision_move_j(
        &mut self,
        robot: &Item,
        from: &[f64],
        to: &[f64],
        min_step_deg: f64,
    ) -> Result<i32> {
        self.call(
            Command::CollisionMove,
            |r| r.item(robot).array(from).array(to).int_rounded(min_step_deg * 1000.0),
            |r| r.int(),
        )
    }

    /// Check a linear move for collisions
    ///
    /// Returns the number of collision pairs found (0 = free path).
    pub fn collision_move_l(
        &mut self,
        robot: &Item,
        from: &[f64],
        to: &Pose,
        min_step_mm: f64,
    ) -> Result<i32> {
        self.call(
            Command::CollisionMoveLinear,
            |r| r.item(robot).array(from).pose(to).int_rounded(min_step_mm * 1000.0),
            |r| r.int(),
        )
    }

    /// Set speeds and accelerations; negative values keep the current one
    ///
    /// Units are mm/s, deg/s, mm/s² and deg/s².
    pub fn set_speed(
        &mut self,
        robot: &Item,
        linear: f64,
        joints: f64,
        accel_linear: f64,
        accel_joints: f64,
    ) -> Result<()> {
        let speeds = [linear, joints, accel_linear, accel_joints];
        self.call_unit(Command::SetSpeed, |r| r.item(robot).array(&speeds))
    }

    /// Set the linear acceleration only
    pub fn set_acceleration(&mut self, robot: &Item, accel_linear: f64) -> Result<()> {
        self.set_speed(robot, -1.0, -1.0, accel_linear, -1.0)
    }

    /// Set the joint speed only
    pub fn set_speed_joints(&mut self, robot: &Item, joints: f64) -> Result<()> {
        self.set_speed(robot, -1.0, joints, -1.0, -1.0)
    }

    /// Set the joint acceleration only
    pub fn set_acceleration_joints(&mut self, robot: &Item, accel_joints: f64) -> Result<()> {
        self.set_speed(robot, -1.0, -1.0, -1.0, accel_joints)
    }

    /// Set the rounding zone in mm (negative = fine positioning)
    pub fn set_zone_data(&mut self, robot: &Item, zone_mm: f64) -> Result<()> {
        self.call_unit(Command::SetZoneData, |r| r.int_rounded(zone_mm * 1000.0).item(robot))
    }

    /// Enable or disable the robot accuracy model
    pub fn set_accuracy_active(&mut self, robot: &Item, active: bool) -> Result<()> {
        self.call_unit(Command::SetAccuracy, |r| r.item(robot).flag(active))
    }

    /// Filter a program file through the robot's accuracy model
    pub fn filter_program(&mut self, robot: &Item, file: &str) -> Result<i32> {
        self.call(Command::FilterProgram, |r| r.item(robot).line(file), |r| r.int())
    }
}
