//! Item-level operations
//!
//! Tree navigation, pose get/set, appearance, kinematics and the real robot
//! driver. Each operation is one round trip; nothing is cached on the item.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::Link;
use crate::error::{Result, RobolinkError};
use crate::protocol::enums::{ItemType, RobotComStatus};
use crate::protocol::item::Item;
use crate::protocol::types::{Mat, Pose};
use crate::protocol::Command;

/// Tolerance used by [`Link::recolor`] when recoloring everything
const RECOLOR_ALL_TOLERANCE: f64 = 2.0;

/// Default tolerance of [`Link::recolor`] when a source color is given
pub const DEFAULT_RECOLOR_TOLERANCE: f64 = 0.1;

/// Interval between driver state polls in [`Link::connect_robot_safe`]
const DRIVER_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Joint limits of a robot
#[derive(Debug, Clone, PartialEq)]
pub struct JointLimits {
    /// Lower bound of each joint
    pub lower: Vec<f64>,
    /// Upper bound of each joint
    pub upper: Vec<f64>,
    /// Joint type descriptor reported by RoboDK
    pub joint_type: f64,
}

/// Connection settings of a real robot driver
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RobotConnection {
    /// Robot IP address
    pub ip: String,
    /// Robot communication port
    pub port: i32,
    /// Remote program folder
    pub remote_path: String,
    /// FTP user name
    pub ftp_user: String,
    /// FTP password
    pub ftp_pass: String,
}

/// Normalize an RGBA color
///
/// Three channels get an opaque alpha. Channels outside `[-1, 1]` are
/// accepted with a warning.
pub(crate) fn check_color(color: &[f64]) -> Result<[f64; 4]> {
    let rgba = match *color {
        [r, g, b] => [r, g, b, 1.0],
        [r, g, b, a] => [r, g, b, a],
        _ => {
            return Err(RobolinkError::InvalidArgument(format!(
                "color must have 3 or 4 values, got {}",
                color.len()
            )))
        }
    };
    if rgba.iter().any(|c| *c > 1.0 || *c < -1.0) {
        warn!(color = ?rgba, "Color provided is not in the range [0,1] ([r,g,b,a])");
    }
    Ok(rgba)
}

/// Expand a scale argument to three axes
///
/// One value scales uniformly; extra values past the third are ignored.
pub(crate) fn check_scale(scale: &[f64]) -> Result<[f64; 3]> {
    match *scale {
        [s] => Ok([s, s, s]),
        [x, y, z, ..] => Ok([x, y, z]),
        _ => Err(RobolinkError::InvalidArgument(format!(
            "scale must be a single value or a 3-vector, got {} values",
            scale.len()
        ))),
    }
}

impl Link {
    // ========================================================================
    // Tree
    // ========================================================================

    /// Type of an item as reported by RoboDK
    pub fn item_type(&mut self, item: &Item) -> Result<Option<ItemType>> {
        self.call(
            Command::GetItemType,
            |r| r.item(item),
            |r| Ok(ItemType::from_code(r.int()?)),
        )
    }

    /// Delete an item and everything attached to it
    ///
    /// The handle is invalidated on success.
    pub fn delete(&mut self, item: &mut Item) -> Result<()> {
        self.call_unit(Command::Delete, |r| r.item(item))?;
        debug!(id = item.id(), "Item deleted");
        item.invalidate();
        Ok(())
    }

    /// Attach `item` to `parent`, keeping its relative pose
    pub fn set_parent(&mut self, item: &Item, parent: &Item) -> Result<()> {
        self.call_unit(Command::SetParent, |r| r.item(item).item(parent))
    }

    /// Attach `item` to `parent`, keeping its absolute pose
    pub fn set_parent_static(&mut self, item: &Item, parent: &Item) -> Result<()> {
        self.call_unit(Command::SetParentStatic, |r| r.item(item).item(parent))
    }

    /// Attach the closest object to a tool; returns it (null if none)
    pub fn attach_closest(&mut self, tool: &Item) -> Result<Item> {
        self.call(Command::AttachClosest, |r| r.item(tool), |r| r.item())
    }

    /// Detach the closest object from a tool into `parent`
    pub fn detach_closest(&mut self, tool: &Item, parent: &Item) -> Result<Item> {
        self.call(
            Command::DetachClosest,
            |r| r.item(tool).item(parent),
            |r| r.item(),
        )
    }

    /// Detach every object attached to a tool into `parent`
    pub fn detach_all(&mut self, tool: &Item, parent: &Item) -> Result<()> {
        self.call_unit(Command::DetachAll, |r| r.item(tool).item(parent))
    }

    /// Parent of an item
    pub fn parent(&mut self, item: &Item) -> Result<Item> {
        self.call(Command::GetParent, |r| r.item(item), |r| r.item())
    }

    /// Direct children of an item
    pub fn children(&mut self, item: &Item) -> Result<Vec<Item>> {
        self.call(Command::GetChildren, |r| r.item(item), |r| r.items())
    }

    /// Whether an item is visible
    pub fn visible(&mut self, item: &Item) -> Result<bool> {
        self.call(Command::GetVisible, |r| r.item(item), |r| Ok(r.int()? > 0))
    }

    /// Show or hide an item; its frame follows unless `frame` says otherwise
    pub fn set_visible(&mut self, item: &Item, visible: bool, frame: Option<bool>) -> Result<()> {
        let frame = frame.unwrap_or(visible);
        self.call_unit(Command::SetVisible, |r| r.item(item).flag(visible).flag(frame))
    }

    /// Name of an item
    pub fn name(&mut self, item: &Item) -> Result<String> {
        self.call(Command::GetName, |r| r.item(item), |r| r.line())
    }

    /// Rename an item
    pub fn set_name(&mut self, item: &Item, name: &str) -> Result<()> {
        self.call_unit(Command::SetName, |r| r.item(item).line(name))
    }

    /// Set a named text value on an item
    pub fn set_value_text(&mut self, item: &Item, name: &str, value: &str) -> Result<()> {
        self.call_unit(Command::SetValueString, |r| r.item(item).line(name).line(value))
    }

    /// Set a named matrix value on an item
    pub fn set_value_matrix(&mut self, item: &Item, name: &str, value: &Mat) -> Result<()> {
        self.call_unit(Command::SetValueMatrix, |r| {
            r.item(item).line(name).matrix(value)
        })
    }

    // ========================================================================
    // Poses
    // ========================================================================

    /// Pose relative to the parent (the flange pose for a robot)
    pub fn pose(&mut self, item: &Item) -> Result<Pose> {
        self.call(Command::GetPose, |r| r.item(item), |r| r.pose())
    }

    /// Set the pose relative to the parent (moves the flange for a robot)
    pub fn set_pose(&mut self, item: &Item, pose: &Pose) -> Result<()> {
        self.call_unit(Command::SetPose, |r| r.item(item).pose(pose))
    }

    /// Pose of an object's geometry relative to its own frame
    pub fn geometry_pose(&mut self, item: &Item) -> Result<Pose> {
        self.call(Command::GetGeometryPose, |r| r.item(item), |r| r.pose())
    }

    /// Move an object's geometry relative to its own frame
    pub fn set_geometry_pose(&mut self, item: &Item, pose: &Pose) -> Result<()> {
        self.call_unit(Command::SetGeometryPose, |r| r.item(item).pose(pose))
    }

    /// Pose relative to the station
    pub fn pose_absolute(&mut self, item: &Item) -> Result<Pose> {
        self.call(Command::GetPoseAbsolute, |r| r.item(item), |r| r.pose())
    }

    /// Set the pose relative to the station
    pub fn set_pose_absolute(&mut self, item: &Item, pose: &Pose) -> Result<()> {
        self.call_unit(Command::SetPoseAbsolute, |r| r.item(item).pose(pose))
    }

    // ========================================================================
    // Geometry and appearance
    // ========================================================================

    /// Copy the geometry of `from` into `target`, placed at `pose`
    pub fn add_geometry(&mut self, target: &Item, from: &Item, pose: &Pose) -> Result<()> {
        self.call_unit(Command::AddGeometry, |r| r.item(from).item(target).pose(pose))
    }

    /// Recolor an object
    ///
    /// Without `from`, every color is replaced. With `from`, only colors
    /// within `tolerance` (default [`DEFAULT_RECOLOR_TOLERANCE`]) of it are.
    pub fn recolor(
        &mut self,
        item: &Item,
        to: &[f64],
        from: Option<&[f64]>,
        tolerance: Option<f64>,
    ) -> Result<()> {
        let to = check_color(to)?;
        let (from, tolerance) = match from {
            Some(from) => (
                check_color(from)?,
                tolerance.unwrap_or(DEFAULT_RECOLOR_TOLERANCE),
            ),
            None => ([0.0; 4], RECOLOR_ALL_TOLERANCE),
        };
        let mut values = Vec::with_capacity(9);
        values.push(tolerance);
        values.extend_from_slice(&from);
        values.extend_from_slice(&to);
        self.call_unit(Command::Recolor, |r| r.item(item).array(&values))
    }

    /// Color of an object as `[r, g, b, a]`
    pub fn color(&mut self, item: &Item) -> Result<Vec<f64>> {
        self.call(Command::GetColor, |r| r.item(item), |r| r.array())
    }

    /// Set the color of an object (`[r, g, b]` or `[r, g, b, a]`)
    pub fn set_color(&mut self, item: &Item, color: &[f64]) -> Result<()> {
        let rgba = check_color(color)?;
        self.call_unit(Command::SetColor, |r| r.item(item).array(&rgba))
    }

    /// Scale an object uniformly (one value) or per axis (three values)
    pub fn scale(&mut self, item: &Item, scale: &[f64]) -> Result<()> {
        let xyz = check_scale(scale)?;
        self.call_unit(Command::Scale, |r| r.item(item).array(&xyz))
    }

    /// Configure a machining project
    ///
    /// Returns the generated program and the path status.
    pub fn set_machining_params(
        &mut self,
        project: &Item,
        nc_file: &str,
        part: &Item,
        params: &str,
    ) -> Result<(Item, f64)> {
        self.call(
            Command::SetMachiningParams,
            |r| r.item(project).line(nc_file).item(part).line(params),
            |r| {
                let program = r.item()?;
                let status = r.int()? as f64 / 1000.0;
                Ok((program, status))
            },
        )
    }

    /// Make a target a cartesian target
    pub fn set_as_cartesian_target(&mut self, target: &Item) -> Result<()> {
        self.call_unit(Command::SetAsCartesianTarget, |r| r.item(target))
    }

    /// Make a target a joint target
    pub fn set_as_joint_target(&mut self, target: &Item) -> Result<()> {
        self.call_unit(Command::SetAsJointTarget, |r| r.item(target))
    }

    /// Display a joint or instruction sequence on a robot
    pub fn show_sequence_on(&mut self, item: &Item, sequence: &Mat) -> Result<()> {
        self.call_unit(Command::ShowSequence, |r| r.matrix(sequence).item(item))
    }

    // ========================================================================
    // Joints and kinematics
    // ========================================================================

    /// Current joints of a robot, or the joints of a target
    pub fn joints(&mut self, item: &Item) -> Result<Vec<f64>> {
        self.call(Command::GetJoints, |r| r.item(item), |r| r.array())
    }

    /// Set the joints of a robot or a joint target
    pub fn set_joints(&mut self, item: &Item, joints: &[f64]) -> Result<()> {
        self.call_unit(Command::SetJoints, |r| r.array(joints).item(item))
    }

    /// Poses of every robot link for `joints` (None = current joints)
    pub fn joint_poses(&mut self, robot: &Item, joints: Option<&[f64]>) -> Result<Vec<Pose>> {
        let joints = joints.unwrap_or(&[]);
        self.call(
            Command::GetLinkPoses,
            |r| r.item(robot).array(joints),
            |r| {
                let count = r.int()?;
                (0..count.max(0)).map(|_| r.pose()).collect()
            },
        )
    }

    /// Home joints of a robot
    pub fn joints_home(&mut self, robot: &Item) -> Result<Vec<f64>> {
        self.call(Command::GetJointsHome, |r| r.item(robot), |r| r.array())
    }

    /// Object attached to a robot link (0 = base)
    pub fn object_link(&mut self, robot: &Item, link_id: i32) -> Result<Item> {
        self.call(
            Command::GetObjectLink,
            |r| r.item(robot).int(link_id),
            |r| r.item(),
        )
    }

    /// Joint limits of a robot
    pub fn joint_limits(&mut self, robot: &Item) -> Result<JointLimits> {
        self.call(Command::GetJointLimits, |r| r.item(robot), |r| {
            let lower = r.array()?;
            let upper = r.array()?;
            let joint_type = r.int()? as f64 / 1000.0;
            Ok(JointLimits {
                lower,
                upper,
                joint_type,
            })
        })
    }

    /// Link a program or target to a robot (None = first available robot)
    pub fn set_robot(&mut self, item: &Item, robot: Option<&Item>) -> Result<()> {
        let robot = robot.copied().unwrap_or_default();
        self.call_unit(Command::SetRobot, |r| r.item(item).item(&robot))
    }

    /// Link a robot to a reference frame item
    pub fn set_frame(&mut self, robot: &Item, frame: &Item) -> Result<()> {
        self.call_unit(Command::SetFrameItem, |r| r.item(frame).item(robot))
    }

    /// Set the reference frame pose of a robot
    pub fn set_frame_pose(&mut self, robot: &Item, frame: &Pose) -> Result<()> {
        self.call_unit(Command::SetFramePose, |r| r.pose(frame).item(robot))
    }

    /// Link a robot to a tool item
    pub fn set_tool(&mut self, robot: &Item, tool: &Item) -> Result<()> {
        self.call_unit(Command::SetToolItem, |r| r.item(tool).item(robot))
    }

    /// Set the TCP pose of a robot
    pub fn set_tool_pose(&mut self, robot: &Item, tool: &Pose) -> Result<()> {
        self.call_unit(Command::SetToolPose, |r| r.pose(tool).item(robot))
    }

    /// Reference frame pose of a robot
    pub fn pose_frame(&mut self, robot: &Item) -> Result<Pose> {
        self.call(Command::GetFramePose, |r| r.item(robot), |r| r.pose())
    }

    /// TCP pose of a robot
    pub fn pose_tool(&mut self, robot: &Item) -> Result<Pose> {
        self.call(Command::GetToolPose, |r| r.item(robot), |r| r.pose())
    }

    /// Add an empty tool to a robot
    pub fn add_tool(&mut self, robot: &Item, tool_pose: &Pose, name: &str) -> Result<Item> {
        self.call(
            Command::AddTool,
            |r| r.item(robot).pose(tool_pose).line(name),
            |r| r.item(),
        )
    }

    /// Forward kinematics: flange pose for `joints`
    pub fn solve_fk(&mut self, robot: &Item, joints: &[f64]) -> Result<Pose> {
        self.call(Command::SolveFk, |r| r.array(joints).item(robot), |r| r.pose())
    }

    /// Robot configuration flags for `joints`
    pub fn joints_config(&mut self, robot: &Item, joints: &[f64]) -> Result<Vec<f64>> {
        self.call(
            Command::JointsConfig,
            |r| r.array(joints).item(robot),
            |r| r.array(),
        )
    }

    /// Inverse kinematics, optionally close to `approx`
    ///
    /// An unreachable pose returns a single-element array.
    pub fn solve_ik(
        &mut self,
        robot: &Item,
        pose: &Pose,
        approx: Option<&[f64]>,
    ) -> Result<Vec<f64>> {
        match approx {
            None => self.call(Command::SolveIk, |r| r.pose(pose).item(robot), |r| r.array()),
            Some(approx) => self.call(
                Command::SolveIkFrom,
                |r| r.pose(pose).array(approx).item(robot),
                |r| r.array(),
            ),
        }
    }

    /// Every inverse kinematics solution, one per column
    pub fn solve_ik_all(&mut self, robot: &Item, pose: &Pose) -> Result<Mat> {
        self.call(Command::SolveIkAll, |r| r.pose(pose).item(robot), |r| r.matrix())
    }

    /// Filter a target through the robot's accuracy model
    ///
    /// Returns the filtered pose and joints.
    pub fn filter_target(
        &mut self,
        robot: &Item,
        pose: &Pose,
        approx: Option<&[f64]>,
    ) -> Result<(Pose, Vec<f64>)> {
        let approx = approx.unwrap_or(&[0.0; 6]);
        self.call(
            Command::FilterTarget,
            |r| r.pose(pose).array(approx).item(robot),
            |r| {
                let pose = r.pose()?;
                let joints = r.array()?;
                Ok((pose, joints))
            },
        )
    }

    // ========================================================================
    // Robot driver
    // ========================================================================

    /// Connect the real robot driver (empty `ip` = configured address)
    pub fn connect_robot(&mut self, robot: &Item, ip: &str) -> Result<i32> {
        self.call(Command::Connect, |r| r.item(robot).line(ip), |r| r.int())
    }

    /// Connect the real robot driver and wait until it is ready
    ///
    /// The driver state is polled; a disconnected driver is reconnected, and
    /// after `wait` without progress the attempt is dropped and retried, up
    /// to `max_attempts` times. Returns the last observed state.
    pub fn connect_robot_safe(
        &mut self,
        robot: &Item,
        ip: &str,
        max_attempts: u32,
        wait: Duration,
    ) -> Result<RobotComStatus> {
        self.connect_robot(robot, ip)?;
        let mut attempts = 0;
        let mut started = Instant::now();
        std::thread::sleep(DRIVER_POLL_INTERVAL);
        loop {
            let (status, message) = self.connected_state(robot)?;
            debug!(status = ?status, message = %message, "Robot driver state");
            match status {
                RobotComStatus::Ready => {
                    info!(message = %message, "Robot driver ready");
                    return Ok(status);
                }
                RobotComStatus::Disconnected => {
                    info!("Trying to reconnect robot driver");
                    self.connect_robot(robot, ip)?;
                }
                _ => {}
            }
            if started.elapsed() > wait {
                started = Instant::now();
                self.disconnect_robot(robot)?;
                attempts += 1;
                if attempts >= max_attempts {
                    warn!(attempts, "Failed to connect robot driver: timed out");
                    return Ok(status);
                }
                info!(attempt = attempts, "Retrying robot driver connection");
            }
            std::thread::sleep(DRIVER_POLL_INTERVAL);
        }
    }

    /// Driver connection settings
    pub fn connection_params(&mut self, robot: &Item) -> Result<RobotConnection> {
        self.call(Command::GetConnectParams, |r| r.item(robot), |r| {
            Ok(RobotConnection {
                ip: r.line()?,
                port: r.int()?,
                remote_path: r.line()?,
                ftp_user: r.line()?,
                ftp_pass: r.line()?,
            })
        })
    }

    /// Change driver connection settings
    pub fn set_connection_params(&mut self, robot: &Item, params: &RobotConnection) -> Result<()> {
        self.call_unit(Command::SetConnectParams, |r| {
            r.item(robot)
                .line(&params.ip)
                .int(params.port)
                .line(&params.remote_path)
                .line(&params.ftp_user)
                .line(&params.ftp_pass)
                // the server expects the address once more
                .line(&params.ip)
        })
    }

    /// Driver state and its message
    ///
    /// Codes this client does not know map to [`RobotComStatus::Unknown`].
    pub fn connected_state(&mut self, robot: &Item) -> Result<(RobotComStatus, String)> {
        self.call(Command::ConnectedState, |r| r.item(robot), |r| {
            let code = r.int()?;
            let message = r.line()?;
            let status = RobotComStatus::from_code(code).unwrap_or(RobotComStatus::Unknown);
            Ok((status, message))
        })
    }

    /// Disconnect the real robot driver
    pub fn disconnect_robot(&mut self, robot: &Item) -> Result<i32> {
        self.call(Command::Disconnect, |r| r.item(robot), |r| r.int())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_gets_alpha() {
        assert_eq!(check_color(&[1.0, 0.5, 0.0]).unwrap(), [1.0, 0.5, 0.0, 1.0]);
        assert_eq!(
            check_color(&[0.0, 0.0, 1.0, 0.3]).unwrap(),
            [0.0, 0.0, 1.0, 0.3]
        );
    }

    #[test]
    fn test_color_length_is_checked() {
        for bad in [&[][..], &[1.0, 0.0][..], &[0.1, 0.2, 0.3, 0.4, 0.5][..]] {
            assert!(matches!(
                check_color(bad),
                Err(RobolinkError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_out_of_range_color_is_accepted() {
        // 0-255 colors are a common mistake; they pass with a warning
        assert_eq!(
            check_color(&[255.0, 0.0, 0.0]).unwrap(),
            [255.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_scale_shapes() {
        assert_eq!(check_scale(&[2.0]).unwrap(), [2.0, 2.0, 2.0]);
        assert_eq!(check_scale(&[1.0, 2.0, 3.0]).unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(check_scale(&[1.0, 2.0, 3.0, 4.0]).unwrap(), [1.0, 2.0, 3.0]);
        assert!(check_scale(&[1.0, 2.0]).is_err());
        assert!(check_scale(&[]).is_err());
    }
}
