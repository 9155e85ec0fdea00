//! Station-level operations
//!
//! Tree queries, authoring of new items, simulation settings, station
//! parameters, batch updates and 2-D cameras.

use tracing::info;

use super::Link;
use crate::error::{Result, RobolinkError};
use crate::protocol::codec::escape_line_breaks;
use crate::protocol::enums::{CalibrateTcp, EulerType, ItemType, Projection, RunMode, WindowState};
use crate::protocol::item::Item;
use crate::protocol::types::{Mat, Pose};
use crate::protocol::Command;

/// Prefix of the value RoboDK returns for an unknown parameter
const UNKNOWN_PARAM_PREFIX: &str = "UNKNOWN ";

/// Value of a station parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Value that parses as a number
    Number(f64),
    /// Any other value
    Text(String),
}

impl ParamValue {
    fn parse(raw: String) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) => ParamValue::Number(n),
            Err(_) => ParamValue::Text(raw),
        }
    }
}

/// Result of a TCP calibration
#[derive(Debug, Clone, PartialEq)]
pub struct TcpCalibration {
    /// Calculated TCP `[x, y, z]`
    pub tcp: Vec<f64>,
    /// Error summary `[mean, std dev, max]`
    pub stats: Vec<f64>,
    /// Error of each pose
    pub errors: Vec<f64>,
}

/// Result of a line collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCollision {
    /// First item hit by the line (null if none)
    pub item: Item,
    /// Collision point
    pub point: [f64; 3],
}

impl LineCollision {
    /// True if the line hit an item
    pub fn collided(&self) -> bool {
        self.item.is_valid()
    }
}

pub(crate) fn check_parallel(what: &str, left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(RobolinkError::InvalidArgument(format!(
            "{}: {} items but {} values",
            what, left, right
        )));
    }
    Ok(())
}

impl Link {
    // ========================================================================
    // Tree queries
    // ========================================================================

    /// Item by name
    ///
    /// Returns the closest match when there is no exact one, and the null
    /// item when nothing matches.
    pub fn item(&mut self, name: &str) -> Result<Item> {
        self.call(Command::GetItem, |r| r.line(name), |r| r.item())
    }

    /// Item by name, restricted to one type
    pub fn item_of_type(&mut self, name: &str, item_type: ItemType) -> Result<Item> {
        self.call(
            Command::GetItemOfType,
            |r| r.line(name).int(item_type.code()),
            |r| r.item(),
        )
    }

    /// Names of all station items, optionally of one type
    pub fn item_names(&mut self, filter: Option<ItemType>) -> Result<Vec<String>> {
        match filter {
            None => self.call(Command::ListItems, |r| r, |r| r.lines()),
            Some(t) => self.call(Command::ListItemsOfType, |r| r.int(t.code()), |r| r.lines()),
        }
    }

    /// All station items, optionally of one type
    pub fn item_list(&mut self, filter: Option<ItemType>) -> Result<Vec<Item>> {
        match filter {
            None => self.call(Command::ListItemHandles, |r| r, |r| r.items()),
            Some(t) => self.call(
                Command::ListItemHandlesOfType,
                |r| r.int(t.code()),
                |r| r.items(),
            ),
        }
    }

    /// Ask the user to pick an item in RoboDK
    ///
    /// Blocks under the interactive timeout until the user answers.
    pub fn pick_item(&mut self, message: &str, filter: Option<ItemType>) -> Result<Item> {
        let timeout = self.config().interactive_timeout;
        self.call_with_timeout(
            Command::PickItem,
            timeout,
            |r| r.line(message).int(filter.map_or(-1, ItemType::code)),
            |r| r.item(),
        )
    }

    // ========================================================================
    // Window and messages
    // ========================================================================

    /// Show or raise the RoboDK window
    pub fn show_window(&mut self) -> Result<()> {
        self.call_unit(Command::ShowWindow, |r| r)
    }

    /// Hide the RoboDK window
    pub fn hide_window(&mut self) -> Result<()> {
        self.call_unit(Command::HideWindow, |r| r)
    }

    /// Set the RoboDK window state
    pub fn set_window_state(&mut self, state: WindowState) -> Result<()> {
        self.call_unit(Command::SetWindowState, |r| r.int(state.code()))
    }

    /// Show a message in RoboDK
    ///
    /// A popup blocks under the interactive timeout until the user closes it;
    /// otherwise the message goes to the status bar.
    pub fn show_message(&mut self, message: &str, popup: bool) -> Result<()> {
        if popup {
            let timeout = self.config().interactive_timeout;
            self.call_with_timeout(Command::ShowMessage, timeout, |r| r.line(message), |_| Ok(()))
        } else {
            self.call_unit(Command::ShowMessageStatus, |r| r.line(message))
        }
    }

    // ========================================================================
    // Authoring
    // ========================================================================

    /// Copy an item to the RoboDK clipboard
    pub fn copy(&mut self, item: &Item) -> Result<()> {
        self.call_unit(Command::Copy, |r| r.item(item))
    }

    /// Paste the clipboard under `parent` (null = station)
    pub fn paste(&mut self, parent: &Item) -> Result<Item> {
        self.call(Command::Paste, |r| r.item(parent), |r| r.item())
    }

    /// Load any file supported by RoboDK under `parent` (null = station)
    ///
    /// Large files may need a longer call timeout.
    pub fn add_file(&mut self, path: &str, parent: &Item) -> Result<Item> {
        self.call(Command::AddFile, |r| r.line(path).item(parent), |r| r.item())
    }

    /// Add a shape from triangles
    ///
    /// `triangles` is `3xN` or `6xN` (with normals); every three columns make
    /// one triangle.
    pub fn add_shape(&mut self, triangles: &Mat, add_to: &Item) -> Result<Item> {
        self.call(
            Command::AddShape,
            |r| r.matrix(triangles).item(add_to),
            |r| r.item(),
        )
    }

    /// Add a curve from points (`3xN` or `6xN`)
    pub fn add_curve(
        &mut self,
        points: &Mat,
        reference: &Item,
        add_to_reference: bool,
        projection: Projection,
    ) -> Result<Item> {
        self.call(
            Command::AddCurve,
            |r| {
                r.matrix(points)
                    .item(reference)
                    .flag(add_to_reference)
                    .int(projection.code())
            },
            |r| r.item(),
        )
    }

    /// Add a point set (`3xN` or `6xN`)
    pub fn add_points(
        &mut self,
        points: &Mat,
        reference: &Item,
        add_to_reference: bool,
        projection: Projection,
    ) -> Result<Item> {
        self.call(
            Command::AddPoints,
            |r| {
                r.matrix(points)
                    .item(reference)
                    .flag(add_to_reference)
                    .int(projection.code())
            },
            |r| r.item(),
        )
    }

    /// Project points onto an object's surface
    pub fn project_points(
        &mut self,
        points: &Mat,
        object: &Item,
        projection: Projection,
    ) -> Result<Mat> {
        self.call(
            Command::ProjectPoints,
            |r| r.matrix(points).item(object).int(projection.code()),
            |r| r.matrix(),
        )
    }

    /// Save `item` to a file (null = the whole station)
    pub fn save(&mut self, path: &str, item: &Item) -> Result<()> {
        self.call_unit(Command::Save, |r| r.line(path).item(item))
    }

    /// Add a target under `parent`, reachable by `robot`
    pub fn add_target(&mut self, name: &str, parent: &Item, robot: &Item) -> Result<Item> {
        self.call(
            Command::AddTarget,
            |r| r.line(name).item(parent).item(robot),
            |r| r.item(),
        )
    }

    /// Add a reference frame under `parent`
    pub fn add_frame(&mut self, name: &str, parent: &Item) -> Result<Item> {
        self.call(Command::AddFrame, |r| r.line(name).item(parent), |r| r.item())
    }

    /// Add a program for `robot`
    pub fn add_program(&mut self, name: &str, robot: &Item) -> Result<Item> {
        self.call(Command::AddProgram, |r| r.line(name).item(robot), |r| r.item())
    }

    /// Add a machining project (also curve/point following and 3D printing)
    pub fn add_machining_project(&mut self, name: &str, robot: &Item) -> Result<Item> {
        self.call(
            Command::AddMachiningProject,
            |r| r.line(name).item(robot),
            |r| r.item(),
        )
    }

    // ========================================================================
    // Program output
    // ========================================================================

    /// Add code to the program output and run it if it is a program
    ///
    /// With `is_function_call`, RoboDK formats the call for the robot's
    /// post processor.
    pub fn run_code(&mut self, code: &str, is_function_call: bool) -> Result<i32> {
        let code = escape_line_breaks(code);
        self.call(
            Command::RunCode,
            |r| r.flag(is_function_call).line(&code),
            |r| r.int(),
        )
    }

    /// Run a program by name
    ///
    /// With `wait`, the program must exist and the call polls its busy flag
    /// until it finishes. Otherwise the name is emitted as a function call.
    pub fn run_program_named(&mut self, name: &str, wait: bool) -> Result<i32> {
        if !wait {
            return self.run_code(name, true);
        }
        let program = self.item_of_type(name, ItemType::Program)?;
        if !program.is_valid() {
            return Err(RobolinkError::InvalidArgument(format!(
                "Invalid program {}",
                name
            )));
        }
        let status = self.run_program(&program)?;
        self.wait_finished(&program)?;
        Ok(status)
    }

    /// Show a message or a comment in the program output
    pub fn run_message(&mut self, message: &str, is_comment: bool) -> Result<()> {
        info!(message = %message, "Program message");
        let message = escape_line_breaks(message);
        self.call_unit(Command::RunMessage, |r| r.flag(is_comment).line(&message))
    }

    /// Render the scene
    ///
    /// Rendering after every call stays off unless `always_render` is set.
    pub fn render(&mut self, always_render: bool) -> Result<()> {
        self.call_unit(Command::Render, |r| r.flag(!always_render))
    }

    // ========================================================================
    // Collisions
    // ========================================================================

    /// True if `inner` is inside `outer`
    pub fn is_inside(&mut self, inner: &Item, outer: &Item) -> Result<bool> {
        self.call(
            Command::IsInside,
            |r| r.item(inner).item(outer),
            |r| Ok(r.int()? > 0),
        )
    }

    /// Number of object pairs currently in collision
    pub fn collisions(&mut self) -> Result<i32> {
        self.call(Command::Collisions, |r| r, |r| r.int())
    }

    /// True if the two items collide
    pub fn collided(&mut self, a: &Item, b: &Item) -> Result<bool> {
        self.call(Command::Collided, |r| r.item(a).item(b), |r| Ok(r.int()? > 0))
    }

    /// Check a segment against the station
    ///
    /// `p1` and `p2` are expressed in `reference` and converted to absolute
    /// coordinates before sending.
    pub fn collision_line(
        &mut self,
        p1: [f64; 3],
        p2: [f64; 3],
        reference: &Pose,
    ) -> Result<LineCollision> {
        let p1 = reference.transform_point(p1);
        let p2 = reference.transform_point(p2);
        self.call(
            Command::CollisionLine,
            |r| r.xyz(&p1).xyz(&p2),
            |r| {
                let item = r.item()?;
                let point = r.xyz()?;
                Ok(LineCollision { item, point })
            },
        )
    }

    // ========================================================================
    // Simulation settings
    // ========================================================================

    /// Simulation speed relative to real time
    pub fn simulation_speed(&mut self) -> Result<f64> {
        self.call(Command::GetSimulationSpeed, |r| r, |r| Ok(r.int()? as f64 / 1000.0))
    }

    /// Set the simulation speed (1 = real time, minimum 0.001)
    pub fn set_simulation_speed(&mut self, speed: f64) -> Result<()> {
        self.call_unit(Command::SetSimulationSpeed, |r| r.int_rounded(speed * 1000.0))
    }

    /// Current run mode (None for a mode this client does not know)
    pub fn run_mode(&mut self) -> Result<Option<RunMode>> {
        self.call(Command::GetRunMode, |r| r, |r| Ok(RunMode::from_code(r.int()?)))
    }

    /// Set how scripts run: simulate, validate or generate programs
    pub fn set_run_mode(&mut self, mode: RunMode) -> Result<()> {
        self.call_unit(Command::SetRunMode, |r| r.int(mode.code()))
    }

    // ========================================================================
    // Station parameters
    // ========================================================================

    /// All station parameters
    pub fn params(&mut self) -> Result<Vec<(String, ParamValue)>> {
        self.call(Command::GetParams, |r| r, |r| {
            let count = r.int()?;
            let mut params = Vec::with_capacity(count.max(0) as usize);
            for _ in 0..count {
                let name = r.line()?;
                let value = r.line()?;
                params.push((name, ParamValue::parse(value)));
            }
            Ok(params)
        })
    }

    /// One station or global parameter (None if unknown)
    ///
    /// Global parameters include `PATH_OPENSTATION`, `FILE_OPENSTATION` and
    /// `PATH_DESKTOP`.
    pub fn param(&mut self, name: &str) -> Result<Option<ParamValue>> {
        let raw = self.call(Command::GetParam, |r| r.line(name), |r| r.line())?;
        if raw.starts_with(UNKNOWN_PARAM_PREFIX) {
            return Ok(None);
        }
        Ok(Some(ParamValue::parse(raw)))
    }

    /// Set a station parameter, creating it if needed
    pub fn set_param(&mut self, name: &str, value: &str) -> Result<()> {
        let value = value.replace('\n', " ");
        self.call_unit(Command::SetParam, |r| r.line(name).line(&value))
    }

    // ========================================================================
    // Batch updates
    // ========================================================================

    /// Set the poses of several items relative to their parents
    ///
    /// Faster than one `set_pose` per item. An empty batch sends nothing.
    pub fn set_poses(&mut self, items: &[Item], poses: &[Pose]) -> Result<()> {
        self.set_pose_batch(Command::SetPosesLocal, items, poses)
    }

    /// Set the absolute poses of several items
    pub fn set_poses_absolute(&mut self, items: &[Item], poses: &[Pose]) -> Result<()> {
        self.set_pose_batch(Command::SetPosesAbsolute, items, poses)
    }

    fn set_pose_batch(&mut self, command: Command, items: &[Item], poses: &[Pose]) -> Result<()> {
        check_parallel("pose batch", items.len(), poses.len())?;
        if items.is_empty() {
            return Ok(());
        }
        self.call_unit(command, |r| {
            r.int(items.len() as i32);
            for (item, pose) in items.iter().zip(poses) {
                r.item(item).pose(pose);
            }
            r
        })
    }

    /// Current joints of several robots
    pub fn joints_list(&mut self, robots: &[Item]) -> Result<Vec<Vec<f64>>> {
        self.call(
            Command::GetJointsList,
            |r| {
                r.int(robots.len() as i32);
                for robot in robots {
                    r.item(robot);
                }
                r
            },
            |r| robots.iter().map(|_| r.array()).collect(),
        )
    }

    /// Set the joints of several robots
    pub fn set_joints_list(&mut self, robots: &[Item], joints: &[Vec<f64>]) -> Result<()> {
        check_parallel("joints batch", robots.len(), joints.len())?;
        self.call_unit(Command::SetJointsList, |r| {
            r.int(robots.len() as i32);
            for (robot, values) in robots.iter().zip(joints) {
                r.item(robot).array(values);
            }
            r
        })
    }

    // ========================================================================
    // Measurement and calibration
    // ========================================================================

    /// Display a joint sequence (`6xN`) or instruction sequence (`7xN`)
    pub fn show_sequence(&mut self, sequence: &Mat) -> Result<()> {
        self.show_sequence_on(&Item::null(), sequence)
    }

    /// Laser tracker measurement
    ///
    /// The tracker first moves to `estimate`; with `search` it looks for the
    /// target. Returns None when no target was found.
    pub fn measure_laser_tracker(
        &mut self,
        estimate: [f64; 3],
        search: bool,
    ) -> Result<Option<[f64; 3]>> {
        let xyz = self.call(
            Command::MeasureLaserTracker,
            |r| r.xyz(&estimate).flag(search),
            |r| r.xyz(),
        )?;
        let norm2: f64 = xyz.iter().map(|v| v * v).sum();
        Ok(if norm2 < 0.0001 { None } else { Some(xyz) })
    }

    /// Calibrate a TCP from a `6xN` matrix of poses
    pub fn calibrate_tcp(
        &mut self,
        poses: &Mat,
        format: EulerType,
        algorithm: CalibrateTcp,
    ) -> Result<TcpCalibration> {
        self.call(
            Command::CalibrateTcp,
            |r| r.matrix(poses).int(format.code()).int(algorithm.code()),
            |r| {
                let tcp = r.array()?;
                let stats = r.array()?;
                let errors = r.matrix()?;
                // per-pose errors are the second column
                let errors = if errors.cols() > 1 {
                    errors.column(1).to_vec()
                } else {
                    Vec::new()
                };
                Ok(TcpCalibration { tcp, stats, errors })
            },
        )
    }

    /// Name the generated program, its folder, post processor and robot
    ///
    /// Must be called before any instruction is output. Returns the number
    /// of errors reported by RoboDK.
    pub fn program_start(
        &mut self,
        name: &str,
        folder: &str,
        post_processor: &str,
        robot: Option<&Item>,
    ) -> Result<i32> {
        let robot = robot.copied().unwrap_or_default();
        self.call(
            Command::ProgramStart,
            |r| r.line(name).line(folder).line(post_processor).item(&robot),
            |r| r.int(),
        )
    }

    // ========================================================================
    // 2-D cameras
    // ========================================================================

    /// Open a 2-D camera view attached to `object`; returns the camera handle
    pub fn camera_add(&mut self, object: &Item, params: &str) -> Result<u64> {
        self.call(Command::CameraAdd, |r| r.item(object).line(params), |r| r.ptr())
    }

    /// Save a camera snapshot to an image file
    pub fn camera_snapshot(&mut self, path: &str, camera: u64) -> Result<bool> {
        self.call(
            Command::CameraSnapshot,
            |r| r.ptr(camera).line(path),
            |r| Ok(r.int()? > 0),
        )
    }

    /// Close one camera, or all of them with None
    pub fn camera_close(&mut self, camera: Option<u64>) -> Result<bool> {
        match camera {
            None | Some(0) => self.call(Command::CameraCloseAll, |r| r, |r| Ok(r.int()? > 0)),
            Some(handle) => self.call(
                Command::CameraClose,
                |r| r.ptr(handle),
                |r| Ok(r.int()? > 0),
            ),
        }
    }

    /// Change camera parameters
    pub fn camera_set_params(&mut self, params: &str, camera: u64) -> Result<bool> {
        self.call(
            Command::CameraSetParams,
            |r| r.ptr(camera).line(params),
            |r| Ok(r.int()? > 0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_parsing() {
        assert_eq!(ParamValue::parse("12.5".into()), ParamValue::Number(12.5));
        assert_eq!(ParamValue::parse("3".into()), ParamValue::Number(3.0));
        assert_eq!(
            ParamValue::parse("C:/Stations".into()),
            ParamValue::Text("C:/Stations".into())
        );
    }

    #[test]
    fn test_parallel_lists_checked() {
        assert!(check_parallel("x", 2, 2).is_ok());
        assert!(matches!(
            check_parallel("x", 2, 3),
            Err(RobolinkError::InvalidArgument(_))
        ));
    }
}
