//! Hexagon Welding Path Example
//!
//! Asks the user to pick a robot in RoboDK, then traces a hexagon around the
//! station item named `Target` and returns home.
//!
//! # Usage
//!
//! ```bash
//! # RoboDK running with a station containing a robot and a target named "Target"
//! RUST_LOG=robolink_rust=debug cargo run --example weld_hexagon
//! ```

use std::f64::consts::PI;

use robolink_rust::{ItemType, Link, LinkConfig, Pose, Result, RobolinkError};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    if let Err(e) = run() {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut link = Link::connect(LinkConfig::default())?;

    let robot = link.pick_item("Select a robot for welding", Some(ItemType::Robot))?;
    if !robot.is_valid() {
        return Err(RobolinkError::InvalidArgument(
            "Operation cancelled by user".to_string(),
        ));
    }
    let home = link.joints_home(&robot)?;

    // the reference target and its frame
    let target = link.item("Target")?;
    let reference = link.parent(&target)?;
    link.set_frame(&robot, &reference)?;

    let pose_ref = link.pose(&target)?;
    let approach = pose_ref * Pose::translation(0.0, 0.0, -100.0);

    info!("Moving to the weld center");
    link.move_j(&robot, home.clone(), true)?;
    link.move_j(&robot, approach, true)?;
    link.move_l(&robot, &target, true)?;

    for i in 0..7 {
        let angle = i as f64 * 2.0 * PI / 6.0;
        let corner = pose_ref
            * Pose::rot_z(angle)
            * Pose::translation(200.0, 0.0, 0.0)
            * Pose::rot_z(-angle);
        info!(corner = i, "Welding");
        link.move_l(&robot, corner, true)?;
    }

    info!("Returning home");
    link.move_l(&robot, &target, true)?;
    link.move_l(&robot, approach, true)?;
    link.move_j(&robot, home, true)?;
    Ok(())
}
