//! Station Report Example
//!
//! Lists every robot of the open station with its joints, joint limits and
//! flange position, using the async link.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example station_report
//! ```

use robolink_rust::{AsyncLink, ItemType, LinkConfig, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let link = AsyncLink::connect(LinkConfig::default()).await?;

    let robots = link
        .call(|l| l.item_list(Some(ItemType::Robot)))
        .await?;
    if robots.is_empty() {
        warn!("The station has no robots");
        return Ok(());
    }

    for robot in robots {
        let (name, joints, limits, flange) = link
            .call(move |l| {
                let name = l.name(&robot)?;
                let joints = l.joints(&robot)?;
                let limits = l.joint_limits(&robot)?;
                let flange = l.pose(&robot)?;
                Ok((name, joints, limits, flange))
            })
            .await?;

        info!(robot = %name, "Robot");
        println!("{}", name);
        println!("  joints:   {:?}", joints);
        println!("  lower:    {:?}", limits.lower);
        println!("  upper:    {:?}", limits.upper);
        let [x, y, z] = flange.position();
        println!("  flange:   [{:.1}, {:.1}, {:.1}] mm", x, y, z);
    }
    Ok(())
}
