//! Starting RoboDK on demand
//!
//! When a local host has no live port, the connection starts the application
//! once between scan passes. The [`Launcher`] trait is the seam that lets tests
//! count spawns without starting a process.

use std::fmt;
use std::process::{Command, Stdio};

use tracing::info;

use crate::error::{Result, RobolinkError};

/// Capability to start the RoboDK application
pub trait Launcher: Send {
    /// Start the application at `path` without waiting for it to exit
    fn launch(&mut self, path: &str) -> Result<()>;
}

/// Starts the application as a detached child process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&mut self, path: &str) -> Result<()> {
        info!(path = %path, "Starting RoboDK");
        Command::new(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_child| ())
            .map_err(|source| RobolinkError::LaunchFailed {
                path: path.to_string(),
                source,
            })
    }
}

impl<F> Launcher for F
where
    F: FnMut(&str) -> Result<()> + Send,
{
    fn launch(&mut self, path: &str) -> Result<()> {
        self(path)
    }
}

/// Boxed launcher with a readable `Debug`
pub(crate) struct BoxedLauncher(pub(crate) Box<dyn Launcher>);

impl fmt::Debug for BoxedLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Launcher")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_application_is_launch_error() {
        let mut launcher = ProcessLauncher;
        let err = launcher
            .launch("/nonexistent/robodk/bin/RoboDK")
            .unwrap_err();
        match err {
            RobolinkError::LaunchFailed { path, .. } => {
                assert_eq!(path, "/nonexistent/robodk/bin/RoboDK")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_closure_launcher() {
        let mut calls = Vec::new();
        {
            let mut launcher = |path: &str| {
                calls.push(path.to_string());
                Ok::<(), RobolinkError>(())
            };
            launcher.launch("robodk").unwrap();
        }
        assert_eq!(calls, vec!["robodk".to_string()]);
    }
}
