//! Tokio front-end for a [`Link`]
//!
//! The protocol is strictly request/response over one socket, so the async
//! wrapper serializes calls behind a mutex and runs each one on the blocking
//! pool. Clones share the same session.
//!
//! # Examples
//!
//! ```no_run
//! use robolink_rust::io::AsyncLink;
//! use robolink_rust::LinkConfig;
//!
//! # async fn example() -> robolink_rust::Result<()> {
//! let link = AsyncLink::connect(LinkConfig::default()).await?;
//! let robot = link.call(|l| l.item("UR10")).await?;
//! let joints = link.call(move |l| l.joints(&robot)).await?;
//! println!("{:?}", joints);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::trace;

use crate::error::{Result, RobolinkError};
use crate::io::config::LinkConfig;
use crate::link::Link;

/// Shareable async handle to one RoboDK session
#[derive(Debug, Clone)]
pub struct AsyncLink {
    inner: Arc<Mutex<Link>>,
}

impl AsyncLink {
    /// Wrap an existing link
    pub fn new(link: Link) -> Self {
        AsyncLink {
            inner: Arc::new(Mutex::new(link)),
        }
    }

    /// Connect on the blocking pool
    pub async fn connect(config: LinkConfig) -> Result<Self> {
        let link = tokio::task::spawn_blocking(move || Link::connect(config))
            .await
            .map_err(join_error)??;
        Ok(Self::new(link))
    }

    /// Run `f` against the link once every earlier call has finished
    ///
    /// `f` runs on the blocking pool, so it may issue any number of
    /// commands, including waits.
    pub async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Link) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut link = self.inner.clone().lock_owned().await;
        trace!("Link acquired");
        tokio::task::spawn_blocking(move || f(&mut link))
            .await
            .map_err(join_error)?
    }

    /// Close the connection; the next call reconnects
    pub async fn disconnect(&self) {
        self.inner.lock().await.disconnect();
    }
}

fn join_error(e: JoinError) -> RobolinkError {
    RobolinkError::Io(std::io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::connection::LinkState;

    #[tokio::test]
    async fn test_call_on_unreachable_host_fails() {
        let config = LinkConfig {
            connect_passes: 1,
            probe_timeout: std::time::Duration::from_millis(200),
            ..LinkConfig::remote("192.0.2.1")
        };
        let link = AsyncLink::new(Link::new(config));
        let err = link.call(|l| l.item("robot")).await.unwrap_err();
        assert!(matches!(err, RobolinkError::ConnectionFailed { .. }));
        let state = link.call(|l| Ok(l.state())).await.unwrap();
        assert_eq!(state, LinkState::Failed);
    }

    #[tokio::test]
    async fn test_clones_share_the_session() {
        let link = AsyncLink::new(Link::new(LinkConfig::default()));
        let other = link.clone();
        assert!(Arc::ptr_eq(&link.inner, &other.inner));
    }
}
