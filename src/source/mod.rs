// src/source/mod.rs
//! Position sources: turn a transport into a sequence of fixes

pub mod daemon;
pub mod stream;
pub mod transport;

pub use daemon::DaemonSource;
pub use stream::NmeaStreamSource;
pub use transport::{Connector, SerialConnector, TcpConnector};

use crate::error::Result;
use crate::gps::Fix;

/// A pull-based producer of fixes
#[allow(async_fn_in_trait)]
pub trait PositionSource {
    /// Wait for the next fix.
    ///
    /// Sources that retry internally only return errors they cannot recover
    /// from; the daemon source returns every service error.
    async fn next_fix(&mut self) -> Result<Fix>;

    /// Human readable name of the underlying transport
    fn describe(&self) -> String;
}

/// Connection lifecycle of a reconnecting source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Streaming,
}
