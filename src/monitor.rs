// src/monitor.rs
//! Drives a position source into a sink

use crate::{
    error::Result,
    gps::{gpsd::GpsdConnector, NmeaParser},
    sink::{FixSink, KmlUpdater, SinkSettings},
    source::{
        stream::RECONNECT_DELAY, DaemonSource, NmeaStreamSource, PositionSource, SerialConnector,
        TcpConnector,
    },
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::{info, warn};

/// GPS data source configuration
#[derive(Debug, Clone, PartialEq)]
pub enum GpsSource {
    Gpsd { host: String, port: u16 },
    Tcp { address: String, checksum: bool },
    Serial { port: String, baudrate: u32, checksum: bool },
}

/// Pulls fixes from a source and hands each one to a sink until stopped
pub struct PositionUpdater {
    running: Arc<AtomicBool>,
    retry_delay: Duration,
}

impl PositionUpdater {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            retry_delay: RECONNECT_DELAY,
        }
    }

    /// Pause between a failed read and the next attempt
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Build the configured source and sink and run until stopped
    pub async fn start(&self, source: GpsSource, settings: &SinkSettings) -> Result<()> {
        let mut sink = KmlUpdater::from_settings(settings);
        info!("Writing position to {}", sink.path().display());

        match source {
            GpsSource::Gpsd { host, port } => {
                let mut source = DaemonSource::new(GpsdConnector::new(host, port));
                self.run(&mut source, &mut sink).await
            }
            GpsSource::Tcp { address, checksum } => {
                let mut source =
                    NmeaStreamSource::new(TcpConnector::new(address), NmeaParser::new(checksum));
                self.run(&mut source, &mut sink).await
            }
            GpsSource::Serial {
                port,
                baudrate,
                checksum,
            } => {
                let mut source = NmeaStreamSource::new(
                    SerialConnector::new(port, baudrate),
                    NmeaParser::new(checksum),
                );
                self.run(&mut source, &mut sink).await
            }
        }
    }

    /// Feed every fix from `source` into `sink`.
    ///
    /// Source errors are logged and the source is asked again after the
    /// retry delay; a daemon source reconnects on that next call.
    pub async fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<()>
    where
        S: PositionSource,
        K: FixSink,
    {
        info!("Reading positions from {}", source.describe());

        while self.is_running() {
            match source.next_fix().await {
                Ok(fix) => sink.on_fix(&fix),
                Err(e) => {
                    warn!(
                        "Position source {} failed: {}, retrying in {:?}",
                        source.describe(),
                        e,
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }

        info!("Stopped reading from {}", source.describe());
        Ok(())
    }

    /// Stop the updater after the current fix
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Default for PositionUpdater {
    fn default() -> Self {
        Self::new()
    }
}
