// src/source/daemon.rs
//! Position source backed by a fix-reporting daemon such as gpsd

use super::PositionSource;
use crate::error::Result;
use crate::gps::gpsd::{FixService, ServiceConnector};
use crate::gps::Fix;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay between checks while the daemon has nothing pending
pub const POLL_DELAY: Duration = Duration::from_millis(100);

/// Polls a daemon for fixes.
///
/// The connection is opened on the first call to `next_fix`. A service error
/// closes it and is returned to the caller; calling `next_fix` again
/// reconnects.
pub struct DaemonSource<C: ServiceConnector> {
    connector: C,
    service: Option<C::Service>,
    poll_delay: Duration,
}

impl<C: ServiceConnector> DaemonSource<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            service: None,
            poll_delay: POLL_DELAY,
        }
    }

    pub fn with_poll_delay(mut self, poll_delay: Duration) -> Self {
        self.poll_delay = poll_delay;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.service.is_some()
    }

    async fn next_report(service: &mut C::Service, poll_delay: Duration) -> Result<Fix> {
        loop {
            if !service.waiting().await? {
                tokio::time::sleep(poll_delay).await;
                continue;
            }

            service.poll().await?;

            let report = service.fix();
            if report.longitude.is_nan() || report.latitude.is_nan() {
                debug!("daemon report without position");
                continue;
            }

            return Ok(Fix::from_reported(
                report.longitude,
                report.latitude,
                report.altitude,
                report.speed,
            ));
        }
    }
}

impl<C: ServiceConnector> PositionSource for DaemonSource<C> {
    async fn next_fix(&mut self) -> Result<Fix> {
        let service = match self.service.as_mut() {
            Some(service) => service,
            None => {
                info!("Connecting to {} ...", self.connector.describe());
                let service = self.connector.connect().await?;
                self.service.insert(service)
            }
        };

        match Self::next_report(service, self.poll_delay).await {
            Ok(fix) => Ok(fix),
            Err(e) => {
                warn!("Daemon error on {}: {}", self.connector.describe(), e);
                if let Some(mut service) = self.service.take() {
                    service.close().await;
                }
                Err(e)
            }
        }
    }

    fn describe(&self) -> String {
        self.connector.describe()
    }
}
