// src/source/stream.rs
//! Position source reading raw NMEA from a reconnecting byte stream

use super::{ConnectorState, Connector, PositionSource};
use crate::error::Result;
use crate::gps::{
    data::KNOTS_TO_MPS, Fix, LineReassembler, NmeaMessage, NmeaParser, RmcMessage, Satellite,
};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, trace, warn};

/// Delay before reconnecting after a transport error
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

const READ_SIZE: usize = 1024;

/// Reads sentences from a `Connector`, reconnecting forever on transport
/// errors, and yields a fix for every RMC sentence.
pub struct NmeaStreamSource<C: Connector> {
    connector: C,
    parser: NmeaParser,
    stream: Option<C::Stream>,
    state: ConnectorState,
    reassembler: LineReassembler,
    lines: VecDeque<Vec<u8>>,
    satellites: Vec<Satellite>,
    reconnect_delay: Duration,
}

impl<C: Connector> NmeaStreamSource<C> {
    pub fn new(connector: C, parser: NmeaParser) -> Self {
        Self {
            connector,
            parser,
            stream: None,
            state: ConnectorState::Disconnected,
            reassembler: LineReassembler::new(),
            lines: VecDeque::new(),
            satellites: Vec::new(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    pub fn state(&self) -> ConnectorState {
        self.state
    }

    /// Satellites from the most recent GSV sentence
    pub fn satellites(&self) -> &[Satellite] {
        &self.satellites
    }

    fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            info!("Disconnected from {}.", self.connector.describe());
        }
        self.state = ConnectorState::Disconnected;
    }

    /// Return the next complete line, connecting and reading as needed.
    /// Transport errors are logged and retried after the reconnect delay.
    async fn next_line(&mut self) -> Vec<u8> {
        let mut chunk = [0u8; READ_SIZE];
        loop {
            if let Some(line) = self.lines.pop_front() {
                return line;
            }

            let stream = match self.stream.as_mut() {
                Some(stream) => stream,
                None => {
                    self.state = ConnectorState::Connecting;
                    info!("Connecting to {} ...", self.connector.describe());
                    match self.connector.connect().await {
                        Ok(stream) => {
                            info!("Connected to {}.", self.connector.describe());
                            self.reassembler.clear();
                            self.state = ConnectorState::Streaming;
                            self.stream.insert(stream)
                        }
                        Err(e) => {
                            warn!(
                                "Connection to {} failed: {}",
                                self.connector.describe(),
                                e
                            );
                            self.state = ConnectorState::Disconnected;
                            tokio::time::sleep(self.reconnect_delay).await;
                            continue;
                        }
                    }
                }
            };

            match stream.read(&mut chunk).await {
                Ok(0) => {
                    warn!("{} closed the connection", self.connector.describe());
                    self.disconnect();
                    tokio::time::sleep(self.reconnect_delay).await;
                }
                Ok(n) => self.lines.extend(self.reassembler.feed(&chunk[..n])),
                Err(e) => {
                    warn!("Read error on {}: {}", self.connector.describe(), e);
                    self.disconnect();
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    fn rmc_to_fix(rmc: &RmcMessage) -> Fix {
        let (latitude, longitude) = rmc.position_degrees();
        Fix::new(longitude, latitude)
            .with_altitude(rmc.altitude)
            .with_speed(rmc.speed.map(|knots| knots * KNOTS_TO_MPS))
    }
}

impl<C: Connector> PositionSource for NmeaStreamSource<C> {
    async fn next_fix(&mut self) -> Result<Fix> {
        loop {
            let raw = self.next_line().await;
            let line = String::from_utf8_lossy(&raw);

            match self.parser.parse(&line) {
                Ok(Some(NmeaMessage::Rmc(rmc))) => {
                    trace!(status = %rmc.status, time = %rmc.time, "RMC");
                    return Ok(Self::rmc_to_fix(&rmc));
                }
                Ok(Some(NmeaMessage::Gsv(gsv))) => {
                    debug!(
                        talker = %gsv.talker,
                        sentence = ?gsv.origin,
                        count = gsv.count,
                        in_view = ?gsv.total,
                        "{} satellites in sentence",
                        gsv.satellites.len()
                    );
                    self.satellites = gsv.satellites;
                }
                Ok(Some(other)) => {
                    debug!("Ignoring {}{} sentence", other.talker(), other.message());
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Failed to parse NMEA message {:?}: {}", line.trim_end(), e);
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.connector.describe()
    }
}
