// src/gps/gpsd.rs
//! GPSD client implementation

use crate::error::{GpsError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tracing::{debug, info, warn};

/// Default gpsd port
pub const GPSD_PORT: u16 = 2947;

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// The latest fix reported by the daemon. NaN marks unknown values.
#[derive(Debug, Clone, Copy)]
pub struct ReportedFix {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    /// Metres per second
    pub speed: f64,
}

impl Default for ReportedFix {
    fn default() -> Self {
        Self {
            longitude: f64::NAN,
            latitude: f64::NAN,
            altitude: f64::NAN,
            speed: f64::NAN,
        }
    }
}

/// A fix-reporting service the daemon position source can poll
#[allow(async_fn_in_trait)]
pub trait FixService {
    /// Whether a report is pending; must not block
    async fn waiting(&mut self) -> Result<bool>;

    /// Consume one pending report and update the latest fix
    async fn poll(&mut self) -> Result<()>;

    fn fix(&self) -> &ReportedFix;

    async fn close(&mut self);
}

/// Connects a `FixService`; the daemon source reconnects through this after
/// an error.
#[allow(async_fn_in_trait)]
pub trait ServiceConnector {
    type Service: FixService;

    async fn connect(&mut self) -> Result<Self::Service>;

    fn describe(&self) -> String;
}

/// Connect to a gpsd daemon and return a stream reader
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| {
            GpsError::Connection(format!(
                "Failed to connect to gpsd at {}:{}: {}",
                host, port, e
            ))
        })?;

    // Send WATCH command to start receiving JSON data
    let watch_cmd = "?WATCH={\"enable\":true,\"json\":true}\n";
    stream
        .write_all(watch_cmd.as_bytes())
        .await
        .map_err(|e| GpsError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// gpsd JSON client over any buffered duplex stream
pub struct GpsdClient<R> {
    reader: R,
    fix: ReportedFix,
    line: String,
}

impl<R: AsyncBufRead + Unpin> GpsdClient<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            fix: ReportedFix::default(),
            line: String::new(),
        }
    }
}

impl GpsdClient<BufReader<TcpStream>> {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        Ok(Self::new(connect_gpsd(host, port).await?))
    }
}

impl<R: AsyncBufRead + AsyncWrite + Unpin> FixService for GpsdClient<R> {
    async fn waiting(&mut self) -> Result<bool> {
        // The inner future is polled once before the zero deadline is checked
        match tokio::time::timeout(Duration::ZERO, self.reader.fill_buf()).await {
            Ok(Ok([])) => Err(GpsError::Connection("gpsd closed the connection".to_string())),
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(GpsError::Io(e)),
            Err(_) => Ok(false),
        }
    }

    async fn poll(&mut self) -> Result<()> {
        self.line.clear();
        let read = self.reader.read_line(&mut self.line).await?;
        if read == 0 {
            return Err(GpsError::Connection("gpsd closed the connection".to_string()));
        }

        let line = self.line.trim();
        if !line.is_empty() {
            if let Err(e) = parse_gpsd_json(&mut self.fix, line) {
                warn!("Error parsing gpsd JSON: {}", e);
            }
        }
        Ok(())
    }

    fn fix(&self) -> &ReportedFix {
        &self.fix
    }

    async fn close(&mut self) {
        self.line.clear();
        if let Err(e) = self.reader.shutdown().await {
            debug!("Shutting down gpsd connection: {}", e);
        }
    }
}

/// Connects `GpsdClient`s over TCP
#[derive(Debug, Clone)]
pub struct GpsdConnector {
    pub host: String,
    pub port: u16,
}

impl GpsdConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl ServiceConnector for GpsdConnector {
    type Service = GpsdClient<BufReader<TcpStream>>;

    async fn connect(&mut self) -> Result<Self::Service> {
        GpsdClient::connect(&self.host, self.port).await
    }

    fn describe(&self) -> String {
        format!("gpsd://{}:{}", self.host, self.port)
    }
}

/// Parse a single line of gpsd JSON data
pub fn parse_gpsd_json(fix: &mut ReportedFix, line: &str) -> Result<()> {
    let msg: GpsdMessage = serde_json::from_str(line)?;

    match msg.class.as_str() {
        "TPV" => parse_tpv_message(fix, &msg.data),
        "VERSION" => parse_version_message(&msg.data),
        "DEVICES" => parse_devices_message(&msg.data),
        other => debug!(class = other, "ignoring gpsd report"),
    }

    Ok(())
}

fn number(msg_data: &HashMap<String, serde_json::Value>, key: &str) -> f64 {
    msg_data
        .get(key)
        .and_then(|v| v.as_f64())
        .unwrap_or(f64::NAN)
}

/// Parse TPV (Time Position Velocity) message; absent values become NaN
fn parse_tpv_message(fix: &mut ReportedFix, msg_data: &HashMap<String, serde_json::Value>) {
    fix.latitude = number(msg_data, "lat");
    fix.longitude = number(msg_data, "lon");
    // gpsd 3.20 renamed alt to altHAE
    fix.altitude = match number(msg_data, "altHAE") {
        alt if alt.is_nan() => number(msg_data, "alt"),
        alt => alt,
    };
    fix.speed = number(msg_data, "speed");
}

/// Parse VERSION message (informational)
fn parse_version_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(version) = msg_data.get("release").and_then(|v| v.as_str()) {
        info!("Connected to gpsd version: {}", version);
    }
}

/// Parse DEVICES message (informational)
fn parse_devices_message(msg_data: &HashMap<String, serde_json::Value>) {
    if let Some(devices) = msg_data.get("devices").and_then(|v| v.as_array()) {
        info!("gpsd managing {} device(s)", devices.len());
        for device in devices {
            if let Some(path) = device.get("path").and_then(|v| v.as_str()) {
                debug!("  Device: {}", path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TPV: &str = r#"{"class":"TPV","device":"/dev/ttyUSB0","mode":3,"time":"2023-01-01T12:00:00.000Z","ept":0.005,"lat":48.117,"lon":11.517,"alt":545.4,"track":10.3797,"speed":0.091,"climb":10.7}"#;

    #[test]
    fn test_tpv_parsing() {
        let mut fix = ReportedFix::default();
        parse_gpsd_json(&mut fix, TPV).unwrap();

        assert_eq!(fix.latitude, 48.117);
        assert_eq!(fix.longitude, 11.517);
        assert_eq!(fix.altitude, 545.4);
        assert_eq!(fix.speed, 0.091);
    }

    #[test]
    fn test_tpv_without_altitude() {
        let mut fix = ReportedFix::default();
        let json = r#"{"class":"TPV","mode":2,"lat":48.117,"lon":11.517}"#;
        parse_gpsd_json(&mut fix, json).unwrap();

        assert_eq!(fix.latitude, 48.117);
        assert!(fix.altitude.is_nan());
        assert!(fix.speed.is_nan());
    }

    #[test]
    fn test_tpv_alt_hae() {
        let mut fix = ReportedFix::default();
        let json = r#"{"class":"TPV","mode":3,"lat":1.0,"lon":2.0,"altHAE":12.5}"#;
        parse_gpsd_json(&mut fix, json).unwrap();
        assert_eq!(fix.altitude, 12.5);
    }

    #[test]
    fn test_sky_leaves_fix_untouched() {
        let mut fix = ReportedFix::default();
        parse_gpsd_json(&mut fix, TPV).unwrap();
        let sky = r#"{"class":"SKY","hdop":1.2,"satellites":[{"PRN":1,"ss":42,"used":true}]}"#;
        parse_gpsd_json(&mut fix, sky).unwrap();
        assert_eq!(fix.latitude, 48.117);
    }

    #[test]
    fn test_invalid_json() {
        let mut fix = ReportedFix::default();
        let invalid_json = r#"{"invalid": json"#;

        let result = parse_gpsd_json(&mut fix, invalid_json);
        assert!(matches!(result, Err(GpsError::Json(_))));
    }

    use tokio::io::{AsyncReadExt, DuplexStream};

    /// A client whose peer has sent `input` and hung up
    async fn client_with_input(input: &str) -> GpsdClient<BufReader<DuplexStream>> {
        let (local, mut peer) = tokio::io::duplex(4096);
        peer.write_all(input.as_bytes()).await.unwrap();
        drop(peer);
        GpsdClient::new(BufReader::new(local))
    }

    #[tokio::test]
    async fn test_client_polls_reports() {
        let input = format!("{}\n{{broken\n", TPV);
        let mut client = client_with_input(&input).await;

        assert!(client.waiting().await.unwrap());
        client.poll().await.unwrap();
        assert_eq!(client.fix().longitude, 11.517);

        // Garbage lines are skipped
        assert!(client.waiting().await.unwrap());
        client.poll().await.unwrap();
        assert_eq!(client.fix().longitude, 11.517);

        // End of stream is a connection error
        assert!(matches!(
            client.waiting().await,
            Err(GpsError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_client_not_waiting_on_idle_stream() {
        let (reader, _writer) = tokio::io::duplex(64);
        let mut client = GpsdClient::new(BufReader::new(reader));
        assert!(!client.waiting().await.unwrap());
    }

    #[tokio::test]
    async fn test_close_shuts_down_stream() {
        let (local, mut peer) = tokio::io::duplex(64);
        let mut client = GpsdClient::new(BufReader::new(local));

        client.close().await;

        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(Duration::from_secs(1), peer.read(&mut buf))
            .await
            .expect("peer still open")
            .unwrap();
        assert_eq!(read, 0);
    }
}
