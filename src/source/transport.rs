// src/source/transport.rs
//! Byte-stream transports carrying raw NMEA

use crate::error::{GpsError, Result};
use std::time::Duration;
use tokio::{io::AsyncRead, net::TcpStream};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Opens a fresh byte stream on every call
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Stream: AsyncRead + Unpin;

    async fn connect(&mut self) -> Result<Self::Stream>;

    fn describe(&self) -> String;
}

/// NMEA over TCP, e.g. a receiver bridged by `gpsd -N -G` or a network GPS
#[derive(Debug, Clone)]
pub struct TcpConnector {
    pub address: String,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&mut self) -> Result<TcpStream> {
        TcpStream::connect(&self.address).await.map_err(|e| {
            GpsError::Connection(format!("Failed to connect to {}: {}", self.address, e))
        })
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }
}

/// NMEA over a serial device. Bluetooth receivers bound with `rfcomm`
/// show up as `/dev/rfcommN` and are opened the same way.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    pub port: String,
    pub baudrate: u32,
}

impl SerialConnector {
    pub fn new(port: impl Into<String>, baudrate: u32) -> Self {
        Self {
            port: port.into(),
            baudrate,
        }
    }
}

impl Connector for SerialConnector {
    type Stream = SerialStream;

    async fn connect(&mut self) -> Result<SerialStream> {
        tokio_serial::new(&self.port, self.baudrate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
            .map_err(GpsError::from)
    }

    fn describe(&self) -> String {
        format!("{} at {} baud", self.port, self.baudrate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_connector_reads_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"$GPGSV,3,1,11*4A\r\n").await.unwrap();
        });

        let mut connector = TcpConnector::new(address.clone());
        assert_eq!(connector.describe(), format!("tcp://{}", address));

        let mut stream = connector.connect().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        assert!(received.starts_with(b"$GPGSV"));
    }

    #[tokio::test]
    async fn test_tcp_connector_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut connector = TcpConnector::new(address);
        assert!(matches!(
            connector.connect().await,
            Err(GpsError::Connection(_))
        ));
    }

    #[test]
    fn test_serial_describe() {
        let connector = SerialConnector::new("/dev/rfcomm0", 9600);
        assert_eq!(connector.describe(), "/dev/rfcomm0 at 9600 baud");
    }

    #[tokio::test]
    async fn test_serial_connector_missing_device() {
        let mut connector = SerialConnector::new("/dev/nonexistent-gps0", 9600);
        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, GpsError::Serial(_)), "{:?}", err);
        assert!(err.to_string().starts_with("Serial error:"));
    }
}
