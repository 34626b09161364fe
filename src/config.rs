// src/config.rs
//! Configuration management stored as JSON in the user's config directory

use crate::error::{GpsError, Result};
use crate::gps::gpsd::GPSD_PORT;
use crate::monitor::GpsSource;
use crate::sink::SinkSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    pub source_type: String, // "gpsd", "tcp", "serial"
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    pub tcp_address: Option<String>,
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub checksum: bool,
    pub output: String,
    pub name: String,
    pub description: String,
    pub range: f64,
    pub tilt: f64,
    pub heading: f64,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            source_type: "gpsd".to_string(),
            gpsd_host: Some("localhost".to_string()),
            gpsd_port: Some(GPSD_PORT),
            tcp_address: None,
            serial_port: None,
            serial_baudrate: Some(9600),
            checksum: true,
            output: "gps-position.kml".to_string(),
            name: "GPS Position".to_string(),
            description: String::new(),
            range: 0.0,
            tilt: 0.0,
            heading: 0.0,
        }
    }
}

impl GpsConfig {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists yet
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| GpsError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GpsError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GpsError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| GpsError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents)
            .map_err(|e| GpsError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| GpsError::Config("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home)
            .join(".config")
            .join("gps-update")
            .join("config.json"))
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.source_type = "gpsd".to_string();
        self.gpsd_host = Some(host);
        self.gpsd_port = Some(port);
    }

    /// Update raw NMEA over TCP settings
    pub fn update_tcp(&mut self, address: String) {
        self.source_type = "tcp".to_string();
        self.tcp_address = Some(address);
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// Resolve the configured source
    pub fn source(&self) -> Result<GpsSource> {
        match self.source_type.as_str() {
            "gpsd" => Ok(GpsSource::Gpsd {
                host: self
                    .gpsd_host
                    .clone()
                    .unwrap_or_else(|| "localhost".to_string()),
                port: self.gpsd_port.unwrap_or(GPSD_PORT),
            }),
            "tcp" => {
                let address = self.tcp_address.clone().ok_or_else(|| {
                    GpsError::Config("tcp source requires tcp_address".to_string())
                })?;
                Ok(GpsSource::Tcp {
                    address,
                    checksum: self.checksum,
                })
            }
            "serial" => {
                let port = self.serial_port.clone().ok_or_else(|| {
                    GpsError::Config("serial source requires serial_port".to_string())
                })?;
                Ok(GpsSource::Serial {
                    port,
                    baudrate: self.serial_baudrate.unwrap_or(9600),
                    checksum: self.checksum,
                })
            }
            other => Err(GpsError::Config(format!("Unknown source type: {}", other))),
        }
    }

    pub fn sink_settings(&self) -> SinkSettings {
        SinkSettings {
            output: PathBuf::from(&self.output),
            name: self.name.clone(),
            description: self.description.clone(),
            range: self.range,
            tilt: self.tilt,
            heading: self.heading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GpsConfig::default();
        assert_eq!(config.source_type, "gpsd");
        assert!(config.checksum);
        assert!(matches!(
            config.source().unwrap(),
            GpsSource::Gpsd { port: 2947, .. }
        ));
    }

    #[test]
    fn test_update_serial() {
        let mut config = GpsConfig::default();
        config.update_serial("/dev/rfcomm0".to_string(), 115200);
        assert_eq!(config.source_type, "serial");

        match config.source().unwrap() {
            GpsSource::Serial {
                port,
                baudrate,
                checksum,
            } => {
                assert_eq!(port, "/dev/rfcomm0");
                assert_eq!(baudrate, 115200);
                assert!(checksum);
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_tcp_requires_address() {
        let mut config = GpsConfig::default();
        config.source_type = "tcp".to_string();
        assert!(matches!(config.source(), Err(GpsError::Config(_))));

        config.update_tcp("192.168.1.10:10110".to_string());
        assert!(matches!(config.source().unwrap(), GpsSource::Tcp { .. }));
    }

    #[test]
    fn test_unknown_source_type() {
        let mut config = GpsConfig::default();
        config.source_type = "windows".to_string();
        assert!(config.source().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = GpsConfig::default();
        config.update_gpsd("gps.local".to_string(), 3000);
        config.name = "Boat".to_string();
        config.save_to(&path).unwrap();

        assert_eq!(GpsConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"output": "/tmp/car.kml", "range": 500.0}"#).unwrap();

        let config = GpsConfig::load_from(&path).unwrap();
        assert_eq!(config.output, "/tmp/car.kml");
        assert_eq!(config.range, 500.0);
        assert_eq!(config.source_type, "gpsd");
        assert_eq!(config.sink_settings().range, 500.0);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = GpsConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, GpsConfig::default());
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            GpsConfig::load_from(&path),
            Err(GpsError::Config(_))
        ));
    }
}
