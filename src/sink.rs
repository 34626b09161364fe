// src/sink.rs
//! Consumers of position updates

use crate::error::Result;
use crate::gps::Fix;
use crate::kml::{render_placemark, Placemark};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Receives every fix a position source produces
pub trait FixSink {
    fn on_fix(&mut self, fix: &Fix);
}

/// Static placemark settings applied to every rendered document
#[derive(Debug, Clone)]
pub struct SinkSettings {
    pub output: PathBuf,
    pub name: String,
    pub description: String,
    pub range: f64,
    pub tilt: f64,
    pub heading: f64,
}

/// Keeps a KML file in sync with the latest fix.
///
/// The file is rewritten in place (truncate and write), so a viewer reading
/// concurrently may briefly see an empty or partial document. Updates that
/// do not change the placemark are skipped. A failed write leaves the last
/// persisted placemark untouched, so the next update retries even when it
/// carries the same fix.
pub struct KmlUpdater {
    path: PathBuf,
    file: Option<File>,
    persisted: Placemark,
    writes: u64,
}

impl KmlUpdater {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_placemark(path, Placemark::default())
    }

    pub fn with_placemark(path: impl Into<PathBuf>, placemark: Placemark) -> Self {
        Self {
            path: path.into(),
            file: None,
            persisted: placemark,
            writes: 0,
        }
    }

    pub fn from_settings(settings: &SinkSettings) -> Self {
        let placemark = Placemark {
            name: settings.name.clone(),
            description: settings.description.clone(),
            range: settings.range,
            tilt: settings.tilt,
            heading: settings.heading,
            ..Placemark::default()
        };
        Self::with_placemark(&settings.output, placemark)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The placemark as last written to disk
    pub fn placemark(&self) -> &Placemark {
        &self.persisted
    }

    /// Number of successful writes
    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn merge(&self, fix: &Fix) -> Placemark {
        let mut placemark = self.persisted.clone();
        placemark.longitude = fix.longitude;
        placemark.latitude = fix.latitude;
        if let Some(altitude) = fix.altitude {
            placemark.altitude = altitude;
        }
        if let Some(speed) = fix.speed {
            placemark.speed = Some(speed);
        }
        placemark
    }

    fn write(&mut self, placemark: &Placemark) -> Result<()> {
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&self.path)?;
                self.file.insert(file)
            }
        };

        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        file.write_all(render_placemark(placemark).as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

impl FixSink for KmlUpdater {
    fn on_fix(&mut self, fix: &Fix) {
        let placemark = self.merge(fix);
        if placemark == self.persisted {
            debug!("No update");
            return;
        }

        let first = self.writes == 0;
        match self.write(&placemark) {
            Ok(()) => {
                self.persisted = placemark;
                self.writes += 1;
                if first {
                    info!("File {} updated with gps data.", self.path.display());
                }
                debug!(
                    longitude = fix.longitude,
                    latitude = fix.latitude,
                    altitude = ?fix.altitude,
                    speed = ?fix.speed,
                    "File updated"
                );
            }
            Err(e) => {
                error!("Failed to write to {}: {}", self.path.display(), e);
                self.file = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn updater(dir: &TempDir) -> KmlUpdater {
        KmlUpdater::new(dir.path().join("position.kml"))
    }

    #[test]
    fn test_same_fix_writes_once() {
        let dir = TempDir::new().unwrap();
        let mut sink = updater(&dir);
        let fix = Fix::new(11.5, 48.1).with_altitude(Some(520.0));

        sink.on_fix(&fix);
        sink.on_fix(&fix);

        assert_eq!(sink.writes(), 1);
        let contents = std::fs::read_to_string(sink.path()).unwrap();
        assert!(contents.contains("<coordinates>11.500000,48.100000,520.000000</coordinates>"));
    }

    #[test]
    fn test_unknown_altitude_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let mut sink = updater(&dir);

        sink.on_fix(&Fix::new(11.5, 48.1).with_altitude(Some(520.0)));
        sink.on_fix(&Fix::new(11.6, 48.2));

        assert_eq!(sink.writes(), 2);
        assert_eq!(sink.placemark().altitude, 520.0);
        assert_eq!(sink.placemark().longitude, 11.6);
    }

    #[test]
    fn test_speed_change_triggers_write() {
        let dir = TempDir::new().unwrap();
        let mut sink = updater(&dir);

        sink.on_fix(&Fix::new(11.5, 48.1).with_speed(Some(1.0)));
        sink.on_fix(&Fix::new(11.5, 48.1).with_speed(Some(2.0)));
        sink.on_fix(&Fix::new(11.5, 48.1));

        assert_eq!(sink.writes(), 2);
        assert_eq!(sink.placemark().speed, Some(2.0));
    }

    #[test]
    fn test_file_is_rewritten_in_place() {
        let dir = TempDir::new().unwrap();
        let mut sink = KmlUpdater::with_placemark(
            dir.path().join("position.kml"),
            Placemark {
                description: "a much longer description than the one that follows".to_string(),
                ..Placemark::default()
            },
        );
        sink.on_fix(&Fix::new(1.0, 2.0));
        let long = std::fs::read_to_string(sink.path()).unwrap();

        sink.persisted.description.clear();
        sink.on_fix(&Fix::new(3.0, 4.0));
        let short = std::fs::read_to_string(sink.path()).unwrap();

        assert!(short.len() < long.len());
        assert!(short.ends_with("</kml>"));
        assert!(short.contains("<longitude>3.000000</longitude>"));
    }

    #[test]
    fn test_failed_write_is_retried() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("missing").join("position.kml");
        let mut sink = KmlUpdater::new(&output);
        let fix = Fix::new(11.5, 48.1);

        sink.on_fix(&fix);
        assert_eq!(sink.writes(), 0);
        assert_eq!(sink.placemark(), &Placemark::default());

        std::fs::create_dir(dir.path().join("missing")).unwrap();
        sink.on_fix(&fix);
        assert_eq!(sink.writes(), 1);
        assert!(output.exists());
    }

    #[test]
    fn test_from_settings() {
        let dir = TempDir::new().unwrap();
        let settings = SinkSettings {
            output: dir.path().join("car.kml"),
            name: "Car".to_string(),
            description: "Live".to_string(),
            range: 800.0,
            tilt: 30.0,
            heading: 0.0,
        };
        let mut sink = KmlUpdater::from_settings(&settings);
        sink.on_fix(&Fix::new(1.0, 2.0));

        let contents = std::fs::read_to_string(&settings.output).unwrap();
        assert!(contents.contains("<name>Car</name>"));
        assert!(contents.contains("<range>800.000000</range>"));
    }
}
