// src/gps/data.rs
//! GPS data structures shared by the parser, the sources and the sink

/// Knots to metres per second
pub const KNOTS_TO_MPS: f64 = 0.514_444;

/// A single position reading as produced by a position source.
///
/// Coordinates are decimal degrees, altitude is metres and speed is metres
/// per second. Unknown values are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
}

impl Fix {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude: None,
            speed: None,
        }
    }

    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_speed(mut self, speed: Option<f64>) -> Self {
        self.speed = speed;
        self
    }

    /// Build a fix from a daemon report where NaN marks unknown values
    pub fn from_reported(longitude: f64, latitude: f64, altitude: f64, speed: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude: not_nan(altitude),
            speed: not_nan(speed),
        }
    }
}

fn not_nan(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// One satellite entry from a GSV sentence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Satellite {
    pub prn: Option<u16>,        // Satellite PRN/ID number
    pub elevation: Option<f32>,  // Elevation angle in degrees
    pub azimuth: Option<f32>,    // Azimuth angle in degrees
    pub snr: Option<f32>,        // Signal-to-noise ratio in dB
}

impl Satellite {
    /// Build a satellite from the four raw GSV fields; empty or garbled
    /// fields become `None`.
    pub fn from_fields(prn: &str, elevation: &str, azimuth: &str, snr: &str) -> Self {
        Self {
            prn: prn.trim().parse().ok(),
            elevation: elevation.trim().parse().ok(),
            azimuth: azimuth.trim().parse().ok(),
            snr: snr.trim().parse().ok(),
        }
    }

    pub fn constellation(&self) -> &'static str {
        match self.prn {
            Some(1..=32) => "GPS",
            Some(33..=64) => "SBAS",
            Some(65..=96) => "GLONASS",
            Some(120..=163) => "BEIDOU",
            Some(193..=197) => "QZSS",
            Some(211..=246) => "GALILEO",
            _ => "UNKNOWN",
        }
    }
}

/// Convert an NMEA `[d]ddmm.mmmm` coordinate into decimal degrees, keeping the sign
pub fn nmea_to_degrees(value: f64) -> f64 {
    let magnitude = value.abs();
    let degrees = (magnitude / 100.0).trunc();
    let minutes = magnitude - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    if value.is_sign_negative() {
        -decimal
    } else {
        decimal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_becomes_unknown() {
        let fix = Fix::from_reported(11.5, 48.1, f64::NAN, 3.0);
        assert_eq!(fix.altitude, None);
        assert_eq!(fix.speed, Some(3.0));
    }

    #[test]
    fn test_zero_is_not_unknown() {
        let fix = Fix::from_reported(11.5, 48.1, 0.0, f64::NAN);
        assert_eq!(fix.altitude, Some(0.0));
        assert_eq!(fix.speed, None);
    }

    #[test]
    fn test_nmea_to_degrees() {
        assert!((nmea_to_degrees(4807.038) - 48.1173).abs() < 1e-4);
        assert!((nmea_to_degrees(-1131.000) + 11.516_666).abs() < 1e-4);
        assert_eq!(nmea_to_degrees(0.0), 0.0);
    }

    #[test]
    fn test_satellite_from_fields() {
        let sat = Satellite::from_fields("03", "03", "111", "");
        assert_eq!(sat.prn, Some(3));
        assert_eq!(sat.elevation, Some(3.0));
        assert_eq!(sat.azimuth, Some(111.0));
        assert_eq!(sat.snr, None);
        assert_eq!(sat.constellation(), "GPS");
    }
}
