// src/lib.rs
//! GPS Update Library
//!
//! Streams fixes from gpsd or a raw NMEA receiver and keeps a Google Earth
//! KML placemark pointed at the latest position.

pub mod config;
pub mod error;
pub mod gps;
pub mod kml;
pub mod logging;
pub mod monitor;
pub mod sink;
pub mod source;

// Re-export main types for convenience
pub use error::{GpsError, Result};
pub use gps::{Fix, NmeaMessage, NmeaParser, ParseError};
pub use monitor::{GpsSource, PositionUpdater};
pub use sink::{FixSink, KmlUpdater};
pub use source::PositionSource;
