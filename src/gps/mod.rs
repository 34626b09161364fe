// src/gps/mod.rs
//! GPS data handling and parsing

pub mod data;
pub mod gpsd;
pub mod messages;
pub mod nmea;
pub mod reassembler;

pub use data::{Fix, Satellite};
pub use messages::{AamMessage, GsvMessage, MessageRegistry, NmeaMessage, RmcMessage};
pub use nmea::{NmeaParser, ParseError};
pub use reassembler::LineReassembler;
