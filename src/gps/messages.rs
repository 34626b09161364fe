// src/gps/messages.rs
//! Typed NMEA records and the registry that builds them from split fields

use super::data::{nmea_to_degrees, Satellite};
use super::nmea::ParseError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Builds a message from the talker id and the sentence fields
pub type Builder = fn(talker: &str, fields: &[&str]) -> Result<NmeaMessage, ParseError>;

/// A decoded sentence
#[derive(Debug, Clone, PartialEq)]
pub enum NmeaMessage {
    Rmc(RmcMessage),
    Gsv(GsvMessage),
    Aam(AamMessage),
}

impl NmeaMessage {
    pub fn talker(&self) -> &str {
        match self {
            NmeaMessage::Rmc(m) => &m.talker,
            NmeaMessage::Gsv(m) => &m.talker,
            NmeaMessage::Aam(m) => &m.talker,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            NmeaMessage::Rmc(m) => &m.message,
            NmeaMessage::Gsv(m) => &m.message,
            NmeaMessage::Aam(m) => &m.message,
        }
    }

    fn set_ids(&mut self, message: &str, talker: &str) {
        let (m, t) = match self {
            NmeaMessage::Rmc(r) => (&mut r.message, &mut r.talker),
            NmeaMessage::Gsv(g) => (&mut g.message, &mut g.talker),
            NmeaMessage::Aam(a) => (&mut a.message, &mut a.talker),
        };
        *m = message.to_string();
        *t = talker.to_string();
    }
}

/// RMC: Recommended minimum specific GNSS data
#[derive(Debug, Clone, PartialEq)]
pub struct RmcMessage {
    pub talker: String,
    pub message: String,
    pub time: String,
    pub status: String,
    /// Wire units (`ddmm.mmmm`), negated for the southern hemisphere
    pub latitude: f64,
    /// Wire units (`dddmm.mmmm`), negated for the western hemisphere
    pub longitude: f64,
    /// Knots
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub date: String,
    pub variation: Option<f64>,
    pub variation_direction: String,
    pub mode: Option<String>,
    /// RMC never carries altitude
    pub altitude: Option<f64>,
}

impl RmcMessage {
    pub const FIELDS: usize = 12;

    fn decode(talker: &str, fields: &[&str]) -> Result<NmeaMessage, ParseError> {
        // Receivers older than NMEA 2.3 omit the mode indicator
        let fields = check_arity("RMC", fields, Self::FIELDS - 1..=Self::FIELDS)?;

        let mut latitude: f64 = parse_required("RMC", "latitude", fields[2])?;
        let mut longitude: f64 = parse_required("RMC", "longitude", fields[4])?;

        if fields[3] == "S" {
            latitude = -latitude;
        }
        if fields[5] == "W" {
            longitude = -longitude;
        }

        Ok(NmeaMessage::Rmc(Self {
            talker: talker.to_string(),
            message: "RMC".to_string(),
            time: fields[0].to_string(),
            status: fields[1].to_string(),
            latitude,
            longitude,
            speed: fields[6].trim().parse().ok(),
            course: fields[7].trim().parse().ok(),
            date: fields[8].to_string(),
            variation: fields[9].trim().parse().ok(),
            variation_direction: fields[10].to_string(),
            mode: fields.get(11).filter(|m| !m.is_empty()).map(|m| m.to_string()),
            altitude: None,
        }))
    }

    /// Status `A` means the receiver considers the fix valid
    pub fn is_valid(&self) -> bool {
        self.status == "A"
    }

    /// Latitude and longitude in decimal degrees
    pub fn position_degrees(&self) -> (f64, f64) {
        (nmea_to_degrees(self.latitude), nmea_to_degrees(self.longitude))
    }

    /// UTC time of the fix from `hhmmss[.sss]` and `ddmmyy`
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(&self.date, "%d%m%y").ok()?;
        let time = NaiveTime::parse_from_str(&self.time, "%H%M%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(&self.time, "%H%M%S"))
            .ok()?;
        Some(date.and_time(time))
    }
}

/// GSV: Satellites in view
#[derive(Debug, Clone, PartialEq)]
pub struct GsvMessage {
    pub talker: String,
    pub message: String,
    pub count: u8,
    pub origin: Option<u8>,
    pub total: Option<u8>,
    pub satellites: Vec<Satellite>,
}

impl GsvMessage {
    pub const HEADER_FIELDS: usize = 3;

    fn decode(talker: &str, fields: &[&str]) -> Result<NmeaMessage, ParseError> {
        if fields.len() < Self::HEADER_FIELDS {
            return Err(ParseError::Arity {
                message: "GSV".to_string(),
                expected: Self::HEADER_FIELDS,
                found: fields.len(),
            });
        }

        let count = parse_required("GSV", "count", fields[0])?;

        // A dangling partial group is dropped by chunks_exact
        let satellites = fields[Self::HEADER_FIELDS..]
            .chunks_exact(4)
            .map(|group| Satellite::from_fields(group[0], group[1], group[2], group[3]))
            .collect();

        Ok(NmeaMessage::Gsv(Self {
            talker: talker.to_string(),
            message: "GSV".to_string(),
            count,
            origin: fields[1].trim().parse().ok(),
            total: fields[2].trim().parse().ok(),
            satellites,
        }))
    }
}

/// AAM: Waypoint arrival alarm
#[derive(Debug, Clone, PartialEq)]
pub struct AamMessage {
    pub talker: String,
    pub message: String,
    pub circle_entered: String,
    pub perpendicular_passed: String,
    pub radius: Option<f64>,
    pub radius_units: String,
    pub waypoint: String,
}

impl AamMessage {
    pub const FIELDS: usize = 5;

    fn decode(talker: &str, fields: &[&str]) -> Result<NmeaMessage, ParseError> {
        let fields = check_arity("AAM", fields, Self::FIELDS..=Self::FIELDS)?;

        Ok(NmeaMessage::Aam(Self {
            talker: talker.to_string(),
            message: "AAM".to_string(),
            circle_entered: fields[0].to_string(),
            perpendicular_passed: fields[1].to_string(),
            radius: fields[2].trim().parse().ok(),
            radius_units: fields[3].to_string(),
            waypoint: fields[4].to_string(),
        }))
    }
}

/// Validate a field count, tolerating one trailing empty field left by a
/// trailing comma. Returns the fields without that empty tail.
fn check_arity<'a, 'b>(
    message: &str,
    fields: &'a [&'b str],
    accepted: std::ops::RangeInclusive<usize>,
) -> Result<&'a [&'b str], ParseError> {
    let trimmed = match fields.split_last() {
        Some((last, rest)) if last.is_empty() && !accepted.contains(&fields.len()) => rest,
        _ => fields,
    };

    if accepted.contains(&trimmed.len()) {
        Ok(trimmed)
    } else {
        Err(ParseError::Arity {
            message: message.to_string(),
            expected: *accepted.end(),
            found: fields.len(),
        })
    }
}

fn parse_required<T: std::str::FromStr>(
    message: &str,
    field: &str,
    value: &str,
) -> Result<T, ParseError> {
    value.trim().parse().map_err(|_| ParseError::InvalidField {
        message: message.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Maps message ids to builders
#[derive(Debug, Clone, Default)]
pub struct MessageRegistry {
    builders: HashMap<String, Builder>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every message kind this crate decodes
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("RMC", RmcMessage::decode);
        registry.register("GSV", GsvMessage::decode);
        registry.register("AAM", AamMessage::decode);
        registry
    }

    /// Register a builder; a later registration for the same id replaces the earlier one
    pub fn register(&mut self, id: &str, builder: Builder) {
        self.builders.insert(id.to_string(), builder);
    }

    /// Build the message registered for `id`, or `Ok(None)` if nothing is registered
    pub fn construct(
        &self,
        id: &str,
        talker: &str,
        fields: &[&str],
    ) -> Result<Option<NmeaMessage>, ParseError> {
        let Some(builder) = self.builders.get(id) else {
            return Ok(None);
        };

        let mut message = builder(talker, fields)?;
        message.set_ids(id, talker);
        Ok(Some(message))
    }
}

/// The process-wide standard registry
pub fn registry() -> &'static MessageRegistry {
    static REGISTRY: OnceLock<MessageRegistry> = OnceLock::new();
    REGISTRY.get_or_init(MessageRegistry::standard)
}
