// src/gps/nmea.rs
//! NMEA 0183 sentence parsing
//!
//! A sentence looks like `$GPRMC,123519,A,...,W,A*07\r\n`: a two character
//! talker id, a three character message id, comma separated fields, an
//! optional XOR checksum and a line terminator.

use super::messages::{registry, MessageRegistry, NmeaMessage};
use std::fmt;
use tracing::trace;

/// Errors produced while decoding a single sentence
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The line does not follow the sentence grammar
    Malformed(String),
    /// Wrong number of fields for the message kind
    Arity {
        message: String,
        expected: usize,
        found: usize,
    },
    /// A required field could not be converted
    InvalidField {
        message: String,
        field: String,
        value: String,
    },
    /// The transmitted checksum does not match the payload
    ChecksumMismatch { expected: u32, calculated: u8 },
}

impl ParseError {
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, ParseError::ChecksumMismatch { .. })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Malformed(reason) => write!(f, "malformed line: {}", reason),
            ParseError::Arity {
                message,
                expected,
                found,
            } => write!(
                f,
                "{} expects {} fields, found {}",
                message, expected, found
            ),
            ParseError::InvalidField {
                message,
                field,
                value,
            } => write!(f, "{} has invalid {}: {:?}", message, field, value),
            ParseError::ChecksumMismatch {
                expected,
                calculated,
            } => write!(
                f,
                "checksum mismatch: expected {:02X}, calculated {:02X}",
                expected, calculated
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// The pieces of a sentence that passed the grammar check
#[derive(Debug, PartialEq)]
struct Sentence<'a> {
    talker: &'a str,
    message: &'a str,
    /// Everything between `$` and `*`, used for the checksum
    payload: &'a str,
    fields: &'a str,
    checksum: Option<&'a str>,
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn malformed(reason: &str) -> ParseError {
    ParseError::Malformed(reason.to_string())
}

/// Split a line into its parts, rejecting anything that does not match
/// `$TTMMM,fields[*hh]` followed by at least one CR or LF.
fn split_sentence(line: &str) -> Result<Sentence<'_>, ParseError> {
    let bytes = line.as_bytes();

    if bytes.first() != Some(&b'$') {
        return Err(malformed("missing '$'"));
    }
    if bytes.len() < 7 || !bytes[1..6].iter().all(|&b| is_word(b)) || bytes[6] != b',' {
        return Err(malformed("bad address field"));
    }

    let body_end = bytes
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .ok_or_else(|| malformed("missing line terminator"))?;
    if !bytes[body_end..].iter().all(|&b| b == b'\r' || b == b'\n') {
        return Err(malformed("data after line terminator"));
    }

    let body = &line[1..body_end];
    let (payload, checksum) = match body.split_once('*') {
        Some((payload, checksum)) => {
            if checksum.is_empty() || !checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(malformed("bad checksum field"));
            }
            (payload, Some(checksum))
        }
        None => (body, None),
    };

    let fields = &payload[6..];
    if fields.is_empty() {
        return Err(malformed("no fields"));
    }

    Ok(Sentence {
        talker: &payload[0..2],
        message: &payload[2..5],
        payload,
        fields,
        checksum,
    })
}

/// XOR of every byte between `$` and `*`
pub fn calculate_checksum(payload: &str) -> u8 {
    payload.bytes().fold(0, |acc, b| acc ^ b)
}

/// Sentence parser
#[derive(Debug, Clone)]
pub struct NmeaParser {
    checksum: bool,
    registry: &'static MessageRegistry,
}

impl Default for NmeaParser {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NmeaParser {
    /// Create a parser; `checksum = false` skips verification for transports
    /// that strip or mangle checksums.
    pub fn new(checksum: bool) -> Self {
        Self {
            checksum,
            registry: registry(),
        }
    }

    /// Parse one line, terminator included.
    ///
    /// Returns `Ok(None)` for well formed sentences whose message id is not
    /// registered.
    pub fn parse(&self, line: &str) -> Result<Option<NmeaMessage>, ParseError> {
        let sentence = split_sentence(line)?;

        if self.checksum {
            if let Some(hex) = sentence.checksum {
                let expected = u32::from_str_radix(hex, 16)
                    .map_err(|_| malformed("checksum out of range"))?;
                let calculated = calculate_checksum(sentence.payload);
                if expected != u32::from(calculated) {
                    return Err(ParseError::ChecksumMismatch {
                        expected,
                        calculated,
                    });
                }
            }
        }

        let fields: Vec<&str> = sentence.fields.split(',').collect();
        trace!(
            talker = sentence.talker,
            message = sentence.message,
            ?fields,
            "split sentence"
        );

        self.registry
            .construct(sentence.message, sentence.talker, &fields)
    }
}
