// src/gps/reassembler.rs
//! Splits a chunked byte stream into terminated lines

use tracing::debug;

/// Longest sentence NMEA 0183 allows, terminator included
pub const MAX_SENTENCE_LEN: usize = 82;

/// Carry-over beyond this many bytes is discarded
pub const MAX_PENDING: usize = 4 * MAX_SENTENCE_LEN;

/// Accumulates bytes and hands out complete lines.
///
/// A line ends at LF, at CRLF, or at a lone CR. A trailing CR is held back
/// until the next byte shows whether an LF follows, so for lines up to
/// `MAX_PENDING` bytes the result does not depend on how the stream was
/// chunked. An unterminated run longer than that is dropped.
#[derive(Debug, Default)]
pub struct LineReassembler {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no terminator
    scanned: usize,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line completed by it, terminators included
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut i = self.scanned;
        while i < self.buffer.len() {
            let end = match self.buffer[i] {
                b'\n' => Some(i + 1),
                b'\r' => match self.buffer.get(i + 1) {
                    Some(b'\n') => Some(i + 2),
                    Some(_) => Some(i + 1),
                    None => break,
                },
                _ => None,
            };

            match end {
                Some(end) => {
                    lines.push(self.buffer[start..end].to_vec());
                    start = end;
                    i = end;
                }
                None => i += 1,
            }
        }

        self.buffer.drain(..start);
        self.scanned = i - start;

        if self.buffer.len() > MAX_PENDING {
            debug!(
                "Discarding {} bytes without a line terminator",
                self.buffer.len()
            );
            self.clear();
        }
        lines
    }

    /// Bytes received after the last complete line
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}
