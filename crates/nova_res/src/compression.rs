//! Payload compression handling.
//!
//! Resources are either stored as-is or packed with an LZ77 variant. The packed stream is a series
//! of 16-bit little-endian control words. Each control word describes up to sixteen steps, most
//! significant bit first:
//!
//! - a `1` bit starts a literal run: every consecutive `1` bit copies one input byte to the output
//! - a `0` bit reads a 16-bit code; `0` ends the stream, anything else is a back-reference of
//!   `3 + (code >> 10)` bytes located `1 + (code & 0x3FF)` bytes behind the current output position
//!
//! Back-references may overlap the bytes they produce, which is how runs of a repeated byte are
//! encoded.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use miette::Diagnostic;
use thiserror::Error;
use tracing::{instrument, trace};

use crate::error::Error;

/// Identifies the storage format used for a resource payload
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    Stored = 0,

    /// Run-length encoding, documented by the format but never used
    RunLength = 1,

    /// The LZ77 variant decoded by [`decompress`]
    Lzss = 2,
}

impl CompressionMethod {
    /// Returns true if this library can decode payloads using this method
    pub fn is_supported(&self) -> bool {
        matches!(self, CompressionMethod::Stored | CompressionMethod::Lzss)
    }
}

impl TryFrom<u8> for CompressionMethod {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompressionMethod::Stored),
            1 => Ok(CompressionMethod::RunLength),
            2 => Ok(CompressionMethod::Lzss),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMethod::Stored => write!(f, "stored"),
            CompressionMethod::RunLength => write!(f, "rle"),
            CompressionMethod::Lzss => write!(f, "lzss"),
        }
    }
}

/// Errors raised by [`decompress`]
///
/// Positions are relative to the start of the compressed input. [`DecodeError::at`] attaches the
/// resource they belong to.
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// input ended before the end marker
    #[error("compressed stream ends at {position} before its end marker")]
    TruncatedStream {
        /// Input position where a read failed
        position: u64,
    },

    /// output length differs from the declared length
    #[error("expected {expected} bytes of output, got {actual}")]
    SizeMismatch {
        /// Input position where the mismatch was detected
        position: u64,
        /// Declared output length
        expected: usize,
        /// Output length produced, or that would have been produced
        actual: usize,
    },

    /// a back-reference points before the start of the output
    #[error("back-reference at {position} reaches {distance} bytes back with only {available} available")]
    InvalidBackReference {
        /// Input position of the offending code
        position: u64,
        /// Distance encoded in the code
        distance: usize,
        /// Output produced so far
        available: usize,
    },
}

impl DecodeError {
    /// Converts into a crate [`Error`] for the resource `name` whose payload starts at
    /// `data_start` in the archive.
    pub fn at(self, name: impl Into<String>, data_start: u64) -> Error {
        let name = name.into();
        match self {
            DecodeError::TruncatedStream { position } => Error::TruncatedStream {
                name,
                offset: data_start + position,
            },
            DecodeError::SizeMismatch {
                position,
                expected,
                actual,
            } => Error::SizeMismatch {
                name,
                offset: data_start + position,
                expected: expected as u64,
                actual: actual as u64,
            },
            DecodeError::InvalidBackReference {
                position,
                distance,
                available,
            } => Error::InvalidBackReference {
                name,
                offset: data_start + position,
                distance,
                position: available,
            },
        }
    }
}

/// Decompresses `input` into exactly `expected_len` bytes.
///
/// Decoding stops at the end marker; nothing after it is read.
///
/// ```
/// use nova_res::compression::decompress;
///
/// // one literal 'A', then a back-reference repeating it five times, then the end marker
/// let input = [0x00, 0x80, b'A', 0x00, 0x08, 0x00, 0x00];
/// assert_eq!(decompress(&input, 6).unwrap(), b"AAAAAA");
/// ```
#[instrument(skip(input), fields(input_len = input.len()), err)]
pub fn decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError> {
    LzssDecoder::new(input, expected_len).run()
}

struct LzssDecoder<'a> {
    input: Cursor<&'a [u8]>,
    output: Vec<u8>,
    expected_len: usize,
}

impl<'a> LzssDecoder<'a> {
    fn new(input: &'a [u8], expected_len: usize) -> Self {
        Self {
            input: Cursor::new(input),
            // a two byte code expands to at most 66 bytes
            output: Vec::with_capacity(expected_len.min(input.len().saturating_mul(33))),
            expected_len,
        }
    }

    fn run(mut self) -> Result<Vec<u8>, DecodeError> {
        let mut control = 0u16;
        let mut remaining = 0u32;

        loop {
            if remaining == 0 {
                control = self.read_word()?;
                remaining = 16;
                trace!("control word {control:016b}");
            }

            let consumed = if control & 0x8000 == 0 {
                let position = self.input.position();
                let code = self.read_word()?;
                if code == 0 {
                    return self.finish(position);
                }
                self.copy_back_reference(code, position)?;
                1
            } else {
                let run = control.leading_ones().min(remaining);
                self.copy_literals(run as usize)?;
                run
            };

            control = control.checked_shl(consumed).unwrap_or(0);
            remaining -= consumed;
        }
    }

    fn read_word(&mut self) -> Result<u16, DecodeError> {
        let position = self.input.position();
        self.input
            .read_u16::<LittleEndian>()
            .map_err(|_| DecodeError::TruncatedStream { position })
    }

    fn finish(self, position: u64) -> Result<Vec<u8>, DecodeError> {
        if self.output.len() != self.expected_len {
            return Err(DecodeError::SizeMismatch {
                position,
                expected: self.expected_len,
                actual: self.output.len(),
            });
        }
        Ok(self.output)
    }

    fn reserve(&self, len: usize, position: u64) -> Result<(), DecodeError> {
        let actual = self.output.len() + len;
        if actual > self.expected_len {
            return Err(DecodeError::SizeMismatch {
                position,
                expected: self.expected_len,
                actual,
            });
        }
        Ok(())
    }

    fn copy_literals(&mut self, len: usize) -> Result<(), DecodeError> {
        let position = self.input.position();
        self.reserve(len, position)?;

        let input_len = self.input.get_ref().len() as u64;
        let start = self.output.len();
        self.output.resize(start + len, 0);
        self.input
            .read_exact(&mut self.output[start..])
            .map_err(|_| DecodeError::TruncatedStream {
                position: input_len,
            })
    }

    /// Copies `offset`-sized tiles of earlier output so that overlapping references repeat.
    fn copy_back_reference(&mut self, code: u16, position: u64) -> Result<(), DecodeError> {
        let length = 3 + (code >> 10) as usize;
        let offset = 1 + (code & 0x3FF) as usize;

        let available = self.output.len();
        if offset > available {
            return Err(DecodeError::InvalidBackReference {
                position,
                distance: offset,
                available,
            });
        }
        self.reserve(length, position)?;

        let start = available - offset;
        let mut left = length;
        while left > 0 {
            let tile = left.min(offset);
            self.output.extend_from_within(start..start + tile);
            left -= tile;
        }

        Ok(())
    }
}
