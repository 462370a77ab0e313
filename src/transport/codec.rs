//! Line framing for envelope links.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so a
//! peer that never sends `\n` cannot make a node buffer without bound.
//! The codec is used synchronously over a [`BytesMut`]; no runtime is needed.

use std::io::ErrorKind;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::errors::EnvelopeError;
use crate::{AppError, Result};

/// Default maximum inbound line length: 1 KiB.
///
/// Envelopes on constrained nodes are built in fixed buffers of a few hundred
/// bytes; anything longer is not a record this protocol produces.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024;

/// Newline-delimited framing with a line limit.
///
/// # Decoder
///
/// Returns `Ok(None)` while no complete line is buffered. A `\r\n` ending
/// is accepted and stripped. Lines longer than the limit return
/// [`AppError::Envelope`]`(MalformedWire("line too long: …"))`; the rest of
/// that line is discarded and the next line decodes normally. A line that is
/// not valid UTF-8 is consumed and reported as `MalformedWire` as well.
///
/// # Encoder
///
/// Outbound strings are encoded as `item\n`. The limit only applies to
/// decoding.
#[derive(Debug)]
pub struct LineCodec {
    inner: LinesCodec,
    max_line_bytes: usize,
}

impl LineCodec {
    /// Create a codec with the [`DEFAULT_MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }

    /// Create a codec with a custom line limit.
    #[must_use]
    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_line_bytes),
            max_line_bytes,
        }
    }

    /// Longest inbound line accepted, terminator excluded.
    #[must_use]
    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    fn map_error(&self, err: LinesCodecError) -> AppError {
        match err {
            LinesCodecError::MaxLineLengthExceeded => {
                AppError::Envelope(EnvelopeError::MalformedWire(format!(
                    "line too long: exceeded {} bytes",
                    self.max_line_bytes
                )))
            }
            // LinesCodec consumes a line that fails UTF-8 decoding before reporting it.
            LinesCodecError::Io(io_err) if io_err.kind() == ErrorKind::InvalidData => {
                AppError::Envelope(EnvelopeError::MalformedWire(
                    "line is not valid UTF-8".into(),
                ))
            }
            LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.inner.decode(src).map_err(|err| self.map_error(err))
    }

    /// Yield a trailing unterminated line once the link reached EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.inner.decode_eof(src).map_err(|err| self.map_error(err))
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = AppError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<()> {
        self.inner
            .encode(item, dst)
            .map_err(|err| self.map_error(err))
    }
}
