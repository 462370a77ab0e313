//! Non-blocking line framing over a byte stream.
//!
//! [`StreamTransport`] drives a [`LineCodec`] over any [`Read`] + [`Write`]
//! stream. The stream is expected to be in non-blocking mode: a read that
//! would block ends the poll with `Ok(None)`.

use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::config::LinkConfig;
use crate::transport::codec::LineCodec;
use crate::transport::Transport;
use crate::{AppError, Result};

/// Bytes pulled from the stream per read call.
const READ_CHUNK_BYTES: usize = 256;

/// Consecutive `WouldBlock` results tolerated while flushing one line.
const WRITE_RETRY_LIMIT: u32 = 10_000;

/// Line framing over a non-blocking byte stream.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    codec: LineCodec,
    read_buf: BytesMut,
    eof: bool,
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap `stream` with a `max_line_bytes` inbound limit.
    #[must_use]
    pub fn new(stream: S, max_line_bytes: usize) -> Self {
        Self {
            stream,
            codec: LineCodec::with_max_line_bytes(max_line_bytes),
            read_buf: BytesMut::with_capacity(READ_CHUNK_BYTES),
            eof: false,
        }
    }

    /// Shared access to the wrapped stream.
    #[must_use]
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Consume the transport, returning the wrapped stream.
    ///
    /// Buffered but undelivered bytes are lost.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Pull whatever the stream has ready into the read buffer.
    ///
    /// Stops at `WouldBlock`, at EOF, once a line terminator arrived, or once
    /// the buffer holds more than the line limit.
    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_BYTES];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!("stream transport: EOF detected");
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.read_buf.extend_from_slice(&chunk[..n]);
                    // Past the limit the codec rejects the line, so stop reading.
                    if chunk[..n].contains(&b'\n')
                        || self.read_buf.len() > self.codec.max_line_bytes()
                    {
                        return Ok(());
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(AppError::Transport(format!("read failed: {err}"))),
            }
        }
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    /// The stream is already connected; only the line limit is applied.
    fn open(&mut self, link: &LinkConfig) -> Result<()> {
        self.codec = LineCodec::with_max_line_bytes(link.max_line_bytes);
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut frame = BytesMut::with_capacity(line.len() + 1);
        self.codec.encode(line, &mut frame)?;

        let mut written = 0;
        let mut retries = 0;
        while written < frame.len() {
            match self.stream.write(&frame[written..]) {
                Ok(0) => return Err(AppError::Transport("write failed: link closed".into())),
                Ok(n) => {
                    written += n;
                    retries = 0;
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    retries += 1;
                    if retries > WRITE_RETRY_LIMIT {
                        return Err(AppError::Transport(
                            "write failed: link stayed busy".into(),
                        ));
                    }
                    std::thread::yield_now();
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(AppError::Transport(format!("write failed: {err}"))),
            }
        }

        self.stream
            .flush()
            .map_err(|err| AppError::Transport(format!("flush failed: {err}")))?;
        trace!(bytes = frame.len(), "stream transport: line written");
        Ok(())
    }

    fn try_read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.codec.decode(&mut self.read_buf)? {
            return Ok(Some(line));
        }

        if !self.eof {
            self.fill()?;
            if let Some(line) = self.codec.decode(&mut self.read_buf)? {
                return Ok(Some(line));
            }
        }

        if self.eof {
            // A final unterminated line is still delivered before reporting closure.
            if let Some(line) = self.codec.decode_eof(&mut self.read_buf)? {
                return Ok(Some(line));
            }
            return Err(AppError::Transport("link closed".into()));
        }

        Ok(None)
    }
}
