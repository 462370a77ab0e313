//! In-process duplex link.
//!
//! [`MemoryTransport::pair`] returns two connected endpoints: lines written
//! on one are read from the other. Reads on an empty queue behave like a
//! non-blocking device with nothing buffered.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use crate::config::LinkConfig;
use crate::transport::stream::StreamTransport;
use crate::transport::{Transport, DEFAULT_MAX_LINE_BYTES};
use crate::Result;

type Queue = Arc<Mutex<VecDeque<u8>>>;

/// One side of an in-memory byte pipe.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    inbound: Queue,
    outbound: Queue,
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut queue = self
            .inbound
            .lock()
            .map_err(|_| io::Error::other("memory link lock poisoned"))?;
        if queue.is_empty() {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        let n = buf.len().min(queue.len());
        for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut queue = self
            .outbound
            .lock()
            .map_err(|_| io::Error::other("memory link lock poisoned"))?;
        queue.extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-process transport endpoint.
#[derive(Debug)]
pub struct MemoryTransport {
    inner: StreamTransport<MemoryStream>,
}

impl MemoryTransport {
    /// Create two connected endpoints.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let a_to_b: Queue = Arc::default();
        let b_to_a: Queue = Arc::default();
        let a = MemoryStream {
            inbound: Arc::clone(&b_to_a),
            outbound: Arc::clone(&a_to_b),
        };
        let b = MemoryStream {
            inbound: a_to_b,
            outbound: b_to_a,
        };
        (Self::from_stream(a), Self::from_stream(b))
    }

    fn from_stream(stream: MemoryStream) -> Self {
        Self {
            inner: StreamTransport::new(stream, DEFAULT_MAX_LINE_BYTES),
        }
    }

    /// Push raw bytes toward this endpoint's reader, bypassing framing.
    ///
    /// Lets tests deliver partial lines or garbage exactly as a noisy wire would.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue lock is poisoned, like the stream's
    /// `Read` and `Write` impls.
    pub fn inject(&self, bytes: &[u8]) -> io::Result<()> {
        let mut queue = self
            .inner
            .get_ref()
            .inbound
            .lock()
            .map_err(|_| io::Error::other("memory link lock poisoned"))?;
        queue.extend(bytes);
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, link: &LinkConfig) -> Result<()> {
        self.inner.open(link)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.inner.write_line(line)
    }

    fn try_read_line(&mut self) -> Result<Option<String>> {
        self.inner.try_read_line()
    }
}
