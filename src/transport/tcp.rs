//! UART bridges reachable over TCP.
//!
//! Serial servers (ser2net and similar) expose a node's UART as a raw TCP
//! byte stream. The socket is switched to non-blocking mode after connecting
//! so polling never waits.

use std::net::TcpStream;

use tracing::info;

use crate::config::LinkConfig;
use crate::transport::stream::StreamTransport;
use crate::transport::Transport;
use crate::{AppError, Result};

/// TCP-attached line transport.
#[derive(Debug, Default)]
pub struct TcpTransport {
    inner: Option<StreamTransport<TcpStream>>,
}

impl TcpTransport {
    /// Create an unconnected transport; [`Transport::open`] connects it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already connected stream.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the socket cannot be made non-blocking.
    pub fn from_stream(stream: TcpStream, max_line_bytes: usize) -> Result<Self> {
        configure(&stream)?;
        Ok(Self {
            inner: Some(StreamTransport::new(stream, max_line_bytes)),
        })
    }

    fn connected(&mut self) -> Result<&mut StreamTransport<TcpStream>> {
        self.inner
            .as_mut()
            .ok_or_else(|| AppError::InvalidState("tcp link is not open".into()))
    }
}

fn configure(stream: &TcpStream) -> Result<()> {
    stream
        .set_nonblocking(true)
        .map_err(|err| AppError::Transport(format!("cannot set non-blocking mode: {err}")))?;
    stream
        .set_nodelay(true)
        .map_err(|err| AppError::Transport(format!("cannot disable nagle: {err}")))
}

impl Transport for TcpTransport {
    fn open(&mut self, link: &LinkConfig) -> Result<()> {
        if let Some(inner) = self.inner.as_mut() {
            return inner.open(link);
        }

        let address = link
            .address
            .as_deref()
            .ok_or_else(|| AppError::Config("tcp link requires `address`".into()))?;
        let stream = TcpStream::connect(address)
            .map_err(|err| AppError::Transport(format!("cannot connect to {address}: {err}")))?;
        configure(&stream)?;
        info!(address, "tcp link connected");

        self.inner = Some(StreamTransport::new(stream, link.max_line_bytes));
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.connected()?.write_line(line)
    }

    fn try_read_line(&mut self) -> Result<Option<String>> {
        self.connected()?.try_read_line()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(inner) = self.inner.take() {
            // The peer may already be gone; a failed shutdown leaves nothing to release.
            let _ = inner.into_inner().shutdown(std::net::Shutdown::Both);
        }
        Ok(())
    }
}
