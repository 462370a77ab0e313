//! Line-delimited links between nodes.
//!
//! A [`Transport`] is the byte-level duplex channel a handler owns. All
//! implementations are poll-based: [`Transport::try_read_line`] returns
//! `Ok(None)` immediately when no complete line is buffered, and never waits.
//!
//! Submodules:
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based framing with a line limit.
//! - `stream`: non-blocking framing over any [`Read`](std::io::Read) + [`Write`](std::io::Write) stream.
//! - `serial`: tty devices (wired UART bridge, radio module UART).
//! - `tcp`: UART bridges reachable over TCP.
//! - `memory`: in-process duplex pair.

pub mod codec;
pub mod memory;
pub mod serial;
pub mod stream;
pub mod tcp;

use crate::config::LinkConfig;
use crate::Result;

pub use codec::{LineCodec, DEFAULT_MAX_LINE_BYTES};
pub use memory::MemoryTransport;
pub use serial::SerialTransport;
pub use stream::StreamTransport;
pub use tcp::TcpTransport;

/// Byte-oriented, line-delimited duplex channel.
pub trait Transport {
    /// Open the link with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for unusable parameters and
    /// `AppError::Transport` when the device or peer cannot be reached.
    fn open(&mut self, link: &LinkConfig) -> Result<()>;

    /// Write `line` followed by `\n`. No delivery acknowledgement exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the bytes cannot be handed to the link.
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Return the next complete line without its terminator, or `Ok(None)`
    /// when nothing complete is buffered yet.
    ///
    /// # Errors
    ///
    /// - `AppError::Envelope(MalformedWire)` when an inbound line exceeds the
    ///   configured limit; the line is discarded and polling may continue.
    /// - `AppError::Transport` when the link failed or was closed by the peer.
    fn try_read_line(&mut self) -> Result<Option<String>>;

    /// Release the link.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if releasing the device fails.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, link: &LinkConfig) -> Result<()> {
        (**self).open(link)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        (**self).write_line(line)
    }

    fn try_read_line(&mut self) -> Result<Option<String>> {
        (**self).try_read_line()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
