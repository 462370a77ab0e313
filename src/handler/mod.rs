//! Transport handlers: the API node code uses to exchange envelopes.
//!
//! The [`Handler`] trait is the capability interface every link technology
//! implements. A handler owns exactly one [`Transport`] and moves through a
//! three-state lifecycle:
//!
//! ```text
//! Uninitialized ──begin──▶ Ready ──close──▶ Closed
//! ```
//!
//! Handlers are transport-focused: [`Handler::receive`] returns the raw line
//! and leaves decoding to the caller. [`poll_envelope`] combines one receive
//! with a strict decode for callers that only want valid envelopes.
//!
//! Submodules:
//! - `bridge`: full handler for wired bridges (tty, TCP, in-memory).
//! - `radio`: handler for radio modules; sending is not implemented yet.

pub mod bridge;
pub mod radio;

use tracing::debug;

use crate::clock::Clock;
use crate::config::{LinkConfig, LinkKind, NodeConfig};
use crate::envelope::{self, Codec, Envelope, Message};
use crate::transport::{SerialTransport, TcpTransport, Transport};
use crate::{AppError, Result};

pub use bridge::BridgeHandler;
pub use radio::RadioHandler;

/// Handler lifecycle state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HandlerState {
    /// Constructed; the transport has not been opened.
    Uninitialized,
    /// Transport open; `send` and `receive` are allowed.
    Ready,
    /// Transport released; terminal.
    Closed,
}

/// A line to transmit: preformatted wire text or an envelope to encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Already-encoded wire line, sent verbatim.
    Line(String),
    /// Envelope re-encoded with its own version and timestamp.
    Envelope(Envelope),
}

impl Outbound {
    /// Produce the wire line, refusing anything that would break framing.
    ///
    /// # Errors
    ///
    /// - `AppError::Envelope(UnsupportedVersion)` for an envelope whose
    ///   version has no wire format.
    /// - `AppError::Transport` for a line containing a raw line terminator.
    pub fn into_line(self) -> Result<String> {
        let line = match self {
            Self::Line(line) => line,
            Self::Envelope(envelope) => envelope::encode_envelope(&envelope)?,
        };
        if line.contains(|c: char| c == '\n' || c == '\r') {
            return Err(AppError::Transport(
                "outbound line contains a line terminator".into(),
            ));
        }
        Ok(line)
    }
}

impl From<String> for Outbound {
    fn from(line: String) -> Self {
        Self::Line(line)
    }
}

impl From<&str> for Outbound {
    fn from(line: &str) -> Self {
        Self::Line(line.to_owned())
    }
}

impl From<Envelope> for Outbound {
    fn from(envelope: Envelope) -> Self {
        Self::Envelope(envelope)
    }
}

/// Line counters kept per handler.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct LinkStats {
    /// Lines handed to the transport.
    pub lines_sent: u64,
    /// Lines read from the transport.
    pub lines_received: u64,
}

/// Capability interface shared by every link technology.
pub trait Handler {
    /// Open the transport. Allowed once, from [`HandlerState::Uninitialized`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` when called in any other state, or
    /// the transport's error if the link cannot be opened (the handler then
    /// stays uninitialized).
    fn begin(&mut self) -> Result<()>;

    /// Transmit one line. `Ok` means the transport accepted the bytes; there
    /// is no delivery acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` unless ready, `AppError::Envelope` if
    /// the message cannot be encoded (nothing is transmitted), or the
    /// transport's write error.
    fn send(&mut self, message: Outbound) -> Result<()>;

    /// Non-blocking poll for the next raw line.
    ///
    /// Returns `Ok(None)` immediately when nothing complete is buffered.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` unless ready, or the transport's read
    /// error (see [`Transport::try_read_line`]).
    fn receive(&mut self) -> Result<Option<String>>;

    /// Identifier this node uses on the link.
    fn node_id(&self) -> &str;

    /// Change the identifier this node uses on the link.
    fn set_node_id(&mut self, node_id: &str);

    /// Release the transport. Idempotent once closed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if the handler never began, or the
    /// transport's close error.
    fn close(&mut self) -> Result<()>;

    /// Current lifecycle state.
    fn state(&self) -> HandlerState;

    /// Line counters since construction.
    fn stats(&self) -> LinkStats;

    /// Encode `message` with `codec` and transmit it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Envelope(UnsupportedVersion)` without transmitting
    /// when the message version is not supported, otherwise as [`Handler::send`].
    fn send_message<C: Clock>(&mut self, codec: &Codec<C>, message: &Message) -> Result<()>
    where
        Self: Sized,
    {
        let line = codec.encode(message)?;
        self.send(Outbound::Line(line))
    }
}

/// Receive one line and strictly decode it.
///
/// Lines that fail validation, including over-long lines rejected by the
/// framing layer, are dropped and logged at `DEBUG`; the result is then
/// `Ok(None)`, the same as when nothing was available.
///
/// # Errors
///
/// Returns lifecycle and transport failures from [`Handler::receive`].
pub fn poll_envelope(handler: &mut dyn Handler) -> Result<Option<Envelope>> {
    let line = match handler.receive() {
        Ok(Some(line)) => line,
        Ok(None) => return Ok(None),
        Err(AppError::Envelope(err)) => {
            debug!(node_id = handler.node_id(), error = %err, "dropping unframeable line");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    match envelope::decode(&line) {
        Ok(envelope) => Ok(Some(envelope)),
        Err(err) => {
            debug!(
                node_id = handler.node_id(),
                error = %err,
                raw_line = %line,
                "dropping invalid envelope"
            );
            Ok(None)
        }
    }
}

/// Build the handler matching `config.link.kind`.
///
/// # Errors
///
/// Returns `AppError::Config` if the link settings are invalid.
pub fn build_handler(config: &NodeConfig) -> Result<Box<dyn Handler>> {
    config.link.validate()?;
    let link = config.link.clone();
    let handler: Box<dyn Handler> = match link.kind {
        LinkKind::Serial => Box::new(BridgeHandler::new(
            config.node_id.clone(),
            SerialTransport::new(),
            link,
        )),
        LinkKind::Tcp => Box::new(BridgeHandler::new(
            config.node_id.clone(),
            TcpTransport::new(),
            link,
        )),
        LinkKind::Radio => Box::new(RadioHandler::new(
            config.node_id.clone(),
            SerialTransport::new(),
            link,
        )),
    };
    Ok(handler)
}

/// State and transport shared by the concrete handlers.
#[derive(Debug)]
struct LinkCore<T> {
    node_id: String,
    transport: T,
    link: LinkConfig,
    state: HandlerState,
    stats: LinkStats,
}

impl<T: Transport> LinkCore<T> {
    fn new(node_id: String, transport: T, link: LinkConfig) -> Self {
        Self {
            node_id,
            transport,
            link,
            state: HandlerState::Uninitialized,
            stats: LinkStats::default(),
        }
    }

    fn begin(&mut self) -> Result<()> {
        match self.state {
            HandlerState::Uninitialized => {}
            HandlerState::Ready => {
                return Err(AppError::InvalidState("begin called twice".into()));
            }
            HandlerState::Closed => {
                return Err(AppError::InvalidState("handler is closed".into()));
            }
        }
        self.transport.open(&self.link)?;
        self.state = HandlerState::Ready;
        debug!(
            node_id = self.node_id.as_str(),
            link = self.link.kind.as_str(),
            "handler ready"
        );
        Ok(())
    }

    fn ensure_ready(&self, operation: &str) -> Result<()> {
        match self.state {
            HandlerState::Ready => Ok(()),
            HandlerState::Uninitialized => Err(AppError::InvalidState(format!(
                "{operation} before begin"
            ))),
            HandlerState::Closed => Err(AppError::InvalidState(format!(
                "{operation} after close"
            ))),
        }
    }

    fn send(&mut self, message: Outbound) -> Result<()> {
        self.ensure_ready("send")?;
        let line = message.into_line()?;
        self.transport.write_line(&line)?;
        self.stats.lines_sent += 1;
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<String>> {
        self.ensure_ready("receive")?;
        let line = self.transport.try_read_line()?;
        if line.is_some() {
            self.stats.lines_received += 1;
        }
        Ok(line)
    }

    fn close(&mut self) -> Result<()> {
        match self.state {
            HandlerState::Uninitialized => {
                Err(AppError::InvalidState("close before begin".into()))
            }
            HandlerState::Closed => Ok(()),
            HandlerState::Ready => {
                self.state = HandlerState::Closed;
                self.transport.close()?;
                debug!(node_id = self.node_id.as_str(), "handler closed");
                Ok(())
            }
        }
    }
}
