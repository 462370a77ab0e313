#![forbid(unsafe_code)]

//! `bifrost` — versioned envelope protocol for serial-linked sensor nodes.
//!
//! Application code builds a [`Message`](envelope::Message), the
//! [`Codec`](envelope::Codec) stamps and encodes it into a one-line wire
//! record, and a [`Handler`](handler::Handler) writes it to its
//! [`Transport`](transport::Transport). On the way in, the handler polls a
//! raw line and [`decode`](envelope::decode) turns it into an
//! [`Envelope`](envelope::Envelope) or a typed
//! [`EnvelopeError`](errors::EnvelopeError).

pub mod clock;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod handler;
pub mod transport;

pub use config::NodeConfig;
pub use errors::{AppError, EnvelopeError, Result};
