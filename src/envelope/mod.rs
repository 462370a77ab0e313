//! Envelope data model.
//!
//! Every node on a bifrost link speaks one record shape: a versioned envelope
//! naming the sender, the receiver, a free-form message kind, the producer's
//! timestamp and an opaque payload.
//!
//! ```text
//! {"v":1,"src":"sensor1","dst":"hub","type":"state","ts":1042,"payload":23.5}
//! ```
//!
//! Submodules:
//! - `codec`: version table, encoding and the two decode strictness levels.

pub mod codec;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EnvelopeError;

pub use codec::{
    decode, encode_envelope, inspect, is_supported, is_valid_envelope, supported_versions, Codec,
    RawEnvelope, Strictness,
};

/// Protocol version written by default.
pub const CURRENT_VERSION: u32 = 1;

/// Message kind used when the caller does not pick one.
pub const DEFAULT_MESSAGE_TYPE: &str = "state";

/// Wire keys every envelope must carry, in encoder order.
pub const REQUIRED_FIELDS: [&str; 6] = ["v", "src", "dst", "type", "ts", "payload"];

/// A decoded envelope.
///
/// Constructed when a line is accepted by [`decode`] and handed to the caller;
/// nothing about it is retained by the codec or the handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version tag (`v` on the wire).
    #[serde(rename = "v")]
    pub version: u32,
    /// Sending node identifier.
    pub src: String,
    /// Receiving node identifier.
    pub dst: String,
    /// Application-defined message kind (`type` on the wire).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Producer clock value in milliseconds (`ts` on the wire).
    #[serde(rename = "ts")]
    pub timestamp: u64,
    /// Opaque application data; `null` is a valid payload.
    pub payload: Value,
}

/// An outgoing message that has not been stamped yet.
///
/// The two constructors are the two payload shapes a node produces: a scalar
/// reading ([`Message::new`]) or a structured document
/// ([`Message::structured`]). Both encode to the same envelope layout.
///
/// ```
/// use bifrost::envelope::Message;
///
/// let reading = Message::new("sensor1", "hub", 23.5);
/// assert_eq!(reading.msg_type(), "state");
/// assert_eq!(reading.version(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    src: String,
    dst: String,
    msg_type: String,
    version: u32,
    payload: Value,
}

impl Message {
    /// Build a message carrying a primitive payload (int, float, bool, string).
    #[must_use]
    pub fn new(src: impl Into<String>, dst: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            msg_type: DEFAULT_MESSAGE_TYPE.to_owned(),
            version: CURRENT_VERSION,
            payload: payload.into(),
        }
    }

    /// Build a message carrying a structured payload.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MalformedWire`] if `payload` cannot be
    /// represented as JSON (e.g. a map with non-string keys).
    pub fn structured<T>(
        src: impl Into<String>,
        dst: impl Into<String>,
        payload: &T,
    ) -> Result<Self, EnvelopeError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(payload)?;
        Ok(Self::new(src, dst, value))
    }

    /// Override the message kind (defaults to `"state"`).
    #[must_use]
    pub fn with_type(mut self, msg_type: impl Into<String>) -> Self {
        self.msg_type = msg_type.into();
        self
    }

    /// Override the protocol version (defaults to [`CURRENT_VERSION`]).
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sending node identifier.
    #[must_use]
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Receiving node identifier.
    #[must_use]
    pub fn dst(&self) -> &str {
        &self.dst
    }

    /// Message kind.
    #[must_use]
    pub fn msg_type(&self) -> &str {
        &self.msg_type
    }

    /// Protocol version the message will be encoded with.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Payload value.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Stamp the message with `timestamp`, producing the envelope it encodes to.
    #[must_use]
    pub fn into_envelope(self, timestamp: u64) -> Envelope {
        Envelope {
            version: self.version,
            src: self.src,
            dst: self.dst,
            msg_type: self.msg_type,
            timestamp,
            payload: self.payload,
        }
    }
}

impl From<Envelope> for Message {
    fn from(envelope: Envelope) -> Self {
        Self {
            src: envelope.src,
            dst: envelope.dst,
            msg_type: envelope.msg_type,
            version: envelope.version,
            payload: envelope.payload,
        }
    }
}
