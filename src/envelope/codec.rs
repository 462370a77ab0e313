//! Envelope codec: version table, encoding and validation.
//!
//! Encoding looks the requested version up in the version table; a version
//! with no entry produces [`EnvelopeError::UnsupportedVersion`] and no output,
//! so nothing reaches the link.
//!
//! Decoding comes in two strictness levels selected by [`Strictness`]:
//!
//! | Level    | Parses | All six keys | `v` integer | `v` in table |
//! |----------|--------|--------------|-------------|--------------|
//! | `Loose`  | yes    | yes          | no          | no           |
//! | `Strict` | yes    | yes          | yes         | yes          |
//!
//! A `"v":2` record therefore passes the loose check and fails strict
//! decoding. Unknown top-level keys are ignored at both levels.

use serde_json::{Map, Number, Value};
use tracing::trace;

use crate::clock::{Clock, UptimeClock};
use crate::envelope::{Envelope, Message, REQUIRED_FIELDS};
use crate::errors::EnvelopeError;

type Fields = Map<String, Value>;

/// Validation level applied by [`inspect`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Strictness {
    /// Parse and check key presence only.
    Loose,
    /// Additionally require an integer `v` with a registered wire format.
    Strict,
}

/// Encode/decode strategy for one protocol version.
struct WireVersion {
    version: u32,
    /// Keys required after `v` has been matched to this entry.
    required: &'static [&'static str],
    encode: fn(&Message, u64) -> Fields,
    extract: fn(u32, Fields) -> Result<Envelope, EnvelopeError>,
}

/// Registered wire formats. Adding version 2 means adding one entry here.
static VERSION_TABLE: &[WireVersion] = &[WireVersion {
    version: 1,
    required: &["src", "dst", "type", "ts", "payload"],
    encode: encode_v1,
    extract: extract_v1,
}];

fn lookup(version: i64) -> Option<&'static WireVersion> {
    VERSION_TABLE
        .iter()
        .find(|entry| i64::from(entry.version) == version)
}

/// Protocol versions this build can encode and strictly decode.
#[must_use]
pub fn supported_versions() -> Vec<u32> {
    VERSION_TABLE.iter().map(|entry| entry.version).collect()
}

/// Whether `version` has an entry in the version table.
#[must_use]
pub fn is_supported(version: u32) -> bool {
    lookup(i64::from(version)).is_some()
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Stateless envelope encoder bound to a producer clock.
///
/// ```
/// use bifrost::clock::ManualClock;
/// use bifrost::envelope::{Codec, Message};
///
/// let codec = Codec::new(ManualClock::new(1042));
/// let line = codec.encode(&Message::new("sensor1", "hub", 23.5)).unwrap();
/// assert_eq!(
///     line,
///     r#"{"v":1,"src":"sensor1","dst":"hub","type":"state","ts":1042,"payload":23.5}"#
/// );
/// ```
#[derive(Debug, Default)]
pub struct Codec<C: Clock = UptimeClock> {
    clock: C,
}

impl<C: Clock> Codec<C> {
    /// Create a codec reading timestamps from `clock`.
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// The clock stamping outgoing envelopes.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Encode `message` into a single wire line (without the terminator).
    ///
    /// The timestamp is read from the codec clock at call time.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::UnsupportedVersion`] when the message version
    /// has no wire format; no output is produced in that case.
    pub fn encode(&self, message: &Message) -> Result<String, EnvelopeError> {
        let entry = lookup(i64::from(message.version()))
            .ok_or(EnvelopeError::UnsupportedVersion(i64::from(message.version())))?;
        let ts = self.clock.now_millis();
        let fields = (entry.encode)(message, ts);
        Ok(serde_json::to_string(&Value::Object(fields))?)
    }
}

/// Re-encode an already-stamped envelope, keeping its timestamp.
///
/// Used when forwarding a decoded envelope unchanged.
///
/// # Errors
///
/// Returns [`EnvelopeError::UnsupportedVersion`] when `envelope.version` has
/// no wire format.
pub fn encode_envelope(envelope: &Envelope) -> Result<String, EnvelopeError> {
    let entry = lookup(i64::from(envelope.version))
        .ok_or(EnvelopeError::UnsupportedVersion(i64::from(envelope.version)))?;
    let message = Message::from(envelope.clone());
    let fields = (entry.encode)(&message, envelope.timestamp);
    Ok(serde_json::to_string(&Value::Object(fields))?)
}

fn encode_v1(message: &Message, ts: u64) -> Fields {
    let mut fields = Fields::new();
    fields.insert("v".into(), Value::from(message.version()));
    fields.insert("src".into(), Value::from(message.src()));
    fields.insert("dst".into(), Value::from(message.dst()));
    fields.insert("type".into(), Value::from(message.msg_type()));
    fields.insert("ts".into(), Value::Number(Number::from(ts)));
    fields.insert("payload".into(), message.payload().clone());
    fields
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// A parsed record that passed [`inspect`] at some strictness level.
///
/// Holds the raw top-level document, including any extension keys.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEnvelope {
    fields: Fields,
}

impl RawEnvelope {
    /// Raw value of a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The `v` value if it is an integer.
    #[must_use]
    pub fn version(&self) -> Option<i64> {
        self.fields.get("v").and_then(Value::as_i64)
    }

    /// Top-level keys not defined by the protocol.
    pub fn extra_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .keys()
            .map(String::as_str)
            .filter(|key| !REQUIRED_FIELDS.contains(key))
    }

    /// Consume the record, returning the raw document.
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

/// Parse `line` and validate it at the requested strictness.
///
/// # Errors
///
/// - [`EnvelopeError::MalformedWire`]: not a JSON object.
/// - [`EnvelopeError::MissingField`]: a required key is absent (loose checks
///   `v, src, dst, type, ts, payload` in that order; strict checks `v` first).
/// - [`EnvelopeError::InvalidVersion`] (strict only): `v` is not an integer.
/// - [`EnvelopeError::UnsupportedVersion`] (strict only): `v` is not in the
///   version table.
pub fn inspect(line: &str, strictness: Strictness) -> Result<RawEnvelope, EnvelopeError> {
    let fields = parse_object(line)?;
    match strictness {
        Strictness::Loose => require(&fields, &REQUIRED_FIELDS)?,
        Strictness::Strict => {
            let entry = resolve_version(&fields)?;
            require(&fields, entry.required)?;
        }
    }
    Ok(RawEnvelope { fields })
}

/// Loose validity check: the line parses and carries all six keys.
///
/// The version value is not examined.
#[must_use]
pub fn is_valid_envelope(line: &str) -> bool {
    inspect(line, Strictness::Loose).is_ok()
}

/// Strictly decode `line` into an [`Envelope`].
///
/// # Errors
///
/// Every [`inspect`] failure at [`Strictness::Strict`], plus
/// [`EnvelopeError::InvalidField`] when `src`, `dst` or `type` is not a
/// string, or `ts` is not an unsigned integer.
pub fn decode(line: &str) -> Result<Envelope, EnvelopeError> {
    let fields = parse_object(line)?;
    let entry = resolve_version(&fields)?;
    require(&fields, entry.required)?;
    let envelope = (entry.extract)(entry.version, fields)?;
    trace!(
        src = envelope.src.as_str(),
        dst = envelope.dst.as_str(),
        msg_type = envelope.msg_type.as_str(),
        "envelope decoded"
    );
    Ok(envelope)
}

fn extract_v1(version: u32, mut fields: Fields) -> Result<Envelope, EnvelopeError> {
    Ok(Envelope {
        version,
        src: take_string(&mut fields, "src")?,
        dst: take_string(&mut fields, "dst")?,
        msg_type: take_string(&mut fields, "type")?,
        timestamp: take_timestamp(&fields, "ts")?,
        payload: fields.remove("payload").unwrap_or(Value::Null),
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn parse_object(line: &str) -> Result<Fields, EnvelopeError> {
    match serde_json::from_str::<Value>(line)? {
        Value::Object(fields) => Ok(fields),
        other => Err(EnvelopeError::MalformedWire(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn resolve_version(fields: &Fields) -> Result<&'static WireVersion, EnvelopeError> {
    let raw = fields.get("v").ok_or(EnvelopeError::MissingField("v"))?;
    let version = raw
        .as_i64()
        .ok_or_else(|| EnvelopeError::InvalidVersion(raw.to_string()))?;
    lookup(version).ok_or(EnvelopeError::UnsupportedVersion(version))
}

fn require(fields: &Fields, keys: &[&'static str]) -> Result<(), EnvelopeError> {
    match keys.iter().find(|key| !fields.contains_key(**key)) {
        Some(missing) => Err(EnvelopeError::MissingField(*missing)),
        None => Ok(()),
    }
}

fn take_string(fields: &mut Fields, key: &'static str) -> Result<String, EnvelopeError> {
    match fields.remove(key) {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(EnvelopeError::InvalidField {
            field: key,
            expected: "a string",
        }),
        None => Err(EnvelopeError::MissingField(key)),
    }
}

fn take_timestamp(fields: &Fields, key: &'static str) -> Result<u64, EnvelopeError> {
    match fields.get(key) {
        Some(value) => value.as_u64().ok_or(EnvelopeError::InvalidField {
            field: key,
            expected: "an unsigned integer",
        }),
        None => Err(EnvelopeError::MissingField(key)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
