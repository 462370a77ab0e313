//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

/// Shared crate result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Link-level failure (framing, closed link, device setup).
    Transport(String),
    /// Envelope encoding or validation failure.
    Envelope(EnvelopeError),
    /// Operation attempted in the wrong handler lifecycle state.
    InvalidState(String),
    /// Capability exists on the interface but the implementation lacks it.
    NotImplemented(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Envelope(err) => write!(f, "envelope: {err}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::NotImplemented(msg) => write!(f, "not implemented: {msg}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Envelope(err) => Some(err),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<EnvelopeError> for AppError {
    fn from(err: EnvelopeError) -> Self {
        Self::Envelope(err)
    }
}

/// Reasons an envelope cannot be produced or accepted.
///
/// Callers discriminate on the variant: a future multi-version node can react
/// to [`EnvelopeError::UnsupportedVersion`] differently from garbage on the
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The line could not be parsed as a JSON object at all.
    MalformedWire(String),
    /// The record parsed but lacks one of the required keys.
    MissingField(&'static str),
    /// `v` is an integer that no entry in the version table handles.
    UnsupportedVersion(i64),
    /// `v` is present but is not an integer.
    InvalidVersion(String),
    /// A present field has a JSON type the typed envelope cannot hold.
    InvalidField {
        /// Wire key of the offending field.
        field: &'static str,
        /// Shape the decoder expected.
        expected: &'static str,
    },
}

impl Display for EnvelopeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedWire(msg) => write!(f, "malformed wire: {msg}"),
            Self::MissingField(name) => write!(f, "missing field: `{name}`"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported version: {v}"),
            Self::InvalidVersion(raw) => write!(f, "version is not an integer: {raw}"),
            Self::InvalidField { field, expected } => {
                write!(f, "invalid field: `{field}` must be {expected}")
            }
        }
    }
}

impl std::error::Error for EnvelopeError {}

impl From<serde_json::Error> for EnvelopeError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedWire(err.to_string())
    }
}
