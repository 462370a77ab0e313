//! Unit tests for `AppError` and `EnvelopeError` display and conversions.

use std::error::Error as _;

use bifrost::{AppError, EnvelopeError};

#[test]
fn envelope_errors_name_their_cause() {
    assert_eq!(
        EnvelopeError::MissingField("dst").to_string(),
        "missing field: `dst`"
    );
    assert_eq!(
        EnvelopeError::UnsupportedVersion(2).to_string(),
        "unsupported version: 2"
    );
    assert_eq!(
        EnvelopeError::InvalidVersion("\"1\"".into()).to_string(),
        "version is not an integer: \"1\""
    );
    assert_eq!(
        EnvelopeError::InvalidField {
            field: "ts",
            expected: "an unsigned integer"
        }
        .to_string(),
        "invalid field: `ts` must be an unsigned integer"
    );
    assert!(EnvelopeError::MalformedWire("eof".into())
        .to_string()
        .starts_with("malformed wire:"));
}

#[test]
fn app_error_prefixes_are_distinct() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Io("x".into()), "io: x"),
        (AppError::Transport("x".into()), "transport: x"),
        (AppError::InvalidState("x".into()), "invalid state: x"),
        (AppError::NotImplemented("x".into()), "not implemented: x"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn envelope_variant_wraps_and_exposes_source() {
    let err = AppError::from(EnvelopeError::UnsupportedVersion(9));

    assert_eq!(err.to_string(), "envelope: unsupported version: 9");
    assert!(err.source().is_some(), "envelope errors expose their cause");
    assert!(AppError::Io("x".into()).source().is_none());
}

#[test]
fn error_messages_have_no_trailing_period() {
    let err = AppError::Transport("link closed".into());
    assert!(!err.to_string().ends_with('.'));
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
    let err = AppError::from(io);

    assert!(matches!(err, AppError::Io(ref msg) if msg == "pipe gone"));
}

#[test]
fn json_errors_convert_to_malformed_wire() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err = EnvelopeError::from(json_err);

    assert!(matches!(err, EnvelopeError::MalformedWire(_)));
}

#[test]
fn toml_errors_convert_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
    let err = AppError::from(toml_err);

    assert!(err.to_string().starts_with("config: invalid config:"));
}
