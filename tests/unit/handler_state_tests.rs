//! Unit tests for the handler lifecycle.
//!
//! Covers:
//! - `begin` / `close` transitions and the errors for out-of-order calls
//! - a failed `begin` leaving the handler uninitialized
//! - outbound validation before anything reaches the transport
//! - node identifier changes and line counters
//! - the radio handler's unimplemented send path
//! - `build_handler` dispatch on link kind

use std::path::PathBuf;

use bifrost::clock::ManualClock;
use bifrost::config::{LinkConfig, LinkKind, NodeConfig};
use bifrost::envelope::{Codec, Envelope, Message};
use bifrost::handler::{build_handler, BridgeHandler, Handler, HandlerState, Outbound, RadioHandler};
use bifrost::transport::{MemoryTransport, SerialTransport, Transport};
use bifrost::{AppError, EnvelopeError};

fn bridge_pair() -> (BridgeHandler<MemoryTransport>, BridgeHandler<MemoryTransport>) {
    let (a, b) = MemoryTransport::pair();
    (
        BridgeHandler::new("node-a", a, LinkConfig::default()),
        BridgeHandler::new("node-b", b, LinkConfig::default()),
    )
}

fn assert_invalid_state(result: bifrost::Result<impl std::fmt::Debug>, expected: &str) {
    match result {
        Err(AppError::InvalidState(msg)) => assert_eq!(msg, expected),
        other => panic!("expected invalid state `{expected}`, got: {other:?}"),
    }
}

// ── Lifecycle ───────────────────────────────────────────────

#[test]
fn new_handler_is_uninitialized() {
    let (a, _b) = bridge_pair();
    assert_eq!(a.state(), HandlerState::Uninitialized);
    assert_eq!(a.node_id(), "node-a");
}

#[test]
fn send_and_receive_before_begin_are_rejected() {
    let (mut a, _b) = bridge_pair();

    assert_invalid_state(a.send("x".into()), "send before begin");
    assert_invalid_state(a.receive(), "receive before begin");
}

#[test]
fn begin_moves_to_ready_once() {
    let (mut a, _b) = bridge_pair();

    a.begin().expect("first begin");
    assert_eq!(a.state(), HandlerState::Ready);

    assert_invalid_state(a.begin(), "begin called twice");
    assert_eq!(a.state(), HandlerState::Ready);
}

#[test]
fn close_is_terminal_and_idempotent() {
    let (mut a, _b) = bridge_pair();
    a.begin().expect("begin");

    a.close().expect("close");
    a.close().expect("second close is a no-op");

    assert_eq!(a.state(), HandlerState::Closed);
    assert_invalid_state(a.send("x".into()), "send after close");
    assert_invalid_state(a.receive(), "receive after close");
    assert_invalid_state(a.begin(), "handler is closed");
}

#[test]
fn close_before_begin_is_rejected() {
    let (mut a, _b) = bridge_pair();
    assert_invalid_state(a.close(), "close before begin");
    assert_eq!(a.state(), HandlerState::Uninitialized);
}

#[test]
fn failed_begin_stays_uninitialized() {
    let dir = tempfile::tempdir().expect("temp dir");
    let link = LinkConfig {
        kind: LinkKind::Serial,
        path: Some(dir.path().join("no-such-tty")),
        ..LinkConfig::default()
    };
    let mut handler = BridgeHandler::new("n", SerialTransport::new(), link);

    let result = handler.begin();

    assert!(
        matches!(result, Err(AppError::Transport(_))),
        "got: {result:?}"
    );
    assert_eq!(handler.state(), HandlerState::Uninitialized);
}

// ── Sending ─────────────────────────────────────────────────

#[test]
fn outbound_line_with_newline_is_rejected_before_transmit() {
    let (mut a, mut b) = bridge_pair();
    a.begin().expect("begin a");
    b.begin().expect("begin b");

    let result = a.send("one\ntwo".into());

    assert!(matches!(result, Err(AppError::Transport(_))), "got: {result:?}");
    assert_eq!(a.stats().lines_sent, 0);
    assert_eq!(b.receive().expect("poll"), None);
}

#[test]
fn outbound_envelope_with_unsupported_version_is_not_sent() {
    let (mut a, mut b) = bridge_pair();
    a.begin().expect("begin a");
    b.begin().expect("begin b");

    let envelope = Envelope {
        version: 2,
        src: "node-a".into(),
        dst: "node-b".into(),
        msg_type: "state".into(),
        timestamp: 1,
        payload: serde_json::json!(null),
    };
    let result = a.send(Outbound::Envelope(envelope));

    assert!(
        matches!(
            result,
            Err(AppError::Envelope(EnvelopeError::UnsupportedVersion(2)))
        ),
        "got: {result:?}"
    );
    assert_eq!(b.receive().expect("poll"), None);
}

#[test]
fn send_message_encodes_with_the_codec_clock() {
    let (mut a, mut b) = bridge_pair();
    a.begin().expect("begin a");
    b.begin().expect("begin b");
    let codec = Codec::new(ManualClock::new(42));

    a.send_message(&codec, &Message::new("node-a", "node-b", 7))
        .expect("send message");

    let line = b.receive().expect("poll").expect("line available");
    assert_eq!(
        line,
        r#"{"v":1,"src":"node-a","dst":"node-b","type":"state","ts":42,"payload":7}"#
    );
}

#[test]
fn send_message_with_unsupported_version_transmits_nothing() {
    let (mut a, mut b) = bridge_pair();
    a.begin().expect("begin a");
    b.begin().expect("begin b");
    let codec = Codec::new(ManualClock::new(0));

    let result = a.send_message(&codec, &Message::new("a", "b", 1).with_version(3));

    assert!(matches!(
        result,
        Err(AppError::Envelope(EnvelopeError::UnsupportedVersion(3)))
    ));
    assert_eq!(b.receive().expect("poll"), None);
}

// ── Identity and counters ───────────────────────────────────

#[test]
fn set_node_id_replaces_identifier() {
    let (mut a, _b) = bridge_pair();
    a.set_node_id("renamed");
    assert_eq!(a.node_id(), "renamed");
}

#[test]
fn stats_count_lines_in_both_directions() {
    let (mut a, mut b) = bridge_pair();
    a.begin().expect("begin a");
    b.begin().expect("begin b");

    a.send("one".into()).expect("send one");
    a.send("two".into()).expect("send two");
    b.receive().expect("first").expect("one");
    assert_eq!(b.receive().expect("second").as_deref(), Some("two"));
    assert_eq!(b.receive().expect("empty"), None);

    assert_eq!(a.stats().lines_sent, 2);
    assert_eq!(b.stats().lines_received, 2);
    assert_eq!(b.stats().lines_sent, 0);
}

// ── Radio ───────────────────────────────────────────────────

#[test]
fn radio_send_is_not_implemented() {
    let (radio_side, mut peer) = MemoryTransport::pair();
    let mut radio = RadioHandler::new("radio1", radio_side, LinkConfig::default());
    radio.begin().expect("begin");

    let result = radio.send("hello".into());

    assert!(matches!(result, Err(AppError::NotImplemented(_))), "got: {result:?}");
    assert_eq!(radio.stats().lines_sent, 0);
    assert_eq!(peer.try_read_line().expect("peer poll"), None);
}

#[test]
fn radio_receives_like_a_bridge() {
    let (radio_side, peer) = MemoryTransport::pair();
    let mut radio = RadioHandler::new("radio1", radio_side, LinkConfig::default());
    radio.begin().expect("begin");

    peer.inject(b"heard\n").expect("inject");

    assert_eq!(radio.receive().expect("poll").as_deref(), Some("heard"));
}

#[test]
fn radio_send_after_close_reports_state_first() {
    let (radio_side, _peer) = MemoryTransport::pair();
    let mut radio = RadioHandler::new("radio1", radio_side, LinkConfig::default());
    radio.begin().expect("begin");
    radio.close().expect("close");

    assert_invalid_state(radio.send("x".into()), "send after close");
}

// ── Construction from config ────────────────────────────────

#[test]
fn build_handler_uses_configured_node_id() {
    let config = NodeConfig {
        node_id: "sensor7".into(),
        poll_interval_ms: 50,
        link: LinkConfig {
            kind: LinkKind::Radio,
            path: Some(PathBuf::from("/dev/ttyRADIO")),
            ..LinkConfig::default()
        },
    };

    let handler = build_handler(&config).expect("handler");

    assert_eq!(handler.node_id(), "sensor7");
    assert_eq!(handler.state(), HandlerState::Uninitialized);
}

#[test]
fn build_handler_rejects_invalid_link() {
    let config = NodeConfig {
        node_id: "n".into(),
        poll_interval_ms: 50,
        link: LinkConfig {
            kind: LinkKind::Tcp,
            ..LinkConfig::default()
        },
    };

    assert!(matches!(build_handler(&config), Err(AppError::Config(_))));
}
