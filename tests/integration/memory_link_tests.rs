//! Integration tests for two nodes exchanging envelopes over an in-memory link.
//!
//! Exercises the full path: `Message` → `Codec::encode` → `Handler::send` →
//! transport → `Handler::receive` → `decode`.

use serde_json::json;

use bifrost::clock::ManualClock;
use bifrost::envelope::{self, Codec, Message};
use bifrost::handler::{poll_envelope, Handler, Outbound};

use super::test_helpers::ready_memory_pair;

#[test]
fn sent_message_is_received_and_decoded() {
    let (mut sensor, mut hub) = ready_memory_pair("sensor1", "hub");
    let codec = Codec::new(ManualClock::new(12_345));
    let message = Message::new("sensor1", "hub", json!({"temp": 22.5})).with_type("reading");

    sensor.send_message(&codec, &message).expect("send");
    let envelope = poll_envelope(&mut hub)
        .expect("poll")
        .expect("envelope available");

    assert_eq!(envelope.version, 1);
    assert_eq!(envelope.src, "sensor1");
    assert_eq!(envelope.dst, "hub");
    assert_eq!(envelope.msg_type, "reading");
    assert_eq!(envelope.timestamp, 12_345);
    assert_eq!(envelope.payload, json!({"temp": 22.5}));
}

#[test]
fn empty_link_polls_return_immediately() {
    let (_sensor, mut hub) = ready_memory_pair("sensor1", "hub");

    for _ in 0..100 {
        assert_eq!(hub.receive().expect("poll"), None);
    }
}

#[test]
fn lines_arrive_in_send_order() {
    let (mut sensor, mut hub) = ready_memory_pair("sensor1", "hub");
    let codec = Codec::new(ManualClock::new(0));

    for n in 0..20 {
        codec.clock().set(n);
        sensor
            .send_message(&codec, &Message::new("sensor1", "hub", n))
            .expect("send");
    }

    let received: Vec<u64> = std::iter::from_fn(|| poll_envelope(&mut hub).expect("poll"))
        .map(|envelope| envelope.timestamp)
        .collect();
    assert_eq!(received, (0..20).collect::<Vec<u64>>());
}

#[test]
fn garbage_between_envelopes_is_dropped() {
    let (_sensor, mut hub) = ready_memory_pair("sensor1", "hub");
    let good = r#"{"v":1,"src":"sensor1","dst":"hub","type":"state","ts":1,"payload":null}"#;
    let noise = format!(
        "\u{0}\u{7f}garbage\n{}\n{}\n{good}\n",
        good.replace("\"v\":1", "\"v\":2"),
        good.replace(",\"payload\":null", "")
    );
    hub.transport().inject(noise.as_bytes()).expect("inject");

    // Each invalid line costs one poll and yields nothing.
    assert_eq!(poll_envelope(&mut hub).expect("not json"), None);
    assert_eq!(poll_envelope(&mut hub).expect("wrong version"), None);
    assert_eq!(poll_envelope(&mut hub).expect("missing payload"), None);
    let envelope = poll_envelope(&mut hub)
        .expect("valid line")
        .expect("envelope after noise");

    assert_eq!(envelope.timestamp, 1);
    assert_eq!(hub.stats().lines_received, 4);
}

#[test]
fn binary_noise_is_dropped_and_polling_continues() {
    let (_sensor, mut hub) = ready_memory_pair("sensor1", "hub");
    let good = r#"{"v":1,"src":"sensor1","dst":"hub","type":"state","ts":3,"payload":1}"#;

    hub.transport().inject(b"\xff\xfe noise\n").expect("inject");
    hub.transport()
        .inject(format!("{good}\n").as_bytes())
        .expect("inject");

    assert_eq!(poll_envelope(&mut hub).expect("noise is not fatal"), None);
    let envelope = poll_envelope(&mut hub)
        .expect("poll")
        .expect("envelope after noise");
    assert_eq!(envelope.timestamp, 3);
}

#[test]
fn partial_line_is_held_until_complete() {
    let (_sensor, mut hub) = ready_memory_pair("sensor1", "hub");

    hub.transport().inject(br#"{"v":1,"src":"a","dst":"b","#).expect("inject");
    assert_eq!(hub.receive().expect("partial"), None);

    hub.transport().inject(br#""type":"state","ts":5,"payload":"on"}"#).expect("inject");
    assert_eq!(hub.receive().expect("still partial"), None);

    hub.transport().inject(b"\n").expect("inject");
    let envelope = poll_envelope(&mut hub)
        .expect("poll")
        .expect("complete envelope");
    assert_eq!(envelope.payload, json!("on"));
}

#[test]
fn over_long_line_is_dropped_and_link_continues() {
    let (_sensor, mut hub) = ready_memory_pair("sensor1", "hub");
    let huge = format!("{}\n", "x".repeat(4096));
    let good = r#"{"v":1,"src":"a","dst":"hub","type":"state","ts":9,"payload":1}"#;

    hub.transport().inject(huge.as_bytes()).expect("inject");
    hub.transport().inject(format!("{good}\n").as_bytes()).expect("inject");

    let mut found = None;
    for _ in 0..16 {
        if let Some(envelope) = poll_envelope(&mut hub).expect("poll must not fail") {
            found = Some(envelope);
            break;
        }
    }
    assert_eq!(found.expect("valid line after over-long line").timestamp, 9);
}

#[test]
fn envelope_forwarded_by_a_relay_keeps_its_timestamp() {
    let (mut sensor, mut relay_in) = ready_memory_pair("sensor1", "relay");
    let (mut relay_out, mut hub) = ready_memory_pair("relay", "hub");
    let codec = Codec::new(ManualClock::new(777));

    sensor
        .send_message(&codec, &Message::new("sensor1", "hub", true))
        .expect("send");
    let envelope = poll_envelope(&mut relay_in)
        .expect("relay poll")
        .expect("relay got envelope");
    relay_out
        .send(Outbound::Envelope(envelope.clone()))
        .expect("forward");

    let line = hub.receive().expect("hub poll").expect("hub got line");
    assert_eq!(envelope::decode(&line).expect("valid"), envelope);
    assert!(line.contains("\"ts\":777"));
}

#[test]
fn loose_check_accepts_what_strict_decode_rejects() {
    let (mut sensor, mut hub) = ready_memory_pair("sensor1", "hub");
    let future = r#"{"v":2,"src":"a","dst":"b","type":"state","ts":1,"payload":{}}"#;

    sensor.send(future.into()).expect("raw send");
    let line = hub.receive().expect("poll").expect("line");

    assert!(envelope::is_valid_envelope(&line));
    assert!(envelope::decode(&line).is_err());
}
