//! Property-based tests for STOMP frame encoding/decoding.
//!
//! Header escaping and body framing must survive arbitrary text, including
//! the characters STOMP treats specially (`:`, `\`, CR, LF).

use pixelpals_proto::{Command, Frame};
use proptest::prelude::*;

/// Commands whose headers are escaped on the wire.
fn escaped_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Send),
        Just(Command::Subscribe),
        Just(Command::Unsubscribe),
        Just(Command::Message),
        Just(Command::Error),
        Just(Command::Receipt),
    ]
}

/// Header text biased towards the characters that need escaping.
fn header_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just(':'),
            Just('\\'),
            Just('\n'),
            Just('\r'),
            any::<char>().prop_filter("no NUL", |c| *c != '\0'),
        ],
        0..24,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

#[test]
fn prop_escaped_headers_survive_roundtrip() {
    proptest!(|(
        command in escaped_command(),
        name in header_text().prop_filter("non-empty name", |n| !n.is_empty()),
        value in header_text(),
    )| {
        let frame = Frame::new(command).with_header(name.clone(), value.clone());
        let decoded = Frame::decode(&frame.encode()).expect("decode should succeed");
        let decoded = decoded.expect("frame is not a heart-beat");

        // PROPERTY: header name and value come back byte-identical
        prop_assert_eq!(decoded.command, command);
        prop_assert_eq!(decoded.header(&name), Some(value.as_str()));
    });
}

#[test]
fn prop_body_with_embedded_nul_uses_content_length() {
    proptest!(|(head in "[a-z{}\":]{0,32}", tail in "[a-z{}\":]{0,32}")| {
        let body = format!("{head}\0{tail}");
        let frame = Frame::send("/app/chat.sendMessage", body.clone());

        let decoded = Frame::decode(&frame.encode()).expect("decode should succeed");

        // PROPERTY: content-length frames the body, not the first NUL
        prop_assert_eq!(decoded.map(|f| f.body), Some(body));
    });
}

#[test]
fn prop_decode_never_panics() {
    proptest!(|(input in ".{0,256}")| {
        // PROPERTY: arbitrary input yields Ok or Err, never a panic
        let _ = Frame::decode(&input);
    });
}

#[test]
fn prop_heartbeats_decode_to_none() {
    proptest!(|(eols in prop::collection::vec(prop_oneof![Just("\n"), Just("\r\n")], 1..8))| {
        let input: String = eols.concat();
        prop_assert_eq!(Frame::decode(&input), Ok(None));
    });
}
