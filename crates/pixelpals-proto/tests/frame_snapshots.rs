//! Wire-format snapshots of the frames the client sends.
//!
//! The broker is strict about header spelling and the blank line before the
//! body, so the exact bytes are pinned here. NUL is rendered as `^@`.

use pixelpals_proto::{ConversationId, Destination, Frame};

fn render(frame: &Frame) -> String {
    frame.encode().replace('\0', "^@")
}

#[test]
fn connect_frame_is_not_escaped() {
    let frame = Frame::connect("localhost", "tok:en", 10_000);

    insta::assert_snapshot!(render(&frame), @r"
CONNECT
accept-version:1.2
host:localhost
heart-beat:10000,10000
Authorization:Bearer tok:en

^@
");
}

#[test]
fn subscribe_to_conversation_topic() {
    let destination = Destination::ChatRoom(ConversationId::between("u2", "u1"));
    let frame = Frame::subscribe("sub-3", &destination.path());

    insta::assert_snapshot!(render(&frame), @r"
SUBSCRIBE
id:sub-3
destination:/topic/chatRoom/u1_u2

^@
");
}

#[test]
fn send_adds_content_length() {
    let frame = Frame::send(&Destination::SendMessage.path(), r#"{"a":1}"#);

    insta::assert_snapshot!(render(&frame), @r#"
SEND
destination:/app/chat.sendMessage
content-type:application/json
content-length:7

{"a":1}^@
"#);
}
