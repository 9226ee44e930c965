//! Fake STOMP broker.
//!
//! Plays the server side of the push channel for one connection: it reads the
//! frames the client sends, remembers which subscription id belongs to which
//! destination, and builds `MESSAGE` frames that the client will route to the
//! right destination.

use std::collections::BTreeMap;

use pixelpals_proto::{Command, Destination, Frame, frame::STOMP_VERSION};

/// Server side of one push-channel connection.
#[derive(Debug, Default)]
pub struct SimBroker {
    /// Destination path to subscription id.
    subscriptions: BTreeMap<String, String>,
    /// `SEND` frames received since the last `take_published`.
    published: Vec<Frame>,
    /// Every `CONNECT` received.
    connects: Vec<Frame>,
    next_message_id: u64,
}

impl SimBroker {
    /// Broker with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// `CONNECTED` frame accepting the handshake.
    pub fn connected() -> String {
        Frame::new(Command::Connected)
            .with_header("version", STOMP_VERSION)
            .with_header("heart-beat", "0,0")
            .encode()
    }

    /// `ERROR` frame with `message` header and `details` body.
    pub fn error(message: &str, details: &str) -> String {
        let mut frame = Frame::new(Command::Error).with_header("message", message);
        frame.body = details.to_string();
        frame.encode()
    }

    /// Read one text message the client sent.
    ///
    /// Returns the decoded frame, or `None` for heart-beats and garbage.
    pub fn observe(&mut self, text: &str) -> Option<Frame> {
        let frame = Frame::decode(text).ok().flatten()?;

        match frame.command {
            Command::Connect | Command::Stomp => self.connects.push(frame.clone()),
            Command::Subscribe => {
                if let (Some(destination), Some(id)) = (frame.destination(), frame.header("id")) {
                    self.subscriptions.insert(destination.to_string(), id.to_string());
                }
            },
            Command::Unsubscribe => {
                if let Some(id) = frame.header("id") {
                    self.subscriptions.retain(|_, sub| sub != id);
                }
            },
            Command::Send => self.published.push(frame.clone()),
            Command::Disconnect => self.subscriptions.clear(),
            Command::Connected | Command::Message | Command::Receipt | Command::Error => {
                tracing::warn!(command = frame.command.as_str(), "client sent a server frame");
            },
        }

        Some(frame)
    }

    /// Whether the client currently listens on `destination`.
    pub fn is_subscribed(&self, destination: &Destination) -> bool {
        self.subscriptions.contains_key(&destination.path())
    }

    /// Paths the client currently listens on, sorted.
    pub fn subscribed_paths(&self) -> Vec<&str> {
        self.subscriptions.keys().map(String::as_str).collect()
    }

    /// `MESSAGE` frame delivering `body` on `destination`.
    ///
    /// `None` if the client is not subscribed to it.
    pub fn push(&mut self, destination: &Destination, body: &str) -> Option<String> {
        let path = destination.path();
        let subscription = self.subscriptions.get(&path)?.clone();
        self.next_message_id += 1;

        let frame = Frame::new(Command::Message)
            .with_header("subscription", subscription)
            .with_header("destination", path)
            .with_header("message-id", format!("msg-{}", self.next_message_id))
            .with_json_body(body);
        Some(frame.encode())
    }

    /// Drain the `SEND` frames received so far.
    pub fn take_published(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.published)
    }

    /// Most recent `CONNECT` frame.
    pub fn last_connect(&self) -> Option<&Frame> {
        self.connects.last()
    }

    /// The connection dropped; subscriptions are gone server-side.
    pub fn drop_connection(&mut self) {
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_pushes_by_observed_subscription() {
        let mut broker = SimBroker::new();
        broker.observe(&Frame::subscribe("sub-3", "/topic/status").encode());

        let text = broker.push(&Destination::Status, r#"{"userId":"f","online":true}"#);
        let frame = text.as_deref().and_then(|t| Frame::decode(t).ok().flatten());

        assert_eq!(frame.as_ref().and_then(Frame::subscription), Some("sub-3"));
        assert_eq!(frame.map(|f| f.body).as_deref(), Some(r#"{"userId":"f","online":true}"#));
    }

    #[test]
    fn unsubscribe_stops_pushes() {
        let mut broker = SimBroker::new();
        broker.observe(&Frame::subscribe("sub-1", "/topic/status").encode());
        broker.observe(&Frame::unsubscribe("sub-1").encode());

        assert!(!broker.is_subscribed(&Destination::Status));
        assert_eq!(broker.push(&Destination::Status, "{}"), None);
    }

    #[test]
    fn heartbeats_are_not_frames() {
        let mut broker = SimBroker::new();
        assert_eq!(broker.observe("\n"), None);
    }
}
