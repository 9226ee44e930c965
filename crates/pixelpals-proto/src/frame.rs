//! STOMP 1.2 text frames.
//!
//! A frame on the wire is:
//!
//! ```text
//! COMMAND\n
//! name:value\n        (zero or more headers)
//! \n
//! body\0
//! ```
//!
//! One WebSocket text message carries one frame. A message consisting only of
//! end-of-line characters is a heart-beat and decodes to `None`.
//!
//! # Invariants
//!
//! - Header names and values are escaped (`\\`, `\n`, `\r`, `\c`) for every
//!   command except `CONNECT` and `CONNECTED`, as STOMP 1.2 requires.
//! - When a frame carries `content-length`, exactly that many bytes form the
//!   body. Otherwise the body runs to the first NUL.
//! - Repeated headers are kept in order; lookups return the first occurrence.

use crate::errors::{ProtocolError, Result};

/// STOMP protocol version negotiated in `CONNECT`.
pub const STOMP_VERSION: &str = "1.2";

/// Frame terminator.
const NUL: char = '\0';

/// STOMP frame command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Client handshake (1.2 alias of `CONNECT`).
    Stomp,
    /// Server handshake acceptance.
    Connected,
    /// Client publish.
    Send,
    /// Client subscription.
    Subscribe,
    /// Client subscription removal.
    Unsubscribe,
    /// Client graceful disconnect.
    Disconnect,
    /// Server delivery on a subscription.
    Message,
    /// Server receipt acknowledgement.
    Receipt,
    /// Server error (fatal for the connection).
    Error,
}

impl Command {
    /// Wire spelling of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parse a command line. `None` for anything unknown.
    pub fn parse(line: &str) -> Option<Self> {
        let command = match line {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            _ => return None,
        };
        Some(command)
    }

    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    headers: Vec<(String, String)>,
    /// Frame body (JSON for every destination we use).
    pub body: String,
}

impl Frame {
    /// Empty frame with the given command.
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body.
    #[must_use]
    pub fn with_json_body(mut self, body: impl Into<String>) -> Self {
        self.headers.push(("content-type".to_string(), "application/json".to_string()));
        self.body = body.into();
        self
    }

    /// Client handshake carrying the bearer credential.
    ///
    /// `heartbeat_ms` is offered in both directions; `0` disables heart-beats.
    pub fn connect(host: &str, token: &str, heartbeat_ms: u64) -> Self {
        Self::new(Command::Connect)
            .with_header("accept-version", STOMP_VERSION)
            .with_header("host", host)
            .with_header("heart-beat", format!("{heartbeat_ms},{heartbeat_ms}"))
            .with_header("Authorization", format!("Bearer {token}"))
    }

    /// Subscribe `id` to `destination`.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe).with_header("id", id).with_header("destination", destination)
    }

    /// Cancel subscription `id`.
    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).with_header("id", id)
    }

    /// Publish a JSON body to `destination`.
    pub fn send(destination: &str, json: impl Into<String>) -> Self {
        Self::new(Command::Send).with_header("destination", destination).with_json_body(json)
    }

    /// Graceful client disconnect.
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// First value of header `name`. `None` if absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// All headers in wire order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// `destination` header. `None` if absent.
    pub fn destination(&self) -> Option<&str> {
        self.header("destination")
    }

    /// `subscription` header of a `MESSAGE`. `None` if absent.
    pub fn subscription(&self) -> Option<&str> {
        self.header("subscription")
    }

    /// Human-readable reason of an `ERROR` frame.
    ///
    /// Brokers put the short reason in the `message` header and details in
    /// the body; both are joined so callers can search for auth markers.
    pub fn error_reason(&self) -> String {
        match (self.header("message"), self.body.trim()) {
            (Some(message), "") => message.to_string(),
            (Some(message), body) => format!("{message}: {body}"),
            (None, body) => body.to_string(),
        }
    }

    /// Encode to the wire format, including the trailing NUL.
    ///
    /// A `content-length` header is added for non-empty bodies unless one is
    /// already present.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');

        let escape = self.command.escapes_headers();
        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str("content-length:");
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push(NUL);
        out
    }

    /// Decode one frame from a WebSocket text message.
    ///
    /// Returns `Ok(None)` for heart-beats (messages made only of EOLs).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownCommand` for an unrecognized command line
    /// - `ProtocolError::MalformedHeader` / `InvalidEscape` for bad headers
    /// - `ProtocolError::UnterminatedHeaders` if the blank line is missing
    /// - `ProtocolError::Truncated` / `InvalidContentLength` for bad bodies
    pub fn decode(input: &str) -> Result<Option<Self>> {
        let input = input.trim_start_matches(['\r', '\n']);
        if input.is_empty() {
            return Ok(None);
        }

        let (command_line, mut rest) = split_line(input).ok_or(ProtocolError::UnterminatedHeaders)?;
        let command = Command::parse(command_line)
            .ok_or_else(|| ProtocolError::UnknownCommand(command_line.to_string()))?;
        let escape = command.escapes_headers();

        let mut headers = Vec::new();
        loop {
            let (line, next) = split_line(rest).ok_or(ProtocolError::UnterminatedHeaders)?;
            rest = next;
            if line.is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;

            if escape {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(name, _)| name == "content-length")
            .map(|(_, value)| {
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ProtocolError::InvalidContentLength(value.clone()))
            })
            .transpose()?;

        let body = match content_length {
            Some(expected) => {
                if rest.len() < expected {
                    return Err(ProtocolError::Truncated { expected, actual: rest.len() });
                }
                rest.get(..expected)
                    .ok_or_else(|| ProtocolError::InvalidContentLength(expected.to_string()))?
            },
            None => rest.split(NUL).next().unwrap_or_default(),
        };

        Ok(Some(Self { command, headers, body: body.to_string() }))
    }
}

/// Split off one line, tolerating `\r\n`. `None` if there is no newline.
fn split_line(input: &str) -> Option<(&str, &str)> {
    let (line, rest) = input.split_once('\n')?;
    Some((line.strip_suffix('\r').unwrap_or(line), rest))
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(ProtocolError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}
