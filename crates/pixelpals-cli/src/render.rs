//! Plain-text rendering of the read model.
//!
//! Everything here is pure string formatting so the driver only decides when
//! to write.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime};
use pixelpals_app::Notice;
use pixelpals_client::{ConnectionState, ConversationId, Overview, Transcript, TranscriptEntry};

/// One-line summary of the overview.
pub fn status_line(overview: &Overview) -> String {
    let online = overview.presence.iter().filter(|p| p.online).count();
    let mut line = format!(
        "[{}] unread {} (friends {}, matches {}) | friend requests {} | match alerts {} | online {}/{}",
        connection_label(overview.connection),
        overview.total_unread,
        overview.friend_chat_unread,
        overview.match_chat_unread,
        overview.pending_friend_requests,
        overview.match_notifications.len(),
        online,
        overview.presence.len(),
    );
    if let Some(match_id) = &overview.active_match {
        let _ = write!(line, " | in match {match_id}");
    }
    line
}

/// One transcript entry as `HH:MM who: text`.
pub fn entry_line(entry: &TranscriptEntry) -> String {
    let message = entry.message();
    let who = message.sender_username.as_deref().unwrap_or(&message.sender_id);
    let time = message.timestamp.as_deref().and_then(clock_time).unwrap_or_else(|| "--:--".into());
    let marker = if entry.is_provisional() { " (sending)" } else { "" };
    format!("{time} {who}: {}{marker}", message.content)
}

/// One notice line.
pub fn notice_line(notice: &Notice) -> String {
    match notice {
        Notice::Connection(state) => format!("* push channel {}", connection_label(*state)),
        Notice::Match(notification) => format!("* {}", notification.message),
        Notice::SessionExpired { reason } => {
            format!("! session expired ({reason}), log in again with /login")
        },
        Notice::Error { message } => format!("! {message}"),
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "offline",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
    }
}

/// `HH:MM` of an RFC 3339 or zone-less ISO-8601 timestamp.
fn clock_time(raw: &str) -> Option<String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.format("%H:%M").to_string());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|time| time.format("%H:%M").to_string())
}

/// Incremental printer for the open conversation.
///
/// Remembers what was already written and only yields new lines, unless
/// earlier lines changed (a history merge or a confirmed echo), in which case
/// the whole conversation is written again.
#[derive(Debug, Default)]
pub struct TranscriptView {
    conversation: Option<ConversationId>,
    printed: Vec<String>,
}

impl TranscriptView {
    /// Lines to write for the current transcript state.
    pub fn update(&mut self, transcript: &Transcript) -> Vec<String> {
        let conversation = transcript.conversation_id().cloned();
        let lines: Vec<String> = transcript.entries().iter().map(entry_line).collect();
        let mut out = Vec::new();

        if conversation != self.conversation {
            match &conversation {
                Some(id) => out.push(format!("-- {id} --")),
                None => out.push("-- conversation closed --".to_string()),
            }
            self.conversation = conversation;
            self.printed.clear();
        } else if !lines.starts_with(&self.printed) {
            if let Some(id) = &self.conversation {
                out.push(format!("-- {id} --"));
            }
            self.printed.clear();
        }

        out.extend(lines[self.printed.len()..].iter().cloned());
        self.printed = lines;
        out
    }
}
