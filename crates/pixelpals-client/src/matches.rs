//! Match notification queue.
//!
//! Holds the match notifications waiting for the user, keyed by
//! `(match_id, kind)`. A match can carry several kinds over its life
//! (requested, then declined), so the id alone is not a key.
//!
//! `Requested` and `Declined` pushes are queued. `Accepted` and `Closed` are
//! never queued: they move the active-match reference and are announced to
//! the views once.
//!
//! Append dedupes on the key, so a redelivered push does not produce a second
//! entry.

use chrono::{DateTime, NaiveDateTime, Utc};
use pixelpals_proto::{
    MatchId,
    payloads::{MatchUpdate, MatchUpdateKind, PendingMatch},
};

/// Kind of a match notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchKind {
    /// Someone asked the user for a match.
    Requested,
    /// A match the user is in was accepted.
    Accepted,
    /// A request the user sent was declined.
    Declined,
    /// A match the user is in was closed.
    Closed,
}

impl MatchKind {
    fn from_wire(kind: MatchUpdateKind) -> Option<Self> {
        match kind {
            MatchUpdateKind::MatchRequest => Some(Self::Requested),
            MatchUpdateKind::MatchAccepted => Some(Self::Accepted),
            MatchUpdateKind::MatchDeclined => Some(Self::Declined),
            MatchUpdateKind::MatchClosed => Some(Self::Closed),
            MatchUpdateKind::Unknown => None,
        }
    }
}

/// A match notification shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchNotification {
    /// Match the notification is about.
    pub match_id: MatchId,
    /// Notification kind.
    pub kind: MatchKind,
    /// The other party, when known.
    pub counterpart_username: Option<String>,
    /// Game of the match, when known.
    pub game_name: Option<String>,
    /// Display text.
    pub message: String,
    /// When the notification was created.
    pub timestamp: DateTime<Utc>,
}

impl MatchNotification {
    fn new(
        match_id: MatchId,
        kind: MatchKind,
        counterpart_username: Option<String>,
        game_name: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let who = counterpart_username.as_deref().unwrap_or("someone");
        let game = game_name.as_deref().unwrap_or("a game");
        let message = match kind {
            MatchKind::Requested => format!("New match request from {who} for {game}"),
            MatchKind::Accepted => format!("{who} accepted your request for {game}"),
            MatchKind::Declined => format!("{who} declined your request for {game}"),
            MatchKind::Closed => format!("{who} closed the match"),
        };

        Self { match_id, kind, counterpart_username, game_name, message, timestamp }
    }

    /// `(match_id, kind)` key.
    pub fn key(&self) -> (&str, MatchKind) {
        (&self.match_id, self.kind)
    }
}

/// What a push did to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Appended to the queue.
    Queued,
    /// Same key already queued; nothing changed.
    Duplicate,
    /// Not queued; the active match changed and the views should be told.
    Announced(MatchNotification),
    /// Unknown kind or missing match id; nothing changed.
    Ignored,
}

/// Pending match notifications plus the active-match reference.
#[derive(Debug, Clone, Default)]
pub struct MatchQueue {
    entries: Vec<MatchNotification>,
    active_match: Option<MatchId>,
}

impl MatchQueue {
    /// Empty queue, no active match.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queued notifications in arrival order.
    pub fn entries(&self) -> &[MatchNotification] {
        &self.entries
    }

    /// Number of queued notifications.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nothing queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Match the user is currently playing, if any.
    pub fn active_match(&self) -> Option<&MatchId> {
        self.active_match.as_ref()
    }

    /// Whether `(match_id, kind)` is queued.
    pub fn contains(&self, match_id: &str, kind: MatchKind) -> bool {
        self.entries.iter().any(|n| n.key() == (match_id, kind))
    }

    /// Apply a `match-notifications` push received at `now`.
    pub fn on_event(&mut self, update: &MatchUpdate, now: DateTime<Utc>) -> MatchOutcome {
        let (Some(match_id), Some(kind)) = (&update.match_id, MatchKind::from_wire(update.kind))
        else {
            tracing::debug!(kind = ?update.kind, "ignoring match notification");
            return MatchOutcome::Ignored;
        };

        let notification = MatchNotification::new(
            match_id.clone(),
            kind,
            update.counterpart_username().map(str::to_string),
            update.game_name.clone(),
            now,
        );

        match kind {
            MatchKind::Accepted => {
                self.active_match = Some(match_id.clone());
                MatchOutcome::Announced(notification)
            },
            MatchKind::Closed => {
                self.active_match = None;
                MatchOutcome::Announced(notification)
            },
            MatchKind::Requested | MatchKind::Declined => {
                if self.push_unique(notification) {
                    MatchOutcome::Queued
                } else {
                    MatchOutcome::Duplicate
                }
            },
        }
    }

    /// Replace every `Requested` entry with the pending snapshot.
    ///
    /// Other kinds are not covered by the snapshot and stay in place.
    pub fn replace_pending(&mut self, pending: Vec<PendingMatch>, now: DateTime<Utc>) {
        self.entries.retain(|n| n.kind != MatchKind::Requested);

        for item in pending {
            let timestamp = item.matched_at.as_deref().and_then(parse_matched_at).unwrap_or(now);
            self.push_unique(MatchNotification::new(
                item.id,
                MatchKind::Requested,
                item.user_a_username,
                item.game_name,
                timestamp,
            ));
        }
    }

    /// The pending snapshot failed: no `Requested` entries remain.
    pub fn fail_pending(&mut self) {
        self.entries.retain(|n| n.kind != MatchKind::Requested);
    }

    /// Remove `(match_id, kind)`. Idempotent; returns whether anything went.
    pub fn clear(&mut self, match_id: &str, kind: MatchKind) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.key() != (match_id, kind));
        self.entries.len() != before
    }

    /// Drop everything including the active match (logout).
    pub fn reset(&mut self) {
        self.entries.clear();
        self.active_match = None;
    }

    fn push_unique(&mut self, notification: MatchNotification) -> bool {
        let (match_id, kind) = notification.key();
        if self.contains(match_id, kind) {
            return false;
        }
        self.entries.push(notification);
        true
    }
}

/// Parse the server's `matchedAt`.
///
/// The server sends a local date-time without zone; it is read as UTC. Full
/// RFC 3339 strings are accepted too.
fn parse_matched_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(kind: MatchUpdateKind, match_id: &str) -> MatchUpdate {
        MatchUpdate {
            kind,
            match_id: Some(match_id.into()),
            opponent_username: Some("opp".into()),
            closer_username: None,
            sender_username: Some("sender".into()),
            decliner_username: None,
            game_name: Some("Chess".into()),
        }
    }

    #[test]
    fn duplicate_request_is_queued_once() {
        let mut queue = MatchQueue::new();
        let now = DateTime::<Utc>::default();

        let request = update(MatchUpdateKind::MatchRequest, "m1");
        assert_eq!(queue.on_event(&request, now), MatchOutcome::Queued);
        assert_eq!(queue.on_event(&request, now), MatchOutcome::Duplicate);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.entries()[0].message, "New match request from sender for Chess");
    }

    #[test]
    fn same_match_different_kind_is_separate() {
        let mut queue = MatchQueue::new();
        let now = DateTime::<Utc>::default();
        queue.on_event(&update(MatchUpdateKind::MatchRequest, "m1"), now);
        queue.on_event(&update(MatchUpdateKind::MatchDeclined, "m1"), now);

        assert_eq!(queue.len(), 2);
        assert!(queue.clear("m1", MatchKind::Requested));
        assert!(queue.contains("m1", MatchKind::Declined));
    }

    #[test]
    fn accept_and_close_move_active_match() {
        let mut queue = MatchQueue::new();
        let now = DateTime::<Utc>::default();

        let outcome = queue.on_event(&update(MatchUpdateKind::MatchAccepted, "m2"), now);
        assert!(matches!(outcome, MatchOutcome::Announced(n) if n.kind == MatchKind::Accepted));
        assert_eq!(queue.active_match().map(String::as_str), Some("m2"));
        assert!(queue.is_empty());

        queue.on_event(&update(MatchUpdateKind::MatchClosed, "m2"), now);
        assert_eq!(queue.active_match(), None);
    }

    #[test]
    fn missing_match_id_is_ignored() {
        let mut queue = MatchQueue::new();
        let mut body = update(MatchUpdateKind::MatchRequest, "m1");
        body.match_id = None;

        assert_eq!(queue.on_event(&body, DateTime::<Utc>::default()), MatchOutcome::Ignored);
    }

    #[test]
    fn snapshot_replaces_only_requests() {
        let mut queue = MatchQueue::new();
        let now = DateTime::<Utc>::default();
        queue.on_event(&update(MatchUpdateKind::MatchRequest, "old"), now);
        queue.on_event(&update(MatchUpdateKind::MatchDeclined, "d1"), now);

        queue.replace_pending(
            vec![PendingMatch {
                id: "new".into(),
                user_a_username: Some("alice".into()),
                game_name: Some("Go".into()),
                matched_at: Some("2024-05-01T10:00:00".into()),
            }],
            now,
        );

        assert!(!queue.contains("old", MatchKind::Requested));
        assert!(queue.contains("d1", MatchKind::Declined));
        assert_eq!(queue.entries()[1].timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn unparsable_matched_at_uses_arrival_time() {
        let mut queue = MatchQueue::new();
        let now = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap_or_default();

        queue.replace_pending(
            vec![PendingMatch {
                id: "m".into(),
                user_a_username: None,
                game_name: None,
                matched_at: Some("yesterday".into()),
            }],
            now,
        );

        assert_eq!(queue.entries()[0].timestamp, now);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut queue = MatchQueue::new();
        assert!(!queue.clear("never", MatchKind::Closed));
        assert!(!queue.clear("never", MatchKind::Closed));
        assert!(queue.is_empty());
    }
}
