//! Friend presence.
//!
//! Seeded from the friend-status snapshot and updated in place by `topic/status`
//! pushes. There is no time-based expiry: a friend stays online until a push
//! or the next snapshot says otherwise.

use std::collections::BTreeMap;

use pixelpals_proto::{
    UserId,
    payloads::{FriendStatus, StatusUpdate},
};

/// Presence of one friend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    /// Friend id.
    pub friend_id: UserId,
    /// Display name, when known.
    pub username: Option<String>,
    /// Online right now.
    pub online: bool,
    /// Avatar location, when known.
    pub avatar_url: Option<String>,
}

/// Per-friend online/offline map.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    entries: BTreeMap<UserId, PresenceEntry>,
}

impl PresenceTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole map with a snapshot.
    ///
    /// Friends missing from the snapshot are gone afterwards, even if a push
    /// had added them.
    pub fn replace_snapshot(&mut self, friends: Vec<FriendStatus>) {
        self.entries = friends
            .into_iter()
            .map(|f| {
                let entry = PresenceEntry {
                    friend_id: f.id.clone(),
                    username: f.username,
                    online: f.online,
                    avatar_url: f.avatar_url,
                };
                (f.id, entry)
            })
            .collect();
    }

    /// Apply a presence push. Unknown friends are stored.
    pub fn apply(&mut self, update: &StatusUpdate) {
        let entry = self.entries.entry(update.user_id.clone()).or_insert_with(|| PresenceEntry {
            friend_id: update.user_id.clone(),
            username: None,
            online: update.online,
            avatar_url: None,
        });

        entry.online = update.online;
        if update.username.is_some() {
            entry.username.clone_from(&update.username);
        }
    }

    /// Drop everything (failed snapshot or logout).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether `friend_id` is known and online.
    pub fn is_online(&self, friend_id: &str) -> bool {
        self.entries.get(friend_id).is_some_and(|e| e.online)
    }

    /// Entry of `friend_id`. `None` if never seen.
    pub fn get(&self, friend_id: &str) -> Option<&PresenceEntry> {
        self.entries.get(friend_id)
    }

    /// Number of friends currently online.
    pub fn online_count(&self) -> usize {
        self.entries.values().filter(|e| e.online).count()
    }

    /// All entries ordered by friend id.
    pub fn entries(&self) -> impl Iterator<Item = &PresenceEntry> {
        self.entries.values()
    }

    /// Entries of online friends ordered by friend id.
    pub fn online_friends(&self) -> impl Iterator<Item = &PresenceEntry> {
        self.entries.values().filter(|e| e.online)
    }

    /// Number of known friends.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No friend known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
