//! Unread message counters.
//!
//! Two bookkeeping paths coexist and are kept deliberately separate:
//!
//! - `total` is server-authoritative. It changes only through snapshot or
//!   push replacement, and through mark-read arithmetic.
//! - `per_conversation` changes through snapshot or push replacement of the
//!   whole map, and through point updates of a single conversation.
//!
//! A point update does not touch `total`, so the two can drift apart. The
//! ledger keeps the sum of `per_conversation` incrementally and reports the
//! difference through [`UnreadLedger::drift`].
//!
//! The category counters (`friend_chat`, `match_chat`) are a third, unrelated
//! path: bumped by categorized pushes and reset explicitly by the views that
//! display them.

use std::collections::BTreeMap;

use pixelpals_proto::{
    ConversationId,
    payloads::{ChatCategory, UnreadUpdate},
};

/// Unread counters of the logged-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadLedger {
    per_conversation: BTreeMap<ConversationId, u64>,
    total: u64,
    per_conversation_sum: u64,
    friend_chat: u64,
    match_chat: u64,
}

impl UnreadLedger {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Authoritative total.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count of one conversation (zero if absent).
    pub fn count(&self, conversation: &ConversationId) -> u64 {
        self.per_conversation.get(conversation).copied().unwrap_or(0)
    }

    /// Per-conversation counts.
    pub fn per_conversation(&self) -> &BTreeMap<ConversationId, u64> {
        &self.per_conversation
    }

    /// Sum of the per-conversation counts, maintained incrementally.
    pub fn per_conversation_sum(&self) -> u64 {
        self.per_conversation_sum
    }

    /// `total - sum(per_conversation)`. Zero when both paths agree.
    pub fn drift(&self) -> i128 {
        i128::from(self.total) - i128::from(self.per_conversation_sum)
    }

    /// Unread volume in direct friend chats since the last reset.
    pub fn friend_chat(&self) -> u64 {
        self.friend_chat
    }

    /// Unread volume in match-room chats since the last reset.
    pub fn match_chat(&self) -> u64 {
        self.match_chat
    }

    /// Replace the total.
    pub fn replace_total(&mut self, total: u64) {
        self.total = total;
    }

    /// Replace the whole per-conversation map.
    pub fn replace_per_conversation(&mut self, counts: BTreeMap<ConversationId, u64>) {
        self.per_conversation_sum = counts.values().fold(0u64, |acc, c| acc.saturating_add(*c));
        self.per_conversation = counts;
    }

    /// Point update of one conversation. `total` is left alone.
    pub fn set_count(&mut self, conversation: ConversationId, count: u64) {
        let previous = self.per_conversation.insert(conversation, count).unwrap_or(0);
        self.per_conversation_sum =
            self.per_conversation_sum.saturating_sub(previous).saturating_add(count);
    }

    /// Apply an `unread-updates` push.
    ///
    /// A full map wins over a point update carried in the same body.
    pub fn apply(&mut self, update: &UnreadUpdate) {
        if let Some(total) = update.total_unread_count {
            self.replace_total(total);
        }

        if let Some(counts) = &update.unread_counts_per_chat {
            self.replace_per_conversation(counts.clone());
        } else if let Some((conversation, count)) = update.point_update() {
            self.set_count(conversation.clone(), count);
        }

        match update.category {
            Some(ChatCategory::ChatFriend) => self.friend_chat += 1,
            Some(ChatCategory::ChatMatch) => self.match_chat += 1,
            Some(ChatCategory::Other) | None => {},
        }
    }

    /// The server confirmed that `conversation` was read.
    ///
    /// Removes its entry and subtracts the count it held from `total`,
    /// clamped at zero. Returns the removed count.
    pub fn complete_mark_read(&mut self, conversation: &ConversationId) -> u64 {
        let removed = self.per_conversation.remove(conversation).unwrap_or(0);
        self.per_conversation_sum = self.per_conversation_sum.saturating_sub(removed);
        self.total = self.total.saturating_sub(removed);
        removed
    }

    /// Reset the friend-chat badge.
    pub fn reset_friend_chat(&mut self) {
        self.friend_chat = 0;
    }

    /// Reset the match-chat badge.
    pub fn reset_match_chat(&mut self) {
        self.match_chat = 0;
    }

    /// Zero `total` and `per_conversation` (failed snapshot).
    ///
    /// Category counters are not covered by the snapshot and stay as they are.
    pub fn zero_snapshot(&mut self) {
        self.per_conversation.clear();
        self.per_conversation_sum = 0;
        self.total = 0;
    }

    /// Zero everything (logout).
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
