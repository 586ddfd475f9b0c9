//! Per-user conversation state.
//!
//! One authoritative message list exists for the currently open peer;
//! everything else is summary state (last message + unseen counter per
//! peer). Message id acts as an idempotency key over an ordered insert —
//! the record returned by the synchronous send and its echoed live push
//! never double-append.

use std::collections::{HashMap, HashSet};

use chat_events::{MessageRecord, IMAGE_PLACEHOLDER};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Follow-up the embedding transport layer must perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    /// Acknowledge a just-arrived open-conversation message as seen.
    MarkSeen(Uuid),
}

/// Last-message summary shown in the peer list.
#[derive(Debug, Clone, PartialEq)]
pub struct LastMessage {
    pub text: String,
    pub time: DateTime<Utc>,
    pub sender_id: Uuid,
}

pub struct ConversationState {
    me: Uuid,
    open_peer: Option<Uuid>,
    messages: Vec<MessageRecord>,
    message_ids: HashSet<Uuid>,
    last_messages: HashMap<Uuid, LastMessage>,
    unseen_counts: HashMap<Uuid, u64>,
}

impl ConversationState {
    pub fn new(me: Uuid) -> Self {
        Self {
            me,
            open_peer: None,
            messages: Vec::new(),
            message_ids: HashSet::new(),
            last_messages: HashMap::new(),
            unseen_counts: HashMap::new(),
        }
    }

    pub fn open_peer(&self) -> Option<Uuid> {
        self.open_peer
    }

    /// Decrypted messages of the currently open conversation, in order.
    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    pub fn unseen_count(&self, peer: Uuid) -> u64 {
        self.unseen_counts.get(&peer).copied().unwrap_or(0)
    }

    pub fn last_message(&self, peer: Uuid) -> Option<&LastMessage> {
        self.last_messages.get(&peer)
    }

    /// Open a conversation, replacing the message list wholesale from a
    /// history fetch (the fetch already marked the peer's messages seen
    /// server-side). Clears the peer's unseen counter.
    pub fn open_conversation(&mut self, peer: Uuid, history: Vec<MessageRecord>) {
        let me = self.me;
        self.open_peer = Some(peer);
        self.message_ids = history.iter().map(|m| m.id).collect();
        self.messages = history
            .into_iter()
            .map(|record| decrypt_record(me, record))
            .collect();
        self.unseen_counts.remove(&peer);
    }

    pub fn close_conversation(&mut self) {
        self.open_peer = None;
        self.messages.clear();
        self.message_ids.clear();
    }

    /// Fold in the record returned synchronously by a send.
    pub fn record_send_ack(&mut self, record: MessageRecord) {
        self.touch_summary(&record);
        if self.open_peer == Some(record.peer_of(self.me)) {
            let record = decrypt_record(self.me, record);
            self.insert(record);
        }
    }

    /// Fold in a live `newMessage` push.
    pub fn handle_new_message(&mut self, record: MessageRecord) -> Option<ConversationAction> {
        self.touch_summary(&record);
        let peer = record.peer_of(self.me);
        let inbound = record.sender_id != self.me;

        if self.open_peer == Some(peer) {
            let id = record.id;
            let mut record = decrypt_record(self.me, record);
            if inbound {
                record.seen = true;
            }
            let appended = self.insert(record);
            if inbound && appended {
                return Some(ConversationAction::MarkSeen(id));
            }
        } else if inbound {
            *self.unseen_counts.entry(record.sender_id).or_insert(0) += 1;
        }
        None
    }

    /// Overwrite the mirrored counters with the server-computed ones (the
    /// canonical source). The open peer's counter stays cleared.
    pub fn apply_unseen_counts(&mut self, counts: HashMap<Uuid, u64>) {
        self.unseen_counts = counts;
        if let Some(peer) = self.open_peer {
            self.unseen_counts.remove(&peer);
        }
    }

    fn insert(&mut self, record: MessageRecord) -> bool {
        if !self.message_ids.insert(record.id) {
            return false;
        }
        self.messages.push(record);
        true
    }

    fn touch_summary(&mut self, record: &MessageRecord) {
        let peer = record.peer_of(self.me);
        let text = match &record.message_text {
            Some(text) => {
                chat_crypto::decrypt(text, &self.me.to_string(), &peer.to_string())
            }
            None if record.message_image.is_some() => IMAGE_PLACEHOLDER.to_string(),
            None => String::new(),
        };
        self.last_messages.insert(
            peer,
            LastMessage {
                text,
                time: record.created_at,
                sender_id: record.sender_id,
            },
        );
    }
}

fn decrypt_record(me: Uuid, mut record: MessageRecord) -> MessageRecord {
    let peer = record.peer_of(me).to_string();
    let me = me.to_string();
    if let Some(text) = record.message_text.take() {
        record.message_text = Some(chat_crypto::decrypt(&text, &me, &peer));
    }
    if let Some(image) = record.message_image.take() {
        record.message_image = Some(chat_crypto::decrypt(&image, &me, &peer));
    }
    record
}
