use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::users::{PublicProfile, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored message. The body only exists encrypted; `iv` carries the per-message nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub ciphertext: String,
    pub iv: String,
    pub read: bool,
    pub deleted_for: Vec<UserId>,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user: &UserId) -> bool {
        &self.sender_id == user || &self.receiver_id == user
    }

    pub fn visible_to(&self, user: &UserId) -> bool {
        self.involves(user) && !self.deleted_for.contains(user)
    }

    pub fn between(&self, a: &UserId, b: &UserId) -> bool {
        (&self.sender_id == a && &self.receiver_id == b)
            || (&self.sender_id == b && &self.receiver_id == a)
    }

    /// The other party from `user`'s point of view.
    pub fn partner_of(&self, user: &UserId) -> &UserId {
        if &self.sender_id == user {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub receiver_id: UserId,
    pub body: String,
}

/// Decrypted message as returned to one of its parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub body: String,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub partner: PublicProfile,
    pub last_message: MessageView,
    pub unread: usize,
}

/// Outcome of deleting a message for one party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRemoval {
    /// Still visible to the other party.
    Hidden,
    /// Both parties deleted it; the document is gone.
    Purged,
}
