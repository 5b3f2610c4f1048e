use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::marketplace::users::{UserId, UserRepository};
use crate::security::{CipherError, MessageCipher};
use crate::store::{Page, Paged, RepositoryError};

use super::domain::{
    ConversationSummary, Message, MessageId, MessageRemoval, MessageView, OutgoingMessage,
};
use super::repository::MessageRepository;

const MAX_BODY_LENGTH: usize = 2000;

/// Direct messages between users, encrypted before they reach the store.
pub struct MessageService<R> {
    repository: Arc<R>,
    cipher: MessageCipher,
}

impl<R> MessageService<R>
where
    R: MessageRepository + UserRepository + 'static,
{
    pub fn new(repository: Arc<R>, cipher: MessageCipher) -> Self {
        Self { repository, cipher }
    }

    pub fn send(
        &self,
        sender: &UserId,
        outgoing: OutgoingMessage,
        now: DateTime<Utc>,
    ) -> Result<MessageView, MessageServiceError> {
        if &outgoing.receiver_id == sender {
            return Err(MessageServiceError::Invalid(
                "you cannot message yourself".to_string(),
            ));
        }
        let body = validate_body(&outgoing.body)?;
        if self.repository.fetch_user(&outgoing.receiver_id)?.is_none() {
            return Err(MessageServiceError::RecipientNotFound);
        }

        let sealed = self.cipher.seal(&body)?;
        let message = Message {
            id: MessageId::generate(),
            sender_id: sender.clone(),
            receiver_id: outgoing.receiver_id,
            ciphertext: sealed.ciphertext,
            iv: sealed.iv,
            read: false,
            deleted_for: Vec::new(),
            sent_at: now,
        };
        let stored = self.repository.insert_message(message)?;
        info!(message_id = %stored.id, sender_id = %sender, receiver_id = %stored.receiver_id, "message sent");

        Ok(view(&stored, body))
    }

    /// Messages with `other`, oldest first. Marks what `viewer` received as read.
    pub fn conversation(
        &self,
        viewer: &UserId,
        other: &UserId,
        page: Page,
    ) -> Result<Paged<MessageView>, MessageServiceError> {
        if self.repository.fetch_user(other)?.is_none() {
            return Err(MessageServiceError::UserNotFound);
        }
        let marked = self.repository.mark_read(viewer, other)?;
        if marked > 0 {
            debug!(viewer_id = %viewer, partner_id = %other, marked, "messages marked read");
        }

        self.repository
            .conversation(viewer, other, page)?
            .try_map(|message| self.open(&message))
    }

    /// One entry per conversation partner, most recent conversation first.
    pub fn inbox(&self, viewer: &UserId) -> Result<Vec<ConversationSummary>, MessageServiceError> {
        let mut threads: HashMap<UserId, (Message, usize)> = HashMap::new();
        for message in self.repository.visible_messages(viewer)? {
            let unread = usize::from(&message.receiver_id == viewer && !message.read);
            let partner = message.partner_of(viewer).clone();
            threads
                .entry(partner)
                .and_modify(|(latest, count)| {
                    *count += unread;
                    if message.sent_at >= latest.sent_at {
                        *latest = message.clone();
                    }
                })
                .or_insert_with(|| (message.clone(), unread));
        }

        let mut summaries = Vec::with_capacity(threads.len());
        for (partner_id, (latest, unread)) in threads {
            let partner = match self.repository.fetch_user(&partner_id)? {
                Some(partner) => partner,
                None => continue,
            };
            summaries.push(ConversationSummary {
                partner: partner.public_profile(),
                last_message: self.open(&latest)?,
                unread,
            });
        }
        summaries.sort_by(|a, b| b.last_message.sent_at.cmp(&a.last_message.sent_at));
        Ok(summaries)
    }

    /// Hide the message for `actor`; the document is purged once both parties deleted it.
    pub fn delete(
        &self,
        actor: &UserId,
        id: &MessageId,
    ) -> Result<MessageRemoval, MessageServiceError> {
        let message = self
            .repository
            .fetch_message(id)?
            .ok_or(MessageServiceError::MessageNotFound)?;
        if !message.involves(actor) {
            return Err(MessageServiceError::NotParticipant);
        }
        if !message.visible_to(actor) {
            return Err(MessageServiceError::MessageNotFound);
        }

        let removal = self
            .repository
            .hide_message(id, actor)
            .map_err(|err| match err {
                RepositoryError::NotFound => MessageServiceError::MessageNotFound,
                other => MessageServiceError::Repository(other),
            })?;
        info!(message_id = %id, actor_id = %actor, ?removal, "message deleted");
        Ok(removal)
    }

    fn open(&self, message: &Message) -> Result<MessageView, MessageServiceError> {
        let body = self.cipher.open(&message.ciphertext, &message.iv)?;
        Ok(view(message, body))
    }
}

fn view(message: &Message, body: String) -> MessageView {
    MessageView {
        id: message.id.clone(),
        sender_id: message.sender_id.clone(),
        receiver_id: message.receiver_id.clone(),
        body,
        read: message.read,
        sent_at: message.sent_at,
    }
}

fn validate_body(raw: &str) -> Result<String, MessageServiceError> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(MessageServiceError::Invalid(
            "message body is required".to_string(),
        ));
    }
    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(MessageServiceError::Invalid(format!(
            "message body must be at most {MAX_BODY_LENGTH} characters"
        )));
    }
    Ok(body.to_string())
}

/// Error raised by the messaging service.
#[derive(Debug, thiserror::Error)]
pub enum MessageServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("recipient not found")]
    RecipientNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("message not found")]
    MessageNotFound,
    #[error("only the sender or receiver can do that")]
    NotParticipant,
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
