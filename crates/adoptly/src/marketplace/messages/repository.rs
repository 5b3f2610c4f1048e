use crate::marketplace::users::UserId;
use crate::store::{Page, Paged, RepositoryError};

use super::domain::{Message, MessageId, MessageRemoval};

/// Storage abstraction for encrypted messages.
pub trait MessageRepository: Send + Sync {
    fn insert_message(&self, message: Message) -> Result<Message, RepositoryError>;
    fn fetch_message(&self, id: &MessageId) -> Result<Option<Message>, RepositoryError>;
    /// Messages between the pair that `viewer` has not deleted, oldest first.
    fn conversation(
        &self,
        viewer: &UserId,
        other: &UserId,
        page: Page,
    ) -> Result<Paged<Message>, RepositoryError>;
    /// Flag every message from `sender` to `receiver` as read; returns how many changed.
    fn mark_read(&self, receiver: &UserId, sender: &UserId) -> Result<usize, RepositoryError>;
    /// Every message visible to `viewer`, oldest first.
    fn visible_messages(&self, viewer: &UserId) -> Result<Vec<Message>, RepositoryError>;
    fn hide_message(
        &self,
        id: &MessageId,
        user: &UserId,
    ) -> Result<MessageRemoval, RepositoryError>;
}
