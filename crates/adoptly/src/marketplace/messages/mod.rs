//! Direct messages, encrypted at rest with AES-256-GCM.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    ConversationSummary, Message, MessageId, MessageRemoval, MessageView, OutgoingMessage,
};
pub use repository::MessageRepository;
pub use service::{MessageService, MessageServiceError};
