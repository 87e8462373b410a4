//! The storage collaborator. Notes live wherever a [`MessageStore`] puts
//! them; [`MemoryStore`] keeps them in process memory.

use axum::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::message::{Message, NewMessage};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a note. Returning `Ok` means the note is durably accepted.
    async fn create(&self, new: NewMessage) -> Result<Message, StoreError>;

    /// All notes, newest first.
    async fn list_recent(&self) -> Result<Vec<Message>, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    /// Delete `id` only if it belongs to `owner`. Returns whether a note
    /// was removed.
    async fn delete_owned(&self, id: Uuid, owner: &str) -> Result<bool, StoreError>;
}

/// Notes in insertion order behind an async lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: RwLock<Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(&self, new: NewMessage) -> Result<Message, StoreError> {
        let message = new.into_message();
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_recent(&self) -> Result<Vec<Message>, StoreError> {
        Ok(self.messages.read().await.iter().rev().cloned().collect())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        Ok(self.messages.read().await.iter().find(|m| m.id == id).cloned())
    }

    async fn delete_owned(&self, id: Uuid, owner: &str) -> Result<bool, StoreError> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| !(m.id == id && m.visitor_id.as_deref() == Some(owner)));
        Ok(messages.len() != before)
    }
}
