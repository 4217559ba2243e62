use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use crate::models::{Meet, Search, User, UserId};

/// Errors raised by storage collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    /// The collaborator could not be reached at all
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stores disagree after a partially applied operation
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Read access to registered users
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn exists(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}

/// The pool of pending searches
#[async_trait]
pub trait SearchStore: Send + Sync {
    async fn find_by_finder(&self, finder: UserId) -> Result<Option<Search>, StoreError>;

    /// All pending searches, oldest first
    async fn find_all(&self) -> Result<Vec<Search>, StoreError>;

    /// Insert unless the finder already has a pending search, keeping the
    /// pool ordered by `created_at`.
    /// Returns `false` when an entry was already present.
    async fn save(&self, search: Search) -> Result<bool, StoreError>;

    /// Remove the finder's pending search.
    /// Returns `false` when there was nothing to remove.
    async fn delete(&self, finder: UserId) -> Result<bool, StoreError>;
}

/// Meet history
#[async_trait]
pub trait MeetStore: Send + Sync {
    /// Every meet where the user is either participant
    async fn find_by_user(&self, user: UserId) -> Result<Vec<Meet>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Meet>, StoreError>;

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Insert or replace by id
    async fn save(&self, meet: Meet) -> Result<(), StoreError>;
}
