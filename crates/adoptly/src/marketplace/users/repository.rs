use chrono::{DateTime, Utc};

use crate::store::{Page, Paged, RepositoryError};

use super::domain::{AccountChange, User, UserFilter, UserId};

/// Storage abstraction for account documents.
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username or e-mail is taken.
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    /// Apply `change` to the stored account atomically. Fails with `Conflict` when a new
    /// e-mail belongs to another account and with `Stale` when the change no longer applies.
    fn apply_user_change(
        &self,
        id: &UserId,
        change: AccountChange,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    /// Look up by e-mail (case-insensitive) or username.
    fn find_user_by_login(&self, identifier: &str) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_reset_digest(&self, digest: &str) -> Result<Option<User>, RepositoryError>;
    fn query_users(&self, filter: &UserFilter, page: Page) -> Result<Paged<User>, RepositoryError>;
}
