//! Persistence for users and notes.
//!
//! Both backends give the same guarantees: every operation touches a single
//! record atomically, usernames are unique, and note listings come back
//! newest first.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Note, NoteUpdate, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `ApiError::Conflict` when the username is taken.
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Notes owned by `owner_id`, ordered by `created_at` descending.
    async fn list_notes_by_owner(&self, owner_id: Uuid) -> Result<Vec<Note>>;

    async fn insert_note(&self, owner_id: Uuid, title: &str, content: &str) -> Result<Note>;

    async fn find_note(&self, id: Uuid) -> Result<Option<Note>>;

    /// Returns false when the note no longer exists.
    async fn update_note(&self, id: Uuid, update: NoteUpdate) -> Result<bool>;

    /// Returns false when the note no longer exists.
    async fn delete_note(&self, id: Uuid) -> Result<bool>;
}
