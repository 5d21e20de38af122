use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NoteStore, UserStore};
use crate::error::{ApiError, Result};
use crate::models::{Note, NoteUpdate, User};

/// Process-local store, used by tests and by `STORAGE=memory`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    // insertion order, oldest first
    notes: RwLock<Vec<Note>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|user| user.username == username) {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn list_notes_by_owner(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        let notes = self.notes.read().await;
        let mut owned: Vec<Note> = notes
            .iter()
            .rev()
            .filter(|note| note.owner_id == owner_id)
            .cloned()
            .collect();
        // Stable sort, so equal timestamps stay newest-inserted first
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn insert_note(&self, owner_id: Uuid, title: &str, content: &str) -> Result<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            owner_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.notes.write().await.push(note.clone());
        Ok(note)
    }

    async fn find_note(&self, id: Uuid) -> Result<Option<Note>> {
        let notes = self.notes.read().await;
        Ok(notes.iter().find(|note| note.id == id).cloned())
    }

    async fn update_note(&self, id: Uuid, update: NoteUpdate) -> Result<bool> {
        let mut notes = self.notes.write().await;
        match notes.iter_mut().find(|note| note.id == id) {
            Some(note) => {
                update.apply(note);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_note(&self, id: Uuid) -> Result<bool> {
        let mut notes = self.notes.write().await;
        let before = notes.len();
        notes.retain(|note| note.id != id);
        Ok(notes.len() < before)
    }
}
