use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::{
    required_field, validate_input_string, Note, NoteUpdate, MAX_CONTENT_LENGTH, MAX_TITLE_LENGTH,
};
use crate::store::{NoteStore, UserStore};

/// Ownership-checked note operations. A note is only ever visible to, and
/// mutable by, the user that created it.
pub struct NotesService {
    users: Arc<dyn UserStore>,
    notes: Arc<dyn NoteStore>,
}

impl NotesService {
    pub fn new(users: Arc<dyn UserStore>, notes: Arc<dyn NoteStore>) -> Self {
        Self { users, notes }
    }

    async fn require_user(&self, user_id: Uuid) -> Result<()> {
        match self.users.find_user_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound("User not found".to_string())),
        }
    }

    async fn owned_note(&self, user_id: Uuid, note_id: Uuid) -> Result<Note> {
        let note = self
            .notes
            .find_note(note_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

        if note.owner_id != user_id {
            log::warn!("User {} denied access to note {}", user_id, note_id);
            return Err(ApiError::Forbidden("Unauthorized".to_string()));
        }

        Ok(note)
    }

    pub async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>> {
        self.require_user(user_id).await?;
        self.notes.list_notes_by_owner(user_id).await
    }

    pub async fn create_note(&self, user_id: Uuid, title: Option<String>, content: Option<String>) -> Result<Uuid> {
        let (title, content) = match (required_field(title), required_field(content)) {
            (Some(title), Some(content)) => (title, content),
            _ => return Err(ApiError::Validation("Title and content are required".to_string())),
        };

        validate_input_string(&title, Some(MAX_TITLE_LENGTH))
            .map_err(|msg| ApiError::Validation(format!("Invalid title: {}", msg)))?;
        validate_input_string(&content, Some(MAX_CONTENT_LENGTH))
            .map_err(|msg| ApiError::Validation(format!("Invalid content: {}", msg)))?;

        self.require_user(user_id).await?;

        let note = self.notes.insert_note(user_id, &title, &content).await?;
        Ok(note.id)
    }

    /// Partial update: fields that are not named keep their value. Only
    /// `title` and `content` are accepted.
    ///
    /// `fields` may carry a body that failed to parse; it is only reported
    /// once the note is known to exist and belong to `user_id`.
    pub async fn update_note(&self, user_id: Uuid, note_id: Uuid, fields: Result<Map<String, Value>>) -> Result<()> {
        self.owned_note(user_id, note_id).await?;
        let update = NoteUpdate::from_fields(fields?)?;

        // A concurrent delete between the ownership check and the write
        if !self.notes.update_note(note_id, update).await? {
            return Err(ApiError::NotFound("Note not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> Result<()> {
        self.owned_note(user_id, note_id).await?;

        if !self.notes.delete_note(note_id).await? {
            return Err(ApiError::NotFound("Note not found".to_string()));
        }
        Ok(())
    }
}
