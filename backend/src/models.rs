use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{ApiError, Result};

pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MAX_PASSWORD_LENGTH: usize = 1024;
pub const MAX_TITLE_LENGTH: usize = 1000;
pub const MAX_CONTENT_LENGTH: usize = 100_000;

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Note as sent to clients. The owner is implied by the token.
#[derive(Debug, Serialize, Deserialize)]
pub struct NoteView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

impl From<Note> for NoteView {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: note.created_at.format(CREATED_AT_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Validated set of changes for a note. Only `title` and `content` may change.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteUpdate {
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self> {
        let mut update = NoteUpdate::default();

        for (key, value) in fields {
            let slot = match key.as_str() {
                "title" => &mut update.title,
                "content" => &mut update.content,
                _ => return Err(ApiError::Validation(format!("Field '{}' cannot be updated", key))),
            };

            let text = match value {
                Value::String(text) if !text.is_empty() => text,
                _ => return Err(ApiError::Validation(format!("Field '{}' must be a non-empty string", key))),
            };

            let max_length = if key == "title" { MAX_TITLE_LENGTH } else { MAX_CONTENT_LENGTH };
            validate_input_string(&text, Some(max_length))
                .map_err(|msg| ApiError::Validation(format!("Invalid {}: {}", key, msg)))?;

            *slot = Some(text);
        }

        if update.is_empty() {
            return Err(ApiError::Validation("No updatable fields provided".to_string()));
        }

        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    pub fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
    }
}

// Rejects null bytes and control characters other than common whitespace
pub fn validate_input_string(input: &str, max_length: Option<usize>) -> std::result::Result<(), String> {
    if input.contains('\0') {
        return Err("Input contains null bytes".to_string());
    }

    for ch in input.chars() {
        if ch.is_control() && ch != '\n' && ch != '\r' && ch != '\t' {
            return Err("Input contains invalid control characters".to_string());
        }
    }

    if let Some(max_len) = max_length {
        if input.chars().count() > max_len {
            return Err(format!("Input exceeds maximum length of {} characters", max_len));
        }
    }

    Ok(())
}

/// Absent and empty fields both count as missing.
pub fn required_field(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
