use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{NoteStore, UserStore};
use crate::error::{ApiError, Result};
use crate::models::{Note, NoteUpdate, User};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    /// Creates the tables if they don't exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notes (
                id UUID PRIMARY KEY,
                owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS notes_owner_created_idx ON notes (owner_id, created_at DESC)")
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let result = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3)
             RETURNING id, username, password_hash",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(ApiError::Conflict("Username already exists".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username, password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn list_notes_by_owner(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT id, owner_id, title, content, created_at FROM notes
             WHERE owner_id = $1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(notes)
    }

    async fn insert_note(&self, owner_id: Uuid, title: &str, content: &str) -> Result<Note> {
        let note = sqlx::query_as::<_, Note>(
            "INSERT INTO notes (id, owner_id, title, content, created_at) VALUES ($1, $2, $3, $4, $5)
             RETURNING id, owner_id, title, content, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;
        Ok(note)
    }

    async fn find_note(&self, id: Uuid) -> Result<Option<Note>> {
        let note = sqlx::query_as::<_, Note>("SELECT id, owner_id, title, content, created_at FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(note)
    }

    async fn update_note(&self, id: Uuid, update: NoteUpdate) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE notes SET title = COALESCE($2, title), content = COALESCE($3, content) WHERE id = $1",
        )
        .bind(id)
        .bind(update.title)
        .bind(update.content)
        .execute(&self.db)
        .await?;
        Ok(updated.rows_affected() > 0)
    }

    async fn delete_note(&self, id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}

// Run with `DATABASE_URL=... cargo test -- --ignored`
#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::connect(&url).await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    fn unique_name(prefix: &str) -> String {
        format!("{}-{}", prefix, Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_duplicate_username_conflicts() {
        let store = store().await;
        let username = unique_name("alice");

        let user = store.insert_user(&username, "hash").await.unwrap();
        assert!(matches!(
            store.insert_user(&username, "hash").await,
            Err(ApiError::Conflict(_))
        ));

        let found = store.find_user_by_username(&username).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(store.find_user_by_id(user.id).await.unwrap().unwrap().username, username);
    }

    #[tokio::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_notes_listed_newest_first_with_stable_ties() {
        let store = store().await;
        let owner = store.insert_user(&unique_name("owner"), "hash").await.unwrap().id;

        for title in ["a", "b", "c"] {
            store.insert_note(owner, title, "c").await.unwrap();
        }

        let listed = store.list_notes_by_owner(owner).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed
            .windows(2)
            .all(|pair| (pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id)));

        let again = store.list_notes_by_owner(owner).await.unwrap();
        let ids = |notes: &[Note]| notes.iter().map(|n| n.id).collect::<Vec<_>>();
        assert_eq!(ids(&listed), ids(&again));
    }

    #[tokio::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_partial_update_and_delete() {
        let store = store().await;
        let owner = store.insert_user(&unique_name("owner"), "hash").await.unwrap().id;
        let note = store.insert_note(owner, "t", "c").await.unwrap();

        let update = NoteUpdate { title: Some("t2".into()), content: None };
        assert!(store.update_note(note.id, update.clone()).await.unwrap());
        let stored = store.find_note(note.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "t2");
        assert_eq!(stored.content, "c");

        assert!(store.delete_note(note.id).await.unwrap());
        assert!(!store.delete_note(note.id).await.unwrap());
        assert!(!store.update_note(note.id, update).await.unwrap());
        assert!(store.find_note(note.id).await.unwrap().is_none());
    }
}
